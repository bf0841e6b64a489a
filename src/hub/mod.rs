//! Realtime fan-out to connected observers.
//!
//! The hub is the sole mutation-visibility channel to the outside world.
//! Observers are transport-agnostic: anything holding the receiving end of
//! an unbounded channel. Sends are fire-and-forget so a slow or dead
//! observer can never block the pipeline; a heartbeat drops observers that
//! stop acknowledging.

mod messages;

pub use messages::{ChatStatePayload, InboundCommand, OutboundEvent, TranscriptPayload};

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Server-generated identifier for a registered observer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObserverId(String);

impl ObserverId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

struct Observer {
    sender: UnboundedSender<OutboundEvent>,
    alive: AtomicBool,
}

/// Fan-out hub over a concurrent observer registry.
pub struct BroadcastHub {
    observers: DashMap<ObserverId, Observer>,
    heartbeat_interval: Duration,
}

impl BroadcastHub {
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self {
            observers: DashMap::new(),
            heartbeat_interval,
        }
    }

    /// Register a new observer and greet it.
    pub fn register(&self, sender: UnboundedSender<OutboundEvent>) -> ObserverId {
        let id = ObserverId::new();
        let greeting = OutboundEvent::Connection {
            status: "connected".to_string(),
        };
        let _ = sender.send(greeting);
        self.observers.insert(
            id.clone(),
            Observer {
                sender,
                alive: AtomicBool::new(true),
            },
        );
        info!("observer {} registered", id.as_str());
        id
    }

    pub fn unregister(&self, id: &ObserverId) {
        if self.observers.remove(id).is_some() {
            info!("observer {} unregistered", id.as_str());
        }
    }

    /// Record a heartbeat acknowledgement from an observer.
    pub fn acknowledge(&self, id: &ObserverId) {
        if let Some(observer) = self.observers.get(id) {
            observer.alive.store(true, Ordering::SeqCst);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Fan an event out to every observer. Fire-and-forget per observer;
    /// observers whose channel is gone are removed after the iteration so
    /// concurrent registration/removal stays safe.
    pub fn broadcast(&self, event: OutboundEvent) {
        let mut dead = Vec::new();
        for entry in self.observers.iter() {
            if entry.value().sender.send(event.clone()).is_err() {
                dead.push(entry.key().clone());
            }
        }
        for id in dead {
            debug!("dropping observer {} with closed channel", id.as_str());
            self.observers.remove(&id);
        }
    }

    /// Send an event to a single observer. Returns false if it is gone.
    pub fn send(&self, id: &ObserverId, event: OutboundEvent) -> bool {
        match self.observers.get(id) {
            Some(observer) => observer.sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Spawn the liveness task: each tick drops observers that have not
    /// acknowledged since the previous tick, then pings the rest.
    pub fn spawn_heartbeat(self: Arc<Self>) -> JoinHandle<()> {
        let hub = self;
        let period = hub.heartbeat_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately; skip it so observers get a
            // full interval before the first liveness check.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                hub.sweep_observers();
            }
        })
    }

    fn sweep_observers(&self) {
        let mut dead = Vec::new();
        for entry in self.observers.iter() {
            let observer = entry.value();
            if !observer.alive.load(Ordering::SeqCst) {
                dead.push(entry.key().clone());
                continue;
            }
            observer.alive.store(false, Ordering::SeqCst);
            if observer.sender.send(OutboundEvent::Ping).is_err() {
                dead.push(entry.key().clone());
            }
        }
        for id in dead {
            warn!("dropping unresponsive observer {}", id.as_str());
            self.observers.remove(&id);
        }
    }
}
