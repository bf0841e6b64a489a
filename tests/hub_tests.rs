// Integration tests for the realtime broadcast hub
//
// These tests verify fan-out, targeted sends, tolerance of dead observers
// mid-broadcast, and heartbeat-based liveness eviction.

use copilot_meetings::{BroadcastHub, OutboundEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn listen_status(is_listening: bool) -> OutboundEvent {
    OutboundEvent::ListenStatus { is_listening }
}

#[tokio::test]
async fn test_broadcast_reaches_all_observers() {
    let hub = BroadcastHub::new(Duration::from_secs(30));

    let (tx1, mut rx1) = mpsc::unbounded_channel();
    let (tx2, mut rx2) = mpsc::unbounded_channel();
    hub.register(tx1);
    hub.register(tx2);

    // Both observers got the greeting
    assert!(matches!(
        rx1.recv().await.unwrap(),
        OutboundEvent::Connection { .. }
    ));
    assert!(matches!(
        rx2.recv().await.unwrap(),
        OutboundEvent::Connection { .. }
    ));

    hub.broadcast(listen_status(true));

    assert!(matches!(
        rx1.recv().await.unwrap(),
        OutboundEvent::ListenStatus { is_listening: true }
    ));
    assert!(matches!(
        rx2.recv().await.unwrap(),
        OutboundEvent::ListenStatus { is_listening: true }
    ));
}

#[tokio::test]
async fn test_send_targets_one_observer() {
    let hub = BroadcastHub::new(Duration::from_secs(30));

    let (tx1, mut rx1) = mpsc::unbounded_channel();
    let (tx2, mut rx2) = mpsc::unbounded_channel();
    let id1 = hub.register(tx1);
    hub.register(tx2);
    rx1.recv().await.unwrap();
    rx2.recv().await.unwrap();

    assert!(hub.send(&id1, listen_status(false)));

    assert!(matches!(
        rx1.recv().await.unwrap(),
        OutboundEvent::ListenStatus {
            is_listening: false
        }
    ));
    assert!(rx2.try_recv().is_err(), "other observer sees nothing");
}

#[tokio::test]
async fn test_broadcast_tolerates_dropped_receiver() {
    let hub = BroadcastHub::new(Duration::from_secs(30));

    let (tx1, rx1) = mpsc::unbounded_channel();
    let (tx2, mut rx2) = mpsc::unbounded_channel();
    hub.register(tx1);
    hub.register(tx2);
    rx2.recv().await.unwrap();

    // One observer goes away without unregistering
    drop(rx1);
    assert_eq!(hub.observer_count(), 2);

    hub.broadcast(listen_status(true));
    assert!(matches!(
        rx2.recv().await.unwrap(),
        OutboundEvent::ListenStatus { is_listening: true }
    ));

    // The dead observer was culled during the broadcast
    assert_eq!(hub.observer_count(), 1);
}

#[tokio::test]
async fn test_unregister_is_safe_and_idempotent() {
    let hub = BroadcastHub::new(Duration::from_secs(30));

    let (tx, _rx) = mpsc::unbounded_channel();
    let id = hub.register(tx);
    assert_eq!(hub.observer_count(), 1);

    hub.unregister(&id);
    hub.unregister(&id);
    assert_eq!(hub.observer_count(), 0);

    // Sending to a removed observer reports failure instead of panicking
    assert!(!hub.send(&id, listen_status(true)));
}

#[tokio::test]
async fn test_heartbeat_drops_silent_observers() {
    let hub = Arc::new(BroadcastHub::new(Duration::from_millis(40)));
    let heartbeat = Arc::clone(&hub).spawn_heartbeat();

    let (silent_tx, mut silent_rx) = mpsc::unbounded_channel();
    let (chatty_tx, mut chatty_rx) = mpsc::unbounded_channel();
    hub.register(silent_tx);
    let chatty_id = hub.register(chatty_tx);
    assert_eq!(hub.observer_count(), 2);

    // The chatty observer acknowledges every ping; the silent one never does
    let hub_for_acks = Arc::clone(&hub);
    let acker = tokio::spawn(async move {
        while let Some(event) = chatty_rx.recv().await {
            if matches!(event, OutboundEvent::Ping) {
                hub_for_acks.acknowledge(&chatty_id);
            }
        }
    });

    // Give the heartbeat a few intervals to evict the silent observer
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(hub.observer_count(), 1);
    // The silent observer saw at least the greeting and one ping
    assert!(matches!(
        silent_rx.recv().await.unwrap(),
        OutboundEvent::Connection { .. }
    ));

    heartbeat.abort();
    acker.abort();
}

#[tokio::test]
async fn test_acknowledged_observer_survives_heartbeat() {
    let hub = Arc::new(BroadcastHub::new(Duration::from_millis(40)));
    let heartbeat = Arc::clone(&hub).spawn_heartbeat();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let id = hub.register(tx);

    let hub_for_acks = Arc::clone(&hub);
    let acker = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if matches!(event, OutboundEvent::Ping) {
                hub_for_acks.acknowledge(&id);
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(hub.observer_count(), 1);

    heartbeat.abort();
    acker.abort();
}
