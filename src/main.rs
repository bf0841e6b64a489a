use anyhow::Result;
use clap::Parser;
use copilot_meetings::providers::{
    DisabledSummarizer, HttpCompletionProvider, PushTranscriptionBackend, SummarizationProvider,
};
use copilot_meetings::{AppState, Config, CopilotRuntime, MemorySessionStore};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "copilot-meetings", about = "Live-meeting co-pilot core")]
struct Cli {
    /// Config file path (without extension)
    #[arg(long, default_value = "config/copilot-meetings")]
    config: String,

    /// Override the configured bind port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut cfg = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!("could not load config {}: {err}; using defaults", cli.config);
            Config::default()
        }
    };
    if let Some(port) = cli.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!(
        "HTTP server will bind to {}:{}",
        cfg.service.http.bind, cfg.service.http.port
    );

    let provider: Arc<dyn SummarizationProvider> = match &cfg.llm.endpoint {
        Some(endpoint) => {
            let api_key = std::env::var(&cfg.llm.api_key_env).ok();
            info!("completion provider: {} ({})", endpoint, cfg.llm.model);
            Arc::new(HttpCompletionProvider::new(
                endpoint.clone(),
                cfg.llm.model.clone(),
                api_key,
            ))
        }
        None => {
            warn!("no completion endpoint configured; summarization disabled");
            Arc::new(DisabledSummarizer)
        }
    };

    let store = Arc::new(MemorySessionStore::new());
    let backend = PushTranscriptionBackend::new();
    let injector = backend.injector();

    let runtime = CopilotRuntime::build(&cfg, store, Box::new(backend), provider);
    let heartbeat = Arc::clone(&runtime.hub).spawn_heartbeat();

    let state = AppState::new(&runtime, Some(injector), cfg.session.owner_id.clone());
    let router = copilot_meetings::create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");

    let controller = Arc::clone(&runtime.controller);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("failed to install ctrl-c handler");
            }
            info!("shutdown signal received");
            if let Err(err) = controller.shutdown().await {
                warn!("graceful shutdown incomplete: {err:#}");
            }
        })
        .await?;

    heartbeat.abort();
    info!("goodbye");

    Ok(())
}
