use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier::completion::{CompletionApi, CompletionClient};
use courier::config::Config;
use courier::handler::{self, InteractiveHandler};
use courier::reporter::Reporter;
use courier::shutdown;
use courier::transport::{self, Outbox, SendOptions};

#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(about = "Single-correspondent chat relay for a remote completion service")]
#[command(version)]
struct Cli {
    /// Chat identifier of the authorized correspondent
    #[arg(long, env = "COURIER_PEER_ID")]
    peer_id: i64,

    /// Bearer credential for the completion service
    #[arg(long, env = "COURIER_API_KEY", hide_env_values = true)]
    api_key: String,

    /// WebSocket URL of the chat gateway
    #[arg(long, env = "COURIER_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, env = "COURIER_VERBOSE")]
    verbose: bool,

    /// Config file path (optional)
    #[arg(short, long, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "courier=debug"
    } else {
        "courier=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config from file if provided, otherwise use defaults; the
    // credential and peer always come from the CLI/environment.
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.completion.api_key = cli.api_key.clone();
    config.transport.authorized_peer = cli.peer_id;
    if let Some(url) = &cli.gateway_url {
        config.transport.gateway_url = url.clone();
    }
    config.validate()?;

    let peer_id = config.transport.authorized_peer;
    info!("relaying for peer {} via {}", peer_id, config.transport.gateway_url);

    // Channels tying the tasks together.
    let (outbox, outbox_rx) = Outbox::channel(transport::OUTBOX_BUFFER_SIZE);
    let (events_tx, events_rx) = mpsc::channel(transport::gateway::EVENT_BUFFER_SIZE);
    let (ready_tx, ready_rx) = watch::channel(false);
    let (shutdown_tx, shutdown_rx) = shutdown::channel();

    let completion: Arc<dyn CompletionApi> =
        Arc::new(CompletionClient::new(config.completion.clone()));

    let gateway = tokio::spawn(transport::gateway::run(
        config.transport.clone(),
        outbox_rx,
        events_tx,
        ready_tx,
        shutdown_rx.clone(),
    ));

    let interactive = Arc::new(InteractiveHandler::new(
        Arc::clone(&completion),
        outbox.clone(),
        peer_id,
        Duration::from_secs(config.transport.reply_timeout_secs),
    ));
    let events = tokio::spawn(handler::run_event_loop(events_rx, interactive));

    let reporter = if config.reporter.enabled {
        let reporter = Reporter::new(
            config.reporter.clone(),
            Arc::clone(&completion),
            outbox.clone(),
            peer_id,
            ready_rx.clone(),
        );
        Some(tokio::spawn(reporter.run(shutdown_rx.clone())))
    } else {
        info!("periodic reporter disabled");
        None
    };

    // Announce startup once the gateway is ready.
    tokio::spawn(send_startup_notice(outbox.clone(), ready_rx.clone(), peer_id));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    if let Err(err) = gateway.await {
        warn!("gateway task failed: {}", err);
    }
    if let Some(task) = reporter
        && let Err(err) = task.await
    {
        warn!("reporter task failed: {}", err);
    }
    if let Err(err) = events.await {
        warn!("event loop task failed: {}", err);
    }

    info!("courier stopped");
    Ok(())
}

/// Send the one-time startup notice once the transport reports ready.
async fn send_startup_notice(outbox: Outbox, mut ready: watch::Receiver<bool>, peer_id: i64) {
    while !*ready.borrow() {
        if ready.changed().await.is_err() {
            return;
        }
    }

    let text = format!(
        "🤖 Courier online\nVersion: {}\nStarted: {} UTC",
        env!("CARGO_PKG_VERSION"),
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    );

    match outbox.send_message(peer_id, text, SendOptions::reply()).await {
        Ok(()) => info!("startup notice sent to peer {}", peer_id),
        Err(err) => warn!("failed to send startup notice: {}", err),
    }
}

/// Resolve on Ctrl+C or SIGTERM.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
