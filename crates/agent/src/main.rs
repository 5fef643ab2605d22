//! `loadwatch-agent` -- threshold monitor daemon.
//!
//! Publishes the `max_proc`, `max_mem_percent` and `handler_name` settings
//! and launches the configured handler whenever an event is raised.
//! `SIGUSR1` raises a process-count event and `SIGUSR2` a memory-usage
//! event, so a handler can be exercised by hand.
//!
//! # Environment variables
//!
//! | Variable                    | Required | Default | Description                    |
//! |-----------------------------|----------|---------|--------------------------------|
//! | `LOADWATCH_MAX_PROC`        | no       | --      | Initial `max_proc` text        |
//! | `LOADWATCH_MAX_MEM_PERCENT` | no       | --      | Initial `max_mem_percent` text |
//! | `LOADWATCH_HANDLER`         | no       | --      | Initial `handler_name`         |

use std::sync::Arc;

use anyhow::Context;
use loadwatch_agent::config::AgentConfig;
use loadwatch_agent::{Monitor, MonitorContext, SettingsTable};
use loadwatch_core::event::{EVENT_MEM_LIMIT, EVENT_PROC_LIMIT};
use tokio::signal::unix::{signal, SignalKind};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loadwatch_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::from_env();
    let settings = Arc::new(SettingsTable::new());
    let monitor = Monitor::start(settings.clone()).context("Failed to start monitor")?;

    let session = serve(monitor.context().clone(), settings, config);
    let stats = monitor.run_session(session).await?;
    tracing::info!(stats = %serde_json::to_string(&stats)?, "Shutdown complete");

    Ok(())
}

/// Apply the configured settings, then turn signals into events until
/// SIGINT or SIGTERM.
async fn serve(
    context: MonitorContext,
    settings: Arc<SettingsTable>,
    config: AgentConfig,
) -> anyhow::Result<()> {
    for (name, value) in config.initial_writes() {
        settings
            .write(name, value.as_bytes())
            .with_context(|| format!("Failed to apply initial {name}"))?;
    }
    tracing::info!(
        thresholds = %serde_json::to_string(&context.config.snapshot())?,
        "Settings applied"
    );

    let mut interrupt = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut usr1 = signal(SignalKind::user_defined1()).context("Failed to install SIGUSR1 handler")?;
    let mut usr2 = signal(SignalKind::user_defined2()).context("Failed to install SIGUSR2 handler")?;

    loop {
        tokio::select! {
            _ = interrupt.recv() => break,
            _ = terminate.recv() => break,
            _ = usr1.recv() => context.channel.raise(EVENT_PROC_LIMIT),
            _ = usr2.recv() => context.channel.raise(EVENT_MEM_LIMIT),
        }
    }

    tracing::info!("Shutdown signal received");
    Ok(())
}
