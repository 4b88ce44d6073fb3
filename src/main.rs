//! CLI entry point for ggif.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = ggif::config::CliArgs::parse();
    let config = ggif::config::AppConfig::load(cli).await?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    tracing::debug!(?config, "resolved configuration");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            on_signal.cancel();
        }
    });

    let telemetry = ggif::telemetry::TelemetrySink::default();
    let result = ggif::run(config, telemetry.clone(), cancel).await;
    tracing::debug!(snapshot = ?telemetry.snapshot(), "telemetry");

    match result {
        Ok(()) | Err(ggif::GgifError::Cancelled) => Ok(()),
        Err(error) => {
            tracing::error!(error = %error, "ggif failed");
            Err(error.into())
        }
    }
}
