//! Power Exporter CLI
//!
//! Polls the metering switch named by `IP_WIFI_SWITCH` and serves its
//! readings on `/metrics`.

use clap::Parser;
use power_exporter::{
    config::ExporterConfig,
    device::HttpDevice,
    metrics::{DeviceMetrics, MetricsServer},
    poller::Poller,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "power-exporter", version, about)]
struct Args {
    /// TOML config file (defaults to ./power-exporter.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for the metrics endpoint, overriding the config file
    #[arg(short, long)]
    port: Option<u16>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.log_level, env.as_deref()))
        .init();

    info!("Power Exporter v{}", power_exporter::VERSION);

    let mut config = match ExporterConfig::from_env(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let metrics = match DeviceMetrics::new() {
        Ok(m) => Arc::new(m),
        Err(e) => {
            error!("Failed to create metrics registry: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let device = match HttpDevice::new(&config.device) {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to create device client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let server = MetricsServer::new(config.server.clone().into(), Arc::clone(&metrics));
    let poller = Poller::new(device, metrics).spawn();

    // A bind failure returns immediately and stops the poller with it.
    let result = server.run_until(shutdown_signal()).await;
    poller.shutdown().await;

    match result {
        Ok(()) => {
            info!("Shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` (when set) wins; `level` applies only when it is absent.
fn log_filter(level: Level, env: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(env.unwrap_or_default())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_rust_log_overrides_default_level() {
        let filter = log_filter(Level::INFO, Some("debug"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_default_level_without_rust_log() {
        let filter = log_filter(Level::WARN, None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

        let filter = log_filter(Level::DEBUG, Some(""));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_log_level_flag() {
        let args = Args::parse_from(["power-exporter", "--log-level", "debug", "--port", "9100"]);
        assert_eq!(args.log_level, Level::DEBUG);
        assert_eq!(args.port, Some(9100));
        assert!(args.config.is_none());
    }
}
