//! Command-line interface for firegen.
//!
//! Run `firegen --config firegen.yaml --endpoint localhost:4317 --plaintext`
//! and stop it with Ctrl+C.

use crate::core::config::DEFAULT_CONFIG_FILE;
use crate::core::{Config, FiregenError, Result};
use crate::export::{Auth, ExporterOptions, Protocol, DEFAULT_ENDPOINT};
use crate::generator::{Orchestrator, SeriesCatalog};
use clap::Parser;
use std::path::PathBuf;

/// Synthetic OTLP metrics load generator
#[derive(Parser, Debug)]
#[command(name = "firegen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, env = "FIREGEN_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// OTLP endpoint
    #[arg(long, env = "FIREGEN_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Use plaintext connection instead of TLS
    #[arg(long, env = "FIREGEN_PLAINTEXT")]
    pub plaintext: bool,

    /// Bearer token for authentication
    #[arg(long, env = "FIREGEN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Username for Basic authentication
    #[arg(long, env = "FIREGEN_USERNAME")]
    pub username: Option<String>,

    /// Password for Basic authentication
    #[arg(long, env = "FIREGEN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Use HTTP instead of gRPC
    #[arg(long, env = "FIREGEN_HTTP")]
    pub http: bool,

    /// Enable debug logging
    #[arg(short, long, env = "FIREGEN_DEBUG")]
    pub debug: bool,

    /// Validate configuration, print the series summary and exit
    #[arg(long)]
    pub check_config: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Transport settings derived from the flags.
    pub fn exporter_options(&self) -> ExporterOptions {
        ExporterOptions {
            endpoint: self.endpoint.clone(),
            plaintext: self.plaintext,
            protocol: if self.http { Protocol::Http } else { Protocol::Grpc },
            auth: Auth::from_parts(
                self.token.as_deref(),
                self.username.as_deref(),
                self.password.as_deref(),
            ),
        }
    }

    /// Initialize logging based on flags and environment.
    pub fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let env_log_level =
            std::env::var("FIREGEN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_level = if self.debug {
            "debug"
        } else {
            env_log_level.as_str()
        };

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(self.debug)
            .compact();

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| FiregenError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Execute firegen.
pub async fn execute(cli: Cli) -> Result<()> {
    cli.init_logging()?;

    let config = Config::load(&cli.config).await?;
    let catalog = SeriesCatalog::from_config(&config);
    catalog.log_summary(&config);

    if cli.check_config {
        println!("Configuration is valid!");
        println!("  Services: {}", config.services);
        println!("  Metrics: {}", config.metrics);
        println!("  Attributes: {}", config.attributes.len());
        println!("  Interval: {:?}", config.interval());
        println!("  Export timeout: {:?}", config.export_timeout());
        println!("  Series per service: {}", catalog.series_per_service());
        println!("  Total series: {}", catalog.total_series(config.services));
        return Ok(());
    }

    run(config, &cli.exporter_options()).await
}

/// Start every service and block until SIGINT or SIGTERM.
pub async fn run(config: Config, options: &ExporterOptions) -> Result<()> {
    let grace = config.shutdown_grace();
    let mut orchestrator = Orchestrator::new(config);
    orchestrator.start(options).await?;

    tracing::info!("");
    tracing::info!("Press Ctrl+C to shutdown");
    shutdown_signal().await;
    tracing::info!("");
    tracing::info!("Shutting down {} services...", orchestrator.running());

    orchestrator.shutdown();
    let stopped = orchestrator.join(grace).await;
    let ticks: u64 = stopped.iter().map(|s| s.ticks).sum();
    tracing::info!("Stopped {} services after {} ticks", stopped.len(), ticks);
    tracing::info!("Bye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received"),
        _ = terminate => tracing::info!("SIGTERM received"),
    }
}
