//! livekml-server binary entry point.
//!
//! Usage:
//! ```bash
//! livekml-server --config livekml.toml
//! livekml-server --demo 12 -v
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use livekml_server::demo::{self, DemoConfig};
use livekml_server::{Config, LiveKmlServer};
use tracing_subscriber::EnvFilter;

/// Serve a live scene to polling KML viewers.
#[derive(Parser, Debug)]
#[command(name = "livekml-server")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults apply when it does not exist)
    #[arg(long, short, default_value = "livekml.toml")]
    config: PathBuf,

    /// Override the bind address from the configuration
    #[arg(long)]
    bind: Option<String>,

    /// Populate the scene with this many moving demo markers
    #[arg(long)]
    demo: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "livekml_server=info,livekml_core=info".into()),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = if cli.config.exists() {
        tracing::info!("Loading configuration from {}", cli.config.display());
        Config::from_file(&cli.config).context("Failed to load configuration")?
    } else {
        tracing::info!("No {} found, using default configuration", cli.config.display());
        Config::default()
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    let server = Arc::new(LiveKmlServer::new(config));

    if let Some(count) = cli.demo {
        let demo = DemoConfig {
            markers: count,
            ..DemoConfig::default()
        };
        let markers = demo::install(server.scene(), &demo)
            .await
            .context("Failed to install demo scene")?;
        demo::spawn(server.scene().clone(), demo, markers);
    }

    tokio::select! {
        result = server.clone().run() => result.context("Server failed")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
