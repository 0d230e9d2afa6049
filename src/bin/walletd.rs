//! Wallet daemon binary: loads `WalletConfig`, wires a `WalletD` core to an
//! `HttpNodeClient`, and serves the JSON-RPC front end (`qrl_walletd::api`).
//!
//! Standard service bootstrap: clap CLI, `tracing_subscriber` init,
//! `config`-crate load, `axum::Server::bind`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qrl_walletd::api::ApiServer;
use qrl_walletd::config::WalletConfig;
use qrl_walletd::daemon::WalletD;
use qrl_walletd::node_client::HttpNodeClient;

/// Command line arguments for the wallet daemon.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the daemon's TOML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "walletd.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the wallet daemon (default if no subcommand is given).
    Run,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let _ = cli.command;

    let config = if cli.config.exists() {
        match WalletConfig::load(&cli.config) {
            Ok(config) => config,
            Err(e) => {
                error!("failed to load configuration from {:?}: {}", cli.config, e);
                process::exit(1);
            }
        }
    } else {
        info!("no config file at {:?}, falling back to environment", cli.config);
        match WalletConfig::from_env() {
            Ok(config) => config,
            Err(e) => {
                error!("failed to load configuration from environment: {}", e);
                process::exit(1);
            }
        }
    };

    let node_timeout = Duration::from_secs(config.node_timeout_secs);
    let node_client = match HttpNodeClient::with_timeout(config.node_url.clone(), node_timeout) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("failed to build node client for {}: {}", config.node_url, e);
            process::exit(1);
        }
    };

    let daemon = match WalletD::open(&config.wallet_path, node_client, node_timeout).await {
        Ok(daemon) => Arc::new(daemon),
        Err(e) => {
            error!("failed to open wallet at {:?}: {}", config.wallet_path, e);
            process::exit(1);
        }
    };

    let bind_addr: SocketAddr = config
        .bind_addr
        .parse()
        .unwrap_or_else(|e| panic!("invalid bind_addr {}: {e}", config.bind_addr));

    info!("wallet daemon listening on {}", bind_addr);
    let server = ApiServer::new(daemon, config.bind_addr.clone());
    server.start().await?;
    Ok(())
}
