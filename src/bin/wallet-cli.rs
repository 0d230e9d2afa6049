//! Interactive-less wallet CLI: opens the same `WalletD` core the daemon
//! binary serves over HTTP, in-process, and drives it from one-shot
//! subcommands using clap's `#[derive(Subcommand)]` style; config loading
//! follows the same `WalletConfig` path as `walletd.rs`.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qrl_walletd::address::Address;
use qrl_walletd::config::WalletConfig;
use qrl_walletd::daemon::WalletD;
use qrl_walletd::error::WalletError;
use qrl_walletd::hash::HashFunction;
use qrl_walletd::node_client::HttpNodeClient;
use qrl_walletd::transaction::Destination;

#[derive(Parser)]
#[command(name = "wallet-cli", version, about = "XMSS wallet command-line client")]
struct Cli {
    /// Path to the daemon's TOML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "walletd.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and add a brand-new XMSS address.
    AddNewAddress {
        #[arg(long, default_value_t = 10)]
        height: u8,
        #[arg(long, default_value = "shake256")]
        hash_function: String,
    },
    /// Recover and add an address from a hex seed or 34-word mnemonic.
    AddAddressFromSeed {
        seed: String,
    },
    /// List every qaddress held in this wallet.
    ListAddresses,
    /// Remove an address from the wallet.
    RemoveAddress {
        qaddress: String,
    },
    /// Print the recovery seed (hex and mnemonic) for an address.
    GetRecoverySeeds {
        qaddress: String,
    },
    /// Print wallet version, address count, and encryption status.
    GetWalletInfo,
    /// Encrypt the wallet file at rest under a passphrase.
    EncryptWallet {
        passphrase: String,
    },
    /// Forget the passphrase and keep the wallet encrypted on disk.
    LockWallet,
    /// Decrypt the wallet into memory under a passphrase.
    UnlockWallet {
        passphrase: String,
    },
    /// Re-key an encrypted wallet.
    ChangePassphrase {
        old: String,
        new: String,
    },
    /// Sign and relay a single-destination transfer.
    RelayTransferTxn {
        signer_qaddress: String,
        to_qaddress: String,
        amount: u64,
        #[arg(long, default_value_t = 0)]
        fee: u64,
        #[arg(long)]
        ots_index: u32,
        #[arg(long)]
        master_qaddress: Option<String>,
    },
    /// Sign and relay a message transaction (UTF-8 payload).
    RelayMessageTxn {
        signer_qaddress: String,
        message: String,
        #[arg(long, default_value_t = 0)]
        fee: u64,
        #[arg(long)]
        ots_index: u32,
        #[arg(long)]
        master_qaddress: Option<String>,
    },
    /// Look up the on-chain balance for an address.
    GetBalance {
        qaddress: String,
    },
    /// Look up the OTS/address state the node is tracking.
    GetOts {
        qaddress: String,
    },
    /// Print the node's current block height.
    GetHeight,
    /// Print the node's overall state.
    GetNodeState,
}

async fn build_daemon(config: &WalletConfig) -> Result<WalletD, WalletError> {
    let node_timeout = Duration::from_secs(config.node_timeout_secs);
    let node_client = Arc::new(HttpNodeClient::with_timeout(config.node_url.clone(), node_timeout)?);
    WalletD::open(&config.wallet_path, node_client, node_timeout).await
}

fn print_json(value: &impl serde::Serialize) {
    println!("{}", serde_json::to_string_pretty(value).expect("serializable"));
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = if cli.config.exists() {
        WalletConfig::load(&cli.config)
    } else {
        WalletConfig::from_env()
    }
    .unwrap_or_else(|e| {
        eprintln!("failed to load configuration: {e}");
        process::exit(1);
    });

    let daemon = build_daemon(&config).await.unwrap_or_else(|e| {
        eprintln!("failed to open wallet: {e}");
        process::exit(1);
    });

    let result = run(&daemon, cli.command).await;
    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

async fn run(daemon: &WalletD, command: Commands) -> Result<(), WalletError> {
    match command {
        Commands::AddNewAddress { height, hash_function } => {
            let hf = match hash_function.as_str() {
                "shake128" => HashFunction::Shake128,
                "shake256" => HashFunction::Shake256,
                "sha2_256" => HashFunction::Sha2_256,
                other => return Err(WalletError::UnsupportedDescriptor(format!("unknown hash function {other}"))),
            };
            let qaddress = daemon.add_new_address(height, hf).await?;
            print_json(&serde_json::json!({ "qaddress": qaddress }));
        }
        Commands::AddAddressFromSeed { seed } => {
            let qaddress = daemon.add_address_from_seed(&seed).await?;
            print_json(&serde_json::json!({ "qaddress": qaddress }));
        }
        Commands::ListAddresses => {
            print_json(&daemon.list_addresses().await);
        }
        Commands::RemoveAddress { qaddress } => {
            let removed = daemon.remove_address(&qaddress).await?;
            print_json(&serde_json::json!({ "removed": removed }));
        }
        Commands::GetRecoverySeeds { qaddress } => {
            let (hex_seed, mnemonic) = daemon.get_recovery_seeds(&qaddress).await?;
            print_json(&serde_json::json!({ "hex_seed": hex_seed, "mnemonic": mnemonic }));
        }
        Commands::GetWalletInfo => {
            let (version, address_count, encrypted) = daemon.get_wallet_info().await;
            print_json(&serde_json::json!({
                "version": version,
                "address_count": address_count,
                "encrypted": encrypted,
            }));
        }
        Commands::EncryptWallet { passphrase } => {
            daemon.encrypt_wallet(&passphrase).await?;
            println!("wallet encrypted");
        }
        Commands::LockWallet => {
            daemon.lock_wallet().await?;
            println!("wallet locked");
        }
        Commands::UnlockWallet { passphrase } => {
            daemon.unlock_wallet(&passphrase).await?;
            println!("wallet unlocked");
        }
        Commands::ChangePassphrase { old, new } => {
            daemon.change_passphrase(&old, &new).await?;
            println!("passphrase changed");
        }
        Commands::RelayTransferTxn {
            signer_qaddress,
            to_qaddress,
            amount,
            fee,
            ots_index,
            master_qaddress,
        } => {
            let destinations = vec![Destination { address: Address::from_qaddress(&to_qaddress)?, amount }];
            let tx = daemon
                .relay_transfer_txn(&signer_qaddress, master_qaddress.as_deref(), fee, ots_index, destinations)
                .await?;
            print_json(&serde_json::json!({ "transaction_hash": hex::encode(tx.transaction_hash) }));
        }
        Commands::RelayMessageTxn {
            signer_qaddress,
            message,
            fee,
            ots_index,
            master_qaddress,
        } => {
            let tx = daemon
                .relay_message_txn(&signer_qaddress, master_qaddress.as_deref(), fee, ots_index, message.into_bytes())
                .await?;
            print_json(&serde_json::json!({ "transaction_hash": hex::encode(tx.transaction_hash) }));
        }
        Commands::GetBalance { qaddress } => {
            let balance = daemon.get_balance(&qaddress).await?;
            print_json(&serde_json::json!({ "balance": balance }));
        }
        Commands::GetOts { qaddress } => {
            print_json(&daemon.get_ots(&qaddress).await?);
        }
        Commands::GetHeight => {
            print_json(&serde_json::json!({ "height": daemon.get_height().await? }));
        }
        Commands::GetNodeState => {
            print_json(&daemon.get_node_state().await?);
        }
    }
    Ok(())
}
