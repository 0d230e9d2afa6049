//! Daemon configuration: TOML file on disk, overridable by environment
//! variables, via the `config` crate's layered builder.

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to the `wallet.json` store. Relative paths are resolved
    /// against the current working directory at load time.
    pub wallet_path: PathBuf,

    /// Address the JSON-RPC HTTP front end binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the node this daemon relays transactions to.
    pub node_url: String,

    /// Outbound HTTP timeout, in seconds, for node calls.
    #[serde(default = "default_node_timeout_secs")]
    pub node_timeout_secs: u64,

    /// `tracing_subscriber::EnvFilter` directive string, e.g. `"info"` or
    /// `"walletd=debug,tower_http=info"`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:9009".to_string()
}

fn default_node_timeout_secs() -> u64 {
    30
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            wallet_path: PathBuf::from("wallet.json"),
            bind_addr: default_bind_addr(),
            node_url: "http://127.0.0.1:19009".to_string(),
            node_timeout_secs: default_node_timeout_secs(),
            log_filter: default_log_filter(),
        }
    }
}

impl WalletConfig {
    /// Load configuration from a TOML file, then let `WALLETD_*`
    /// environment variables (e.g. `WALLETD_BIND_ADDR`) override individual
    /// fields.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::builder()
            .add_source(File::from(path.to_path_buf()))
            .add_source(Environment::with_prefix("WALLETD").separator("_"));
        builder.build()?.try_deserialize()
    }

    /// Load configuration purely from environment variables and defaults,
    /// for deployments without a config file on disk.
    pub fn from_env() -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::builder()
            .add_source(
                ConfigBuilder::try_from(&Self::default())?,
            )
            .add_source(Environment::with_prefix("WALLETD").separator("_"));
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_minimal_toml_with_defaults_filled_in() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            wallet_path = "/tmp/wallet.json"
            node_url = "http://127.0.0.1:19009"
            "#
        )
        .unwrap();

        let cfg = WalletConfig::load(file.path()).unwrap();
        assert_eq!(cfg.wallet_path, PathBuf::from("/tmp/wallet.json"));
        assert_eq!(cfg.bind_addr, default_bind_addr());
        assert_eq!(cfg.node_timeout_secs, default_node_timeout_secs());
    }

    #[test]
    fn env_override_wins_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            wallet_path = "/tmp/wallet.json"
            node_url = "http://127.0.0.1:19009"
            bind_addr = "127.0.0.1:1111"
            "#
        )
        .unwrap();

        std::env::set_var("WALLETD_BIND_ADDR", "127.0.0.1:2222");
        let cfg = WalletConfig::load(file.path()).unwrap();
        std::env::remove_var("WALLETD_BIND_ADDR");
        assert_eq!(cfg.bind_addr, "127.0.0.1:2222");
    }
}
