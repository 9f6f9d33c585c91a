//! Command-line argument structure for `vaultflow-node`, built with
//! `clap` derive.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Vaultflow payment-routing node.
///
/// Serves the HTTP façade over the `vaultflow-core` transaction router
/// and hash-chained ledger.
#[derive(Parser, Debug)]
#[command(name = "vaultflow-node", about = "Vaultflow payment-routing node", version)]
pub struct VaultflowCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server.
    Serve(ServeArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `serve` subcommand.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Path to the SQLite ledger database file.
    #[arg(long, env = "VAULTFLOW_DB_PATH", default_value = "vaultflow.db")]
    pub db_path: PathBuf,

    /// Address to bind the HTTP API on.
    #[arg(long, env = "VAULTFLOW_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Address to bind the Prometheus metrics endpoint on.
    #[arg(long, env = "VAULTFLOW_METRICS_BIND", default_value = "127.0.0.1:9090")]
    pub metrics_bind: String,

    /// Safety vault account id.
    #[arg(long, env = "VAULTFLOW_VAULT_SAFETY", default_value = vaultflow_core::config::DEFAULT_VAULT_SAFETY)]
    pub vault_safety: String,

    /// Growth vault account id.
    #[arg(long, env = "VAULTFLOW_VAULT_GROWTH", default_value = vaultflow_core::config::DEFAULT_VAULT_GROWTH)]
    pub vault_growth: String,

    /// Fee rate applied to every routed transaction (e.g. `0.01` for 1%).
    #[arg(long, env = "VAULTFLOW_FEE_RATE", default_value = vaultflow_core::config::DEFAULT_FEE_RATE)]
    pub fee_rate: String,

    /// Share of the fee routed to the safety vault (between 0 and 1).
    #[arg(long, env = "VAULTFLOW_SAFETY_SHARE", default_value = vaultflow_core::config::DEFAULT_SAFETY_SHARE)]
    pub safety_share: String,

    /// JSON object mapping bootstrap account ids to their shared secret,
    /// e.g. `{"acct:alice":"deadbeef..."}`. Registered into both the auth
    /// registry and the accounts table on startup.
    #[arg(long, env = "VAULTFLOW_SECRETS", default_value = "{}")]
    pub secrets: String,

    /// Log output format.
    #[arg(long, value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Default tracing filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl ServeArgs {
    /// Parses [`Self::secrets`] into an ordered account->secret map.
    ///
    /// Invalid JSON is a startup error, not a silently-ignored default —
    /// a typo in bootstrap secrets should fail loudly before the server
    /// ever binds a socket.
    pub fn parse_secrets(&self) -> anyhow::Result<BTreeMap<String, String>> {
        Ok(serde_json::from_str(&self.secrets)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        VaultflowCli::command().debug_assert();
    }

    #[test]
    fn parses_empty_secrets_by_default() {
        let args = ServeArgs {
            db_path: PathBuf::from("vaultflow.db"),
            bind: "127.0.0.1:8080".to_string(),
            metrics_bind: "127.0.0.1:9090".to_string(),
            vault_safety: "vault:safety".to_string(),
            vault_growth: "vault:growth".to_string(),
            fee_rate: "0.01".to_string(),
            safety_share: "0.5".to_string(),
            secrets: "{}".to_string(),
            log_format: LogFormat::Pretty,
            log_level: "info".to_string(),
        };
        assert!(args.parse_secrets().unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_secrets_json() {
        let args = ServeArgs {
            db_path: PathBuf::from("vaultflow.db"),
            bind: "127.0.0.1:8080".to_string(),
            metrics_bind: "127.0.0.1:9090".to_string(),
            vault_safety: "vault:safety".to_string(),
            vault_growth: "vault:growth".to_string(),
            fee_rate: "0.01".to_string(),
            safety_share: "0.5".to_string(),
            secrets: "not json".to_string(),
            log_format: LogFormat::Pretty,
            log_level: "info".to_string(),
        };
        assert!(args.parse_secrets().is_err());
    }
}
