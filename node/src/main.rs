// Copyright (c) 2026 Vaultflow Contributors. MIT License.
// See LICENSE for details.

//! `vaultflow-node` — the HTTP façade binary.
//!
//! Wires a [`vaultflow_core::ledger::LedgerStore`], an
//! [`vaultflow_core::auth::AuthRegistry`] bootstrapped from configured
//! secrets, and a [`vaultflow_core::router::TransactionRouter`] behind two
//! listeners: the business API and a separate metrics endpoint, mirroring
//! the teacher's split between its public API port and its internal
//! observability port.

mod api;
mod cli;
mod logging;
mod metrics;

use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;

use cli::{Commands, ServeArgs, VaultflowCli};
use vaultflow_core::auth::{AuthRegistry, HmacAuthorizer};
use vaultflow_core::ledger::LedgerStore;
use vaultflow_core::policy::{FeePolicy, SplitPolicy};
use vaultflow_core::router::TransactionRouter;
use vaultflow_core::vault::VaultRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = VaultflowCli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Version => {
            println!("vaultflow-node {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    logging::init_logging(&format!("vaultflow_node={0},vaultflow_core={0}", args.log_level), args.log_format);

    tracing::info!(db_path = %args.db_path.display(), bind = %args.bind, "starting vaultflow-node");

    let store = Arc::new(LedgerStore::open(&args.db_path).await?);

    let auth = Arc::new(AuthRegistry::new());
    let bootstrap_secrets = args.parse_secrets()?;
    for (account_id, secret) in &bootstrap_secrets {
        auth.set_secret(account_id, secret);
        store.upsert_account_secret(account_id, secret).await?;
        tracing::info!(account = %account_id, "registered bootstrap account");
    }

    let fee_rate: rust_decimal::Decimal = args.fee_rate.parse()?;
    let safety_share: rust_decimal::Decimal = args.safety_share.parse()?;

    let router = Arc::new(TransactionRouter::new(
        Some(HmacAuthorizer::new(Arc::clone(&auth))),
        FeePolicy::new(fee_rate)?,
        SplitPolicy::new(safety_share)?,
        VaultRegistry::new(args.vault_safety.clone(), args.vault_growth.clone()),
        Arc::clone(&store),
    ));

    let node_metrics = Arc::new(metrics::NodeMetrics::new());

    let app_state = api::AppState {
        router,
        store: Arc::clone(&store),
        auth: Arc::clone(&auth),
        metrics: Arc::clone(&node_metrics),
    };

    let api_app = api::build_app(app_state);
    let api_listener = TcpListener::bind(&args.bind).await?;
    tracing::info!(addr = %args.bind, "API listening");

    let metrics_app = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(node_metrics);
    let metrics_listener = TcpListener::bind(&args.metrics_bind).await?;
    tracing::info!(addr = %args.metrics_bind, "metrics listening");

    let api_server = axum::serve(api_listener, api_app).with_graceful_shutdown(shutdown_signal());
    let metrics_server = axum::serve(metrics_listener, metrics_app).with_graceful_shutdown(shutdown_signal());

    tokio::try_join!(
        async { api_server.await.map_err(anyhow::Error::from) },
        async { metrics_server.await.map_err(anyhow::Error::from) },
    )?;

    tracing::info!("vaultflow-node shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
