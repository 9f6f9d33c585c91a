//! Prometheus metrics for the Vaultflow node.
//!
//! Registered in a dedicated [`prometheus::Registry`] so these metrics
//! never collide with a process-global registry.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (the underlying prometheus handles are themselves
/// cheaply cloneable), so it can be shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Total number of transactions successfully routed.
    pub transactions_routed_total: IntCounter,
    /// Total number of transactions rejected, labeled by reason.
    pub transactions_rejected_total: IntCounterVec,
    /// Total number of `GET /ledger/verify` calls, labeled by result.
    pub ledger_verify_total: IntCounterVec,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("vaultflow".into()), None)
            .expect("failed to create prometheus registry");

        let transactions_routed_total = IntCounter::new(
            "transactions_routed_total",
            "Total number of transactions successfully routed",
        )
        .expect("metric creation");
        registry
            .register(Box::new(transactions_routed_total.clone()))
            .expect("metric registration");

        let transactions_rejected_total = IntCounterVec::new(
            Opts::new(
                "transactions_rejected_total",
                "Total number of rejected transactions, labeled by reason",
            ),
            &["reason"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(transactions_rejected_total.clone()))
            .expect("metric registration");

        let ledger_verify_total = IntCounterVec::new(
            Opts::new(
                "ledger_verify_total",
                "Total number of ledger verification calls, labeled by result",
            ),
            &["result"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(ledger_verify_total.clone()))
            .expect("metric registration");

        Self {
            registry,
            transactions_routed_total,
            transactions_rejected_total,
            ledger_verify_total,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition
    /// format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers via `State`.
pub type SharedMetrics = Arc<NodeMetrics>;

/// `GET /metrics` — renders the Prometheus text exposition format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_produces_nonempty_output() {
        let metrics = NodeMetrics::new();
        metrics.transactions_routed_total.inc();
        let body = metrics.encode().unwrap();
        assert!(body.contains("vaultflow_transactions_routed_total"));
    }
}
