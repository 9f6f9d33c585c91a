//! REST API — the HTTP façade over `vaultflow-core` (spec.md §6, external
//! collaborator).
//!
//! All endpoints share application state through axum's `State`
//! extractor — no module-level globals (spec.md §9 "Mutable global
//! registry").
//!
//! | Method | Path                    | Description                        |
//! |--------|-------------------------|-------------------------------------|
//! | POST   | `/transactions`         | Route a signed transfer             |
//! | GET    | `/transactions/{id}`    | Fetch a persisted receipt           |
//! | GET    | `/ledger/verify`        | Walk and verify the hash chain      |
//! | POST   | `/accounts`             | Register a new account              |
//! | GET    | `/health`               | Liveness probe                      |

use axum::{
    extract::{Json, Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vaultflow_core::auth::{AuthRegistry, HmacAuthorizer, SignedTransaction};
use vaultflow_core::ledger::LedgerStore;
use vaultflow_core::money::Money;
use vaultflow_core::models::Transaction;
use vaultflow_core::router::TransactionRouter;

use crate::metrics::SharedMetrics;

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<TransactionRouter>,
    pub store: Arc<LedgerStore>,
    pub auth: Arc<AuthRegistry>,
    pub metrics: SharedMetrics,
}

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/transactions", post(create_transaction_handler))
        .route("/transactions/{id}", get(get_transaction_handler))
        .route("/ledger/verify", get(verify_ledger_handler))
        .route("/accounts", post(create_account_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// The canonical transaction wire form (spec.md §6) plus a top-level
/// `signature` field.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    pub amount: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub signature: String,
}

fn default_currency() -> String {
    vaultflow_core::config::DEFAULT_CURRENCY.to_string()
}

impl TransactionRequest {
    fn into_signed(self) -> Result<SignedTransaction, ApiError> {
        let amount_decimal = Decimal::from_str(&self.amount)
            .map_err(|e| ApiError::BadRequest(format!("invalid amount: {e}")))?;
        let amount = Money::new(amount_decimal, &self.currency)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let mut transaction = Transaction::new(self.from, self.to, amount);
        if let Some(id) = self.id {
            transaction = transaction.with_id(id);
        }
        if let Some(created_at) = self.created_at {
            transaction = transaction.with_created_at(created_at);
        }
        transaction = transaction.with_metadata(self.metadata);

        Ok(SignedTransaction {
            transaction,
            signature: self.signature,
            key_id: None,
        })
    }
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub account_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateAccountResponse {
    account_id: String,
    secret: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// HTTP-boundary error taxonomy (spec.md §7 "User-visible behaviour").
enum ApiError {
    BadRequest(String),
    NotFound,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<vaultflow_core::error::RouterError> for ApiError {
    fn from(err: vaultflow_core::error::RouterError) -> Self {
        use vaultflow_core::error::RouterError;
        match err {
            RouterError::AuthRequired | RouterError::BadSignature => ApiError::BadRequest(err.to_string()),
            RouterError::Money(_) | RouterError::Policy(_) => ApiError::BadRequest(err.to_string()),
            RouterError::Ledger(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<vaultflow_core::error::LedgerError> for ApiError {
    fn from(err: vaultflow_core::error::LedgerError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — liveness probe.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `POST /transactions` — routes a signed transfer and persists its receipt.
async fn create_transaction_handler(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let signed = request.into_signed()?;

    let receipt = match state.router.route(signed).await {
        Ok(receipt) => receipt,
        Err(err) => {
            state
                .metrics
                .transactions_rejected_total
                .with_label_values(&[rejection_reason(&err)])
                .inc();
            return Err(ApiError::from(err));
        }
    };

    state.store.save_receipt(&receipt).await?;
    state.metrics.transactions_routed_total.inc();

    Ok((StatusCode::OK, Json(receipt)))
}

fn rejection_reason(err: &vaultflow_core::error::RouterError) -> &'static str {
    use vaultflow_core::error::RouterError;
    match err {
        RouterError::AuthRequired => "auth_required",
        RouterError::BadSignature => "bad_signature",
        RouterError::Money(_) => "money_domain",
        RouterError::Policy(_) => "policy_domain",
        RouterError::Ledger(_) => "store_io",
    }
}

/// `GET /transactions/{id}` — fetch a previously persisted receipt.
async fn get_transaction_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.store.get_receipt(&id).await? {
        Some(receipt) => Ok(Json(receipt)),
        None => Err(ApiError::NotFound),
    }
}

/// `GET /ledger/verify` — walks the chain and reports integrity.
async fn verify_ledger_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let (ok, error) = state.store.verify_chain().await?;
    state
        .metrics
        .ledger_verify_total
        .with_label_values(&[if ok { "ok" } else { "broken" }])
        .inc();
    Ok(Json(VerifyResponse { ok, error }))
}

/// `POST /accounts` — creates an account with a freshly generated secret.
async fn create_account_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = request
        .account_id
        .unwrap_or_else(|| format!("acct:{}", uuid::Uuid::new_v4().simple()));

    let secret = state.auth.register(&account_id, None);
    state
        .store
        .create_account(&account_id, &secret)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok((
        StatusCode::OK,
        Json(CreateAccountResponse { account_id, secret }),
    ))
}
