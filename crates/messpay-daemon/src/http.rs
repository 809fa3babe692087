//! HTTP reporting API.
//!
//! JSON over HTTP for the admin dashboard. Errors are returned as
//! `{success: false, message}` with a 4xx/5xx status.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use messpay_db::DbError;
use messpay_ledger::LedgerError;
use messpay_settlement::SettlementError;
use messpay_types::api::StatusUpdateResponse;
use messpay_types::TypesError;

use crate::commands::{analytics, payouts};
use crate::DaemonState;

/// API error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing input. Nothing was applied.
    #[error("{0}")]
    BadRequest(String),

    /// No ledger row or merchant for the request.
    #[error("{0}")]
    NotFound(String),

    /// Storage or computation failure. Details are logged, not returned.
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TypesError> for ApiError {
    fn from(e: TypesError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => Self::NotFound(format!("No {what}")),
            other => Self::Internal(other.into()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Db(e) => e.into(),
            other => Self::Internal(other.into()),
        }
    }
}

impl From<SettlementError> for ApiError {
    fn from(e: SettlementError) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(e) => {
                error!(error = %format!("{e:#}"), "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = StatusUpdateResponse {
            success: false,
            message,
            payout_status: None,
        };
        (status, Json(body)).into_response()
    }
}

/// Build the API router.
pub fn router(state: Arc<DaemonState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/payouts", get(payouts::list_payouts))
        .route("/payouts/status", put(payouts::update_status))
        .route("/payouts/history/:merchant_id", get(payouts::history))
        .route("/payouts/top", get(analytics::top_merchants))
        .route("/payouts/summary/daily", get(analytics::daily_summary))
        .route("/payouts/trends", get(analytics::revenue_trends))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Serve the API until the listener fails.
pub async fn serve(state: Arc<DaemonState>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const MAX_SIZE: usize = 1024 * 1024;

    /// Send one request and return status, headers and JSON body.
    pub(crate) async fn send(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), MAX_SIZE).await.expect("body");
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, headers, json)
    }

    #[tokio::test]
    async fn test_health() {
        let state = crate::tests::test_state();
        let (status, _, body) = send(router(state), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let state = crate::tests::test_state();
        let (status, _, _) = send(router(state), "GET", "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            ApiError::from(TypesError::InvalidCycle("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DbError::NotFound("row".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DbError::Migration("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
