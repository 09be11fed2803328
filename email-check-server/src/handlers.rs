//! Request handlers.

use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use email_check_lib::{
    CancellationToken, EmailCheckError, OutcomeRecord, ValidationRequest, MAX_CONCURRENCY,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Body of `POST /validate-email`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SingleRequest {
    #[serde(default)]
    pub email: String,

    /// Origin IP forwarded to the provider
    #[serde(default)]
    pub ip_address: Option<String>,
}

/// Body of `POST /validate-emails`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkRequest {
    #[serde(default)]
    pub emails: Vec<String>,

    /// Worker count; falls back to the configured concurrency
    #[serde(default)]
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSummary {
    pub total: usize,
    pub validated: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub errors: BTreeMap<String, usize>,
}

/// Response of `POST /validate-emails`, one record per address in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResponse {
    pub results: Vec<OutcomeRecord>,
    pub summary: BulkSummary,
    pub workers: usize,
    pub duration_ms: u64,
}

fn text(status: StatusCode, body: impl Into<String>) -> Response {
    (status, body.into()).into_response()
}

/// GET /health
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn method_not_allowed() -> Response {
    text(StatusCode::METHOD_NOT_ALLOWED, "Invalid request method")
}

/// POST /validate-email
///
/// 400 for an undecodable body, a missing email, or an address that fails the
/// shape check. 500 with `Validation error: ...` for anything the provider
/// path reports.
pub async fn validate_email_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let req: SingleRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            debug!(error = %e, "Rejecting undecodable request body");
            return text(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let request = match ValidationRequest::new(req.email) {
        Ok(request) => request,
        Err(_) => return text(StatusCode::BAD_REQUEST, "Email is required"),
    };
    let request = match req.ip_address {
        Some(ip) => request.with_origin_address(ip),
        None => request,
    };

    // A client disconnect drops this future, which abandons the call
    let cancel = CancellationToken::new();
    match state.validator.validate_request(&request, &cancel).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err @ EmailCheckError::InvalidInput { .. }) => {
            text(StatusCode::BAD_REQUEST, err.to_string())
        }
        Err(err) => {
            warn!(email = request.email(), kind = err.kind(), error = %err, "Validation failed");
            text(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Validation error: {}", err),
            )
        }
    }
}

/// POST /validate-emails
///
/// Always answers 200 once the body decodes; per-address failures are carried
/// in the records rather than failing the request.
pub async fn validate_emails_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let req: BulkRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            debug!(error = %e, "Rejecting undecodable request body");
            return text(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    if req.emails.is_empty() {
        return text(StatusCode::BAD_REQUEST, "Emails are required");
    }

    let concurrency = req
        .concurrency
        .unwrap_or(state.validator.config().concurrency)
        .clamp(1, MAX_CONCURRENCY);

    info!(addresses = req.emails.len(), concurrency, "Bulk validation request");

    let cancel = CancellationToken::new();
    let report = state
        .validator
        .bulk_validate(req.emails, concurrency, &cancel)
        .await;

    let summary = BulkSummary {
        total: report.len(),
        validated: report.succeeded(),
        failed: report.failed(),
        cancelled: report.cancelled(),
        errors: report
            .summary()
            .into_iter()
            .map(|(kind, count)| (kind.to_string(), count))
            .collect(),
    };

    let response = BulkResponse {
        results: report.records(),
        summary,
        workers: report.workers,
        duration_ms: report.duration.as_millis() as u64,
    };

    (StatusCode::OK, Json(response)).into_response()
}
