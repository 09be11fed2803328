//! HTTP API for the email validation client.
//!
//! Every handler shares one [`EmailValidator`], so all inbound requests draw
//! from the same outbound rate limiter.

use axum::{
    routing::{get, post},
    Router,
};
use email_check_lib::EmailValidator;

mod handlers;

pub use handlers::{BulkRequest, BulkResponse, BulkSummary, SingleRequest};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub validator: EmailValidator,
}

impl AppState {
    pub fn new(validator: EmailValidator) -> Self {
        Self { validator }
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/validate-email",
            post(handlers::validate_email_handler).fallback(handlers::method_not_allowed),
        )
        .route(
            "/validate-emails",
            post(handlers::validate_emails_handler).fallback(handlers::method_not_allowed),
        )
        .with_state(state)
}
