//! Transport implementations for talking to validation providers.
//!
//! A transport performs exactly one outbound call per request. It never
//! retries and never touches the rate limiter; both are the caller's job.

use crate::error::EmailCheckError;
use crate::types::{ValidationRequest, ValidationResult};
use async_trait::async_trait;
use std::time::Duration;

/// ZeroBounce provider implementation
pub mod zerobounce;

pub use zerobounce::{build_query, decode_response, ZeroBounceTransport};

/// One outbound verification call for one email address.
#[async_trait]
pub trait ValidationTransport: Send + Sync {
    /// Validate `request`, giving up after `deadline`.
    ///
    /// A provider-embedded error message is returned as
    /// `EmailCheckError::ProviderReportedError` with the decoded result attached.
    async fn validate(
        &self,
        request: &ValidationRequest,
        deadline: Duration,
    ) -> Result<ValidationResult, EmailCheckError>;

    /// Provider name for logs and reports.
    fn name(&self) -> &str;
}
