//! Main email validator implementation.
//!
//! This module provides the `EmailValidator` that owns the shared rate limiter
//! and provider transport, and exposes both the single-request path used by
//! the HTTP endpoint and the bulk path backed by the worker pool.

use crate::dispatcher::{BulkDispatcher, ValidationPipeline};
use crate::error::EmailCheckError;
use crate::protocols::{ValidationTransport, ZeroBounceTransport};
use crate::rate_limiter::RateLimiter;
use crate::types::{BatchJob, BatchReport, ItemOutcome, ValidatorConfig, ValidationRequest, ValidationResult};
use crate::utils::validate_email;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Email validator coordinating rate limiting and provider calls.
///
/// Cloning is cheap; clones share the same rate limiter and connection pool,
/// so the configured request ceiling holds across all of them.
///
/// # Example
///
/// ```rust,no_run
/// use email_check_lib::{EmailValidator, ValidatorConfig};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let validator = EmailValidator::with_config(ValidatorConfig::new("api-key"))?;
///     let result = validator
///         .validate_one("user@example.com", &CancellationToken::new())
///         .await?;
///     println!("Status: {}", result.status);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct EmailValidator {
    /// Configuration settings for this validator instance
    config: Arc<ValidatorConfig>,
    /// Acquire-then-call sequence shared with the bulk dispatcher
    pipeline: ValidationPipeline,
}

impl EmailValidator {
    /// Create a validator backed by the ZeroBounce transport.
    pub fn with_config(config: ValidatorConfig) -> Result<Self, EmailCheckError> {
        config.validate()?;
        let transport = ZeroBounceTransport::with_config(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a validator around any transport.
    ///
    /// The rate limiter is built from `config.burst` and `config.rate_limit`.
    pub fn with_transport(config: ValidatorConfig, transport: Arc<dyn ValidationTransport>) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.burst, config.rate_limit));
        Self::with_parts(config, transport, limiter)
    }

    /// Create a validator that shares an existing rate limiter.
    pub fn with_parts(
        config: ValidatorConfig,
        transport: Arc<dyn ValidationTransport>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        let pipeline = ValidationPipeline {
            limiter,
            transport,
            timeout: config.timeout,
            policy: config.provider_error_policy,
        };
        Self {
            config: Arc::new(config),
            pipeline,
        }
    }

    /// Validate a single address.
    ///
    /// The checking process:
    /// 1. Rejects empty or malformed input (`InvalidInput`, no token spent)
    /// 2. Waits for a rate-limiter token
    /// 3. Issues one provider call bounded by the configured timeout
    ///
    /// # Errors
    ///
    /// `InvalidInput` for bad input, `Cancelled` if `cancel` fires first,
    /// or any transport error from the provider call.
    pub async fn validate_one(
        &self,
        email: &str,
        cancel: &CancellationToken,
    ) -> Result<ValidationResult, EmailCheckError> {
        self.pipeline.run_address(email, cancel).await
    }

    /// Validate a fully built request (e.g. one carrying an origin address).
    pub async fn validate_request(
        &self,
        request: &ValidationRequest,
        cancel: &CancellationToken,
    ) -> Result<ValidationResult, EmailCheckError> {
        validate_email(request.email())?;
        self.pipeline.run(request, cancel).await
    }

    /// Validate many addresses with `concurrency` workers.
    ///
    /// Returns one outcome per address in input order.
    pub async fn bulk_validate(
        &self,
        addresses: Vec<String>,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> BatchReport {
        self.dispatcher()
            .dispatch(BatchJob::new(addresses, concurrency), cancel)
            .await
    }

    /// Validate many addresses, streaming outcomes as they complete.
    pub fn bulk_validate_stream(
        &self,
        addresses: Vec<String>,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> (mpsc::UnboundedReceiver<ItemOutcome>, JoinHandle<BatchReport>) {
        self.dispatcher()
            .dispatch_streaming(BatchJob::new(addresses, concurrency), cancel)
    }

    /// Dispatcher sharing this validator's limiter and transport.
    pub fn dispatcher(&self) -> BulkDispatcher {
        BulkDispatcher::from_pipeline(self.pipeline.clone())
    }

    /// Get the configuration for this validator.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Get the shared rate limiter.
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.pipeline.limiter
    }

    pub fn provider_name(&self) -> &str {
        self.pipeline.transport.name()
    }
}
