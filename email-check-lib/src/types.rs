//! Core data types for email validation.
//!
//! This module defines the request/result pair exchanged with the provider,
//! the validator configuration, and the per-address outcomes produced by
//! bulk validation.

use crate::error::EmailCheckError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default provider endpoint.
pub const DEFAULT_PROVIDER_URL: &str = "https://api.zerobounce.net/v2/validate";

/// Upper bound for bulk worker count.
pub const MAX_CONCURRENCY: usize = 1000;

/// One outbound validation call.
///
/// Constructed once per call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    email: String,
    origin_address: Option<String>,
}

impl ValidationRequest {
    /// Create a request for `email`.
    ///
    /// Fails with `InvalidInput` when the address is empty or whitespace.
    pub fn new<E: Into<String>>(email: E) -> Result<Self, EmailCheckError> {
        let email = email.into();
        let trimmed = email.trim();
        if trimmed.is_empty() {
            return Err(EmailCheckError::invalid_input(
                trimmed,
                "Email is required",
            ));
        }

        Ok(Self {
            email: trimmed.to_string(),
            origin_address: None,
        })
    }

    /// Attach the IP address the email was submitted from.
    ///
    /// Empty strings are treated as absent.
    pub fn with_origin_address<A: Into<String>>(mut self, address: A) -> Self {
        let address = address.into();
        self.origin_address = if address.trim().is_empty() {
            None
        } else {
            Some(address.trim().to_string())
        };
        self
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn origin_address(&self) -> Option<&str> {
        self.origin_address.as_deref()
    }
}

/// Result of validating one email address.
///
/// `status` is provider-defined ("valid", "invalid", "catch-all", "unknown", ...).
/// `error` is only present when the provider embedded an error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(default)]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn new<S: Into<String>>(status: S) -> Self {
        Self {
            status: status.into(),
            error: None,
        }
    }

    pub fn with_error<E: Into<String>>(mut self, error: E) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Whether the provider embedded a non-empty error message.
    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// How a provider-embedded error message is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderErrorPolicy {
    /// Report the address as failed (`ProviderReportedError`), result attached.
    #[default]
    Fail,

    /// Report the address as validated, with `error` populated on the result.
    Accept,
}

impl std::str::FromStr for ProviderErrorPolicy {
    type Err = EmailCheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "accept" => Ok(Self::Accept),
            other => Err(EmailCheckError::config(format!(
                "Invalid provider error policy '{}'. Use 'fail' or 'accept'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ProviderErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderErrorPolicy::Fail => write!(f, "fail"),
            ProviderErrorPolicy::Accept => write!(f, "accept"),
        }
    }
}

/// Configuration for an `EmailValidator`.
///
/// Loaded once at process start and treated as immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Provider API key
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Provider validation endpoint
    pub provider_url: String,

    /// Deadline for each outbound request
    /// Default: 10 seconds
    #[serde(skip)]
    pub timeout: Duration,

    /// Sustained request ceiling, in requests per second
    /// Default: 5000
    pub rate_limit: u32,

    /// Token bucket capacity (burst allowance)
    /// Default: 5000
    pub burst: u32,

    /// Number of bulk workers
    /// Default: 100, Range: 1-1000
    pub concurrency: usize,

    /// Treatment of provider-embedded error messages
    pub provider_error_policy: ProviderErrorPolicy,

    /// Idle connections kept per provider host
    pub pool_max_idle_per_host: usize,

    /// How long an idle pooled connection is kept
    #[serde(skip)]
    pub pool_idle_timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            timeout: Duration::from_secs(10),
            rate_limit: 5000,
            burst: 5000,
            concurrency: 100,
            provider_error_policy: ProviderErrorPolicy::Fail,
            pool_max_idle_per_host: 100,
            pool_idle_timeout: Duration::from_secs(30),
        }
    }
}

impl ValidatorConfig {
    /// Create a default configuration for the given API key.
    pub fn new<K: Into<String>>(api_key: K) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key<K: Into<String>>(mut self, api_key: K) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_provider_url<U: Into<String>>(mut self, url: U) -> Self {
        self.provider_url = url.into();
        self
    }

    /// Set the per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the sustained request rate and bucket capacity.
    pub fn with_rate_limit(mut self, per_second: u32, burst: u32) -> Self {
        self.rate_limit = per_second;
        self.burst = burst;
        self
    }

    /// Set the bulk worker count.
    ///
    /// Automatically clamped to 1..=1000.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    pub fn with_provider_error_policy(mut self, policy: ProviderErrorPolicy) -> Self {
        self.provider_error_policy = policy;
        self
    }

    /// Check for settings the validator cannot run with.
    pub fn validate(&self) -> Result<(), EmailCheckError> {
        if self.provider_url.trim().is_empty() {
            return Err(EmailCheckError::config("Provider URL cannot be empty"));
        }
        if reqwest::Url::parse(&self.provider_url).is_err() {
            return Err(EmailCheckError::config(format!(
                "Invalid provider URL '{}'",
                self.provider_url
            )));
        }
        if self.burst == 0 {
            return Err(EmailCheckError::config("Burst must be at least 1"));
        }
        if self.rate_limit == 0 {
            return Err(EmailCheckError::config("Rate limit must be at least 1 per second"));
        }
        if self.timeout.is_zero() {
            return Err(EmailCheckError::config("Timeout must be greater than zero"));
        }
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(EmailCheckError::config(format!(
                "Concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            )));
        }
        Ok(())
    }
}

/// A bulk validation request: addresses plus the number of workers.
///
/// Lives only for the duration of one bulk call.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub addresses: Vec<String>,
    pub concurrency: usize,
}

impl BatchJob {
    pub fn new(addresses: Vec<String>, concurrency: usize) -> Self {
        Self {
            addresses,
            concurrency,
        }
    }

    /// Worker count actually launched: clamped to 1..=len, 0 for empty input.
    pub fn effective_workers(&self) -> usize {
        if self.addresses.is_empty() {
            0
        } else {
            self.concurrency.clamp(1, self.addresses.len())
        }
    }
}

/// Outcome of validating one address within a batch.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    /// Position of the address in the batch input
    pub index: usize,

    /// The address exactly as it appeared in the input
    pub email: String,

    /// Validation result or the reason it failed
    pub outcome: Result<ValidationResult, EmailCheckError>,

    /// Time spent on this address, including the rate-limiter wait
    pub duration: Option<Duration>,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&EmailCheckError> {
        self.outcome.as_ref().err()
    }

    /// Flatten into a serializable record for JSON/CSV output.
    pub fn record(&self) -> OutcomeRecord {
        match &self.outcome {
            Ok(result) => OutcomeRecord {
                email: self.email.clone(),
                status: Some(result.status.clone()),
                provider_error: result.error.clone(),
                error_kind: None,
                error: None,
            },
            Err(err) => OutcomeRecord {
                email: self.email.clone(),
                status: err.partial_result().map(|r| r.status.clone()),
                provider_error: err.partial_result().and_then(|r| r.error.clone()),
                error_kind: Some(err.kind().to_string()),
                error: Some(err.to_string()),
            },
        }
    }
}

/// Serializable view of an `ItemOutcome`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final report of a bulk validation.
///
/// Holds exactly one outcome per input address, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
    pub workers: usize,
    pub duration: Duration,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.outcome, Err(e) if !matches!(e, EmailCheckError::Cancelled { .. })))
            .count()
    }

    pub fn cancelled(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Err(EmailCheckError::Cancelled { .. })))
            .count()
    }

    /// Count of failed addresses grouped by error kind.
    pub fn summary(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for err in self.outcomes.iter().filter_map(|o| o.error()) {
            *counts.entry(err.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn records(&self) -> Vec<OutcomeRecord> {
        self.outcomes.iter().map(ItemOutcome::record).collect()
    }
}
