//! ZeroBounce validation API client.
//!
//! Issues `GET <provider_url>?api_key=..&email=..[&ip_address=..]` and decodes
//! the `{"status": .., "error": ..}` body. The underlying `reqwest::Client`
//! keeps a connection pool that is shared by every caller of this transport.

use crate::error::EmailCheckError;
use crate::protocols::ValidationTransport;
use crate::types::{ValidationRequest, ValidationResult, ValidatorConfig};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Longest body excerpt kept on a `MalformedResponse`.
const MAX_CONTENT_EXCERPT: usize = 256;

/// Wire format of the provider response.
///
/// Both fields are optional on the wire; at least one must be present.
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    status: Option<String>,
    error: Option<String>,
}

/// Production transport backed by the ZeroBounce API.
#[derive(Clone)]
pub struct ZeroBounceTransport {
    /// Pooled HTTP client, reused across all requests
    http_client: reqwest::Client,
    /// Validation endpoint
    base_url: String,
    /// Provider API key
    api_key: String,
}

impl ZeroBounceTransport {
    /// Create a transport with default pool settings.
    pub fn new<K: Into<String>>(api_key: K) -> Result<Self, EmailCheckError> {
        Self::with_config(&ValidatorConfig::new(api_key))
    }

    /// Create a transport from a validator configuration.
    pub fn with_config(config: &ValidatorConfig) -> Result<Self, EmailCheckError> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .connect_timeout(config.timeout)
            .user_agent(concat!("email-check/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                EmailCheckError::network_with_source(
                    "Failed to create provider HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            http_client,
            base_url: config.provider_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(
        &self,
        request: &ValidationRequest,
        deadline: Duration,
    ) -> Result<(StatusCode, Vec<u8>), EmailCheckError> {
        let params = build_query(&self.api_key, request);

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&params)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| request_error(e, deadline))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| request_error(e, deadline))?;

        Ok((status, body.to_vec()))
    }
}

#[async_trait]
impl ValidationTransport for ZeroBounceTransport {
    async fn validate(
        &self,
        request: &ValidationRequest,
        deadline: Duration,
    ) -> Result<ValidationResult, EmailCheckError> {
        let start_time = Instant::now();

        let (status, body) = self.send(request, deadline).await.map_err(|e| {
            warn!(email = request.email(), error = %e, "provider request failed");
            e
        })?;

        debug!(
            email = request.email(),
            status = status.as_u16(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "provider responded"
        );

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EmailCheckError::RateLimitDenied {
                message: format!("provider returned HTTP {}", status.as_u16()),
            });
        }

        decode_response(status.as_u16(), &body)
    }

    fn name(&self) -> &str {
        "zerobounce"
    }
}

/// Build the outbound query parameters for `request`.
///
/// `ip_address` is only included when the request carries an origin address.
pub fn build_query(api_key: &str, request: &ValidationRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("api_key", api_key.to_string()),
        ("email", request.email().to_string()),
    ];
    if let Some(ip) = request.origin_address() {
        params.push(("ip_address", ip.to_string()));
    }
    params
}

/// Decode a provider response body.
///
/// The body is decoded regardless of the HTTP status, because the provider
/// reports some failures (bad key, exhausted credits) in a JSON body.
pub fn decode_response(status_code: u16, body: &[u8]) -> Result<ValidationResult, EmailCheckError> {
    let malformed = |message: String| EmailCheckError::MalformedResponse {
        message,
        status_code: Some(status_code),
        content: Some(excerpt(body)),
    };

    let parsed: ProviderResponse = serde_json::from_slice(body)
        .map_err(|e| malformed(format!("Failed to parse response: {}", e)))?;

    let error = parsed.error.filter(|e| !e.trim().is_empty());
    let result = match (parsed.status, error) {
        (None, None) => return Err(malformed("Response is missing 'status'".to_string())),
        (status, error) => ValidationResult {
            status: status.unwrap_or_else(|| "unknown".to_string()),
            error,
        },
    };

    if let Some(message) = result.error.clone() {
        return Err(EmailCheckError::provider_reported(message, result));
    }

    Ok(result)
}

fn request_error(err: reqwest::Error, deadline: Duration) -> EmailCheckError {
    if err.is_timeout() {
        EmailCheckError::network_with_source(
            format!("Request timed out after {:?}", deadline),
            err.to_string(),
        )
    } else {
        EmailCheckError::from(err)
    }
}

fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    text.chars().take(MAX_CONTENT_EXCERPT).collect()
}
