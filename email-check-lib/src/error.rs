//! Error handling for email validation operations.
//!
//! This module defines a single error type that covers every way a validation
//! can fail, from bad input through cancelled rate-limiter waits to provider
//! responses that carry their own error message.

use crate::types::ValidationResult;
use std::fmt;

/// Main error type for email validation operations.
///
/// Input errors are raised before any rate-limiter token is consumed.
/// Transport errors are never retried internally; they are handed back to
/// whoever issued the call (the facade or a bulk worker).
#[derive(Debug, Clone)]
pub enum EmailCheckError {
    /// Empty or syntactically unusable email address
    InvalidInput {
        email: String,
        reason: String,
    },

    /// A rate-limiter wait or in-flight request was aborted by cancellation
    Cancelled {
        operation: String,
    },

    /// The provider rejected the call for exceeding its request rate
    RateLimitDenied {
        message: String,
    },

    /// Connection failure, timeout, or other transport-layer error
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// The provider was reachable but its payload could not be decoded
    MalformedResponse {
        message: String,
        status_code: Option<u16>,
        content: Option<String>,
    },

    /// The provider answered with a well-formed body carrying an error message.
    /// The decoded result is kept so callers can still inspect the status.
    ProviderReportedError {
        message: String,
        result: ValidationResult,
    },

    /// Configuration errors (invalid settings, unparsable files, etc.)
    ConfigError {
        message: String,
    },

    /// File I/O errors when reading address lists or config files
    FileError {
        path: String,
        message: String,
    },

    /// Generic internal errors that don't fit other categories
    Internal {
        message: String,
    },
}

impl EmailCheckError {
    /// Create a new invalid input error.
    pub fn invalid_input<E: Into<String>, R: Into<String>>(email: E, reason: R) -> Self {
        Self::InvalidInput {
            email: email.into(),
            reason: reason.into(),
        }
    }

    /// Create a new cancellation error.
    pub fn cancelled<O: Into<String>>(operation: O) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new malformed response error.
    pub fn malformed<M: Into<String>>(message: M) -> Self {
        Self::MalformedResponse {
            message: message.into(),
            status_code: None,
            content: None,
        }
    }

    /// Create a new provider-reported error, keeping the decoded result.
    pub fn provider_reported<M: Into<String>>(message: M, result: ValidationResult) -> Self {
        Self::ProviderReportedError {
            message: message.into(),
            result,
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short, stable identifier for this error kind.
    ///
    /// Used in reports, CSV output and JSON bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::Cancelled { .. } => "cancelled",
            Self::RateLimitDenied { .. } => "rate_limit_denied",
            Self::NetworkError { .. } => "network_error",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::ProviderReportedError { .. } => "provider_error",
            Self::ConfigError { .. } => "config_error",
            Self::FileError { .. } => "file_error",
            Self::Internal { .. } => "internal",
        }
    }

    /// Whether the caller supplied something unusable.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }

    /// Whether this error came from talking to the provider.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::RateLimitDenied { .. }
                | Self::NetworkError { .. }
                | Self::MalformedResponse { .. }
                | Self::ProviderReportedError { .. }
        )
    }

    /// The partial result attached to a provider-reported error, if any.
    pub fn partial_result(&self) -> Option<&ValidationResult> {
        match self {
            Self::ProviderReportedError { result, .. } => Some(result),
            _ => None,
        }
    }
}

impl fmt::Display for EmailCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { email, reason } => {
                if email.is_empty() {
                    write!(f, "Invalid input: {}", reason)
                } else {
                    write!(f, "Invalid input '{}': {}", email, reason)
                }
            }
            Self::Cancelled { operation } => {
                write!(f, "Cancelled while {}", operation)
            }
            Self::RateLimitDenied { message } => {
                write!(f, "Rate limit denied: {}", message)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::MalformedResponse {
                message,
                status_code,
                content: _,
            } => {
                if let Some(code) = status_code {
                    write!(f, "Malformed response (HTTP {}): {}", code, message)
                } else {
                    write!(f, "Malformed response: {}", message)
                }
            }
            Self::ProviderReportedError { message, result } => {
                write!(f, "validation error: {} (status: {})", message, result.status)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for EmailCheckError {}

// Implement From conversions for common error types
impl From<reqwest::Error> for EmailCheckError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network_with_source("Request timed out", err.to_string())
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else if err.is_decode() {
            Self::malformed(format!("Failed to decode response: {}", err))
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for EmailCheckError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(format!("JSON parsing failed: {}", err))
    }
}

impl From<std::io::Error> for EmailCheckError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_classified() {
        let input = EmailCheckError::invalid_input("", "Email is required");
        assert!(input.is_input_error());
        assert!(!input.is_transport_error());
        assert_eq!(input.kind(), "invalid_input");

        let network = EmailCheckError::network("connection refused");
        assert!(network.is_transport_error());
        assert_eq!(network.kind(), "network_error");

        let cancelled = EmailCheckError::cancelled("waiting for a rate-limit token");
        assert!(!cancelled.is_transport_error());
        assert!(!cancelled.is_input_error());
    }

    #[test]
    fn test_provider_error_keeps_partial_result() {
        let result = ValidationResult::new("invalid").with_error("Invalid API key");
        let err = EmailCheckError::provider_reported("Invalid API key", result.clone());

        assert_eq!(err.partial_result(), Some(&result));
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[test]
    fn test_display_messages() {
        let err = EmailCheckError::network_with_source("Connection failed", "dns error");
        assert_eq!(
            err.to_string(),
            "Network error: Connection failed (source: dns error)"
        );

        let err = EmailCheckError::MalformedResponse {
            message: "expected value".to_string(),
            status_code: Some(502),
            content: None,
        };
        assert_eq!(err.to_string(), "Malformed response (HTTP 502): expected value");
    }
}
