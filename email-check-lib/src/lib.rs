//! # Email Check Library
//!
//! A rate-limited, concurrent email validation client.
//!
//! Every outbound provider call passes through one shared token bucket, so the
//! aggregate request rate stays under the configured ceiling no matter how
//! many workers are running. Bulk validation fans a batch out across a fixed
//! number of workers and reports one outcome per address.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use email_check_lib::{EmailValidator, ValidatorConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let validator = EmailValidator::with_config(ValidatorConfig::new("api-key"))?;
//!     let cancel = CancellationToken::new();
//!
//!     let addresses = vec!["a@example.com".to_string(), "b@example.com".to_string()];
//!     let report = validator.bulk_validate(addresses, 2, &cancel).await;
//!
//!     for outcome in &report.outcomes {
//!         println!("{}: {:?}", outcome.email, outcome.outcome);
//!     }
//!     Ok(())
//! }
//! ```

// Re-export main public API types and functions
// This makes them available as email_check_lib::TypeName
pub use checker::EmailValidator;
pub use config::{
    apply_env_config, apply_file_config, load_env_config, load_env_config_from,
    parse_timeout_string, resolve_port, ConfigManager, EnvConfig, FileConfig, DEFAULT_PORT,
};
pub use dispatcher::{partition, BulkDispatcher};
pub use error::EmailCheckError;
pub use protocols::{ValidationTransport, ZeroBounceTransport};
pub use rate_limiter::RateLimiter;
pub use types::{
    BatchJob, BatchReport, ItemOutcome, OutcomeRecord, ProviderErrorPolicy,
    ValidationRequest, ValidationResult, ValidatorConfig, DEFAULT_PROVIDER_URL, MAX_CONCURRENCY,
};
pub use utils::{parse_address_list, read_addresses_from_file, validate_email};

// Re-exported so callers don't need a direct tokio-util dependency
pub use tokio_util::sync::CancellationToken;

/// Provider transports
pub mod protocols;

// Internal modules - these are not part of the public API
mod checker;
mod config;
mod dispatcher;
mod error;
mod rate_limiter;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, EmailCheckError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
