//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and environment
//! variables, and layering them onto a `ValidatorConfig` with proper
//! precedence: defaults < files < environment < explicit overrides.

use crate::error::EmailCheckError;
use crate::types::{ProviderErrorPolicy, ValidatorConfig, MAX_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default inbound listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Provider connection settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderSection>,

    /// Rate and concurrency limits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<LimitsSection>,

    /// Inbound HTTP server settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerSection>,
}

/// `[provider]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Per-request deadline (as string, e.g., "500ms", "5s", "1m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// "fail" or "accept"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_policy: Option<ProviderErrorPolicy>,
}

/// `[limits]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LimitsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub burst: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which config files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, EmailCheckError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(EmailCheckError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            EmailCheckError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            EmailCheckError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config, then the home directory, then the working directory;
    /// later files override earlier ones field by field.
    pub fn discover_and_load(&self) -> Result<FileConfig, EmailCheckError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Ignoring config file"),
            }
        }

        if self.verbose {
            for path in &loaded_files {
                debug!(path = %path.display(), "Loaded config file");
            }
        }

        Ok(merged_config)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./email-check.toml", "./.email-check.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".email-check.toml", "email-check.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("email-check").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` win.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            provider: match (lower.provider, higher.provider) {
                (Some(lower), Some(higher)) => Some(ProviderSection {
                    api_key: higher.api_key.or(lower.api_key),
                    url: higher.url.or(lower.url),
                    timeout: higher.timeout.or(lower.timeout),
                    error_policy: higher.error_policy.or(lower.error_policy),
                }),
                (lower, higher) => higher.or(lower),
            },
            limits: match (lower.limits, higher.limits) {
                (Some(lower), Some(higher)) => Some(LimitsSection {
                    rate_limit: higher.rate_limit.or(lower.rate_limit),
                    burst: higher.burst.or(lower.burst),
                    concurrency: higher.concurrency.or(lower.concurrency),
                }),
                (lower, higher) => higher.or(lower),
            },
            server: match (lower.server, higher.server) {
                (Some(lower), Some(higher)) => Some(ServerSection {
                    port: higher.port.or(lower.port),
                    bind: higher.bind.or(lower.bind),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), EmailCheckError> {
        if let Some(provider) = &config.provider {
            if let Some(timeout_str) = &provider.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(EmailCheckError::config(format!(
                        "Invalid timeout format '{}'. Use format like '500ms', '5s', '2m'",
                        timeout_str
                    )));
                }
            }
        }

        if let Some(limits) = &config.limits {
            if let Some(concurrency) = limits.concurrency {
                if concurrency == 0 || concurrency > MAX_CONCURRENCY {
                    return Err(EmailCheckError::config(format!(
                        "Concurrency must be between 1 and {}",
                        MAX_CONCURRENCY
                    )));
                }
            }
            if limits.burst == Some(0) {
                return Err(EmailCheckError::config("Burst must be at least 1"));
            }
            if limits.rate_limit == Some(0) {
                return Err(EmailCheckError::config(
                    "Rate limit must be at least 1 per second",
                ));
            }
        }

        Ok(())
    }
}

/// Configuration read from environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub api_key: Option<String>,
    pub provider_url: Option<String>,
    pub timeout: Option<Duration>,
    pub rate_limit: Option<u32>,
    pub burst: Option<u32>,
    pub concurrency: Option<usize>,
    pub provider_error_policy: Option<ProviderErrorPolicy>,
    pub port: Option<u16>,
}

/// Load configuration from the process environment.
///
/// Recognizes `ZERO_BOUNCE_API_KEY` and `PORT`, plus the `EC_*` family.
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|name| env::var(name).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    // EC_API_KEY takes precedence over the provider-specific name
    env_config.api_key = get("EC_API_KEY").or_else(|| get("ZERO_BOUNCE_API_KEY"));

    if let Some(url) = get("EC_PROVIDER_URL") {
        if reqwest::Url::parse(&url).is_ok() {
            env_config.provider_url = Some(url);
        } else {
            warn!(value = %url, "Invalid EC_PROVIDER_URL, ignoring");
        }
    }

    if let Some(val) = get("EC_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(timeout) => env_config.timeout = Some(timeout),
            None => warn!(value = %val, "Invalid EC_TIMEOUT, use format like '500ms', '5s', '2m'"),
        }
    }

    if let Some(val) = get("EC_RATE_LIMIT") {
        match val.trim().parse::<u32>() {
            Ok(rate) if rate > 0 => env_config.rate_limit = Some(rate),
            _ => warn!(value = %val, "Invalid EC_RATE_LIMIT, must be at least 1"),
        }
    }

    if let Some(val) = get("EC_BURST") {
        match val.trim().parse::<u32>() {
            Ok(burst) if burst > 0 => env_config.burst = Some(burst),
            _ => warn!(value = %val, "Invalid EC_BURST, must be at least 1"),
        }
    }

    if let Some(val) = get("EC_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(c) if c > 0 && c <= MAX_CONCURRENCY => env_config.concurrency = Some(c),
            _ => warn!(value = %val, max = MAX_CONCURRENCY, "Invalid EC_CONCURRENCY"),
        }
    }

    if let Some(val) = get("EC_PROVIDER_ERROR_POLICY") {
        match val.parse::<ProviderErrorPolicy>() {
            Ok(policy) => env_config.provider_error_policy = Some(policy),
            Err(e) => warn!(error = %e, "Invalid EC_PROVIDER_ERROR_POLICY"),
        }
    }

    if let Some(val) = get("PORT") {
        match val.trim().parse::<u16>() {
            Ok(port) => env_config.port = Some(port),
            Err(_) => warn!(value = %val, "Invalid PORT, ignoring"),
        }
    }

    env_config
}

/// Apply a file configuration on top of `config`.
pub fn apply_file_config(mut config: ValidatorConfig, file: &FileConfig) -> ValidatorConfig {
    if let Some(provider) = &file.provider {
        if let Some(api_key) = &provider.api_key {
            config.api_key = api_key.clone();
        }
        if let Some(url) = &provider.url {
            config.provider_url = url.clone();
        }
        if let Some(timeout) = provider.timeout.as_deref().and_then(parse_timeout_string) {
            config.timeout = timeout;
        }
        if let Some(policy) = provider.error_policy {
            config.provider_error_policy = policy;
        }
    }

    if let Some(limits) = &file.limits {
        if let Some(rate) = limits.rate_limit {
            config.rate_limit = rate;
        }
        if let Some(burst) = limits.burst {
            config.burst = burst;
        }
        if let Some(concurrency) = limits.concurrency {
            config = config.with_concurrency(concurrency);
        }
    }

    config
}

/// Apply environment configuration on top of `config`.
pub fn apply_env_config(mut config: ValidatorConfig, env_config: &EnvConfig) -> ValidatorConfig {
    if let Some(api_key) = &env_config.api_key {
        config.api_key = api_key.clone();
    }
    if let Some(url) = &env_config.provider_url {
        config.provider_url = url.clone();
    }
    if let Some(timeout) = env_config.timeout {
        config.timeout = timeout;
    }
    if let Some(rate) = env_config.rate_limit {
        config.rate_limit = rate;
    }
    if let Some(burst) = env_config.burst {
        config.burst = burst;
    }
    if let Some(concurrency) = env_config.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(policy) = env_config.provider_error_policy {
        config.provider_error_policy = policy;
    }
    config
}

/// Resolve the inbound port: environment, then file, then the default.
pub fn resolve_port(file: &FileConfig, env_config: &EnvConfig) -> u16 {
    env_config
        .port
        .or_else(|| file.server.as_ref().and_then(|s| s.port))
        .unwrap_or(DEFAULT_PORT)
}

/// Parse a timeout string like "500ms", "5s", "2m" or a bare number of seconds.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(ms) = timeout_str.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        // Assume seconds if no unit
        timeout_str.parse::<u64>().ok().map(Duration::from_secs)
    }
}
