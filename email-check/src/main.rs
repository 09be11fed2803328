//! Email Check CLI Application
//!
//! A command-line interface for validating email addresses through a
//! rate-limited provider client. This CLI application provides a user-friendly
//! interface to the email-check-lib library.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use email_check_lib::{
    apply_env_config, apply_file_config, load_env_config, parse_address_list,
    parse_timeout_string, read_addresses_from_file, BatchReport, CancellationToken,
    ConfigManager, EmailValidator, ItemOutcome, OutcomeRecord, ProviderErrorPolicy,
    ValidationRequest, ValidatorConfig, MAX_CONCURRENCY,
};
use std::io::Read;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Exit code when at least one address could not be validated.
const EXIT_PARTIAL_FAILURE: i32 = 2;

/// CLI arguments for email-check
#[derive(Parser, Debug)]
#[command(name = "email-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Validate email addresses through a rate-limited provider client")]
#[command(
    long_about = "Validate email addresses through the ZeroBounce API.\n\nBulk lists are spread across concurrent workers while a shared token bucket keeps the outbound request rate under the configured ceiling."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Email addresses to validate
    #[arg(value_name = "ADDRESSES", help_heading = "Input")]
    pub addresses: Vec<String>,

    /// Input file with addresses (one per line, '#' comments allowed)
    #[arg(short = 'f', long = "file", value_name = "FILE", help_heading = "Input")]
    pub file: Option<String>,

    /// Read addresses from standard input
    #[arg(long = "stdin", help_heading = "Input")]
    pub stdin: bool,

    /// Origin IP address sent with single-address validations
    #[arg(long = "ip", value_name = "ADDR", help_heading = "Input")]
    pub ip: Option<String>,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Output results in CSV format
    #[arg(long = "csv", help_heading = "Output Format")]
    pub csv: bool,

    /// Enable colored, structured output
    #[arg(short = 'p', long = "pretty", help_heading = "Output Format")]
    pub pretty: bool,

    /// Collect all results before displaying
    #[arg(long = "batch", help_heading = "Output Format")]
    pub batch: bool,

    /// Show results as they complete
    #[arg(long = "streaming", help_heading = "Output Format")]
    pub streaming: bool,

    /// Concurrent bulk workers (default: 100, max: 1000)
    #[arg(short = 'c', long = "concurrency", help_heading = "Performance")]
    pub concurrency: Option<usize>,

    /// Sustained outbound request ceiling per second (default: 5000)
    #[arg(long = "rate-limit", value_name = "N", help_heading = "Performance")]
    pub rate_limit: Option<u32>,

    /// Token bucket capacity (default: 5000)
    #[arg(long = "burst", value_name = "N", help_heading = "Performance")]
    pub burst: Option<u32>,

    /// Per-request timeout, e.g. 500ms, 10s, 1m
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Provider API key (overrides ZERO_BOUNCE_API_KEY / EC_API_KEY)
    #[arg(long = "api-key", value_name = "KEY", help_heading = "Provider")]
    pub api_key: Option<String>,

    /// Provider endpoint URL
    #[arg(long = "provider-url", value_name = "URL", help_heading = "Provider")]
    pub provider_url: Option<String>,

    /// Treat provider-reported errors as results instead of failures
    #[arg(long = "accept-provider-errors", help_heading = "Provider")]
    pub accept_provider_errors: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show detailed debug information and error messages
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_tracing(&args);

    match run_email_check(args).await {
        Ok(true) => {}
        Ok(false) => process::exit(EXIT_PARTIAL_FAILURE),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Install the log subscriber; logs go to stderr so stdout stays parseable.
fn init_tracing(args: &Args) {
    let default_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.addresses.is_empty() && args.file.is_none() && !args.stdin {
        return Err(
            "You must specify email addresses, a file with --file, or --stdin".to_string(),
        );
    }

    if args.batch && args.streaming {
        return Err("Cannot specify both --batch and --streaming modes".to_string());
    }

    if args.json && args.csv {
        return Err("Cannot specify multiple output formats (--json, --csv)".to_string());
    }

    if args.streaming && (args.json || args.csv) {
        return Err(
            "Cannot use --streaming with --json or --csv. Use --batch for structured output"
                .to_string(),
        );
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(format!(
                "Concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            ));
        }
    }

    if args.burst == Some(0) {
        return Err("Burst must be at least 1".to_string());
    }

    if args.rate_limit == Some(0) {
        return Err("Rate limit must be at least 1 per second".to_string());
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '500ms', '10s', '1m'",
                timeout
            ));
        }
    }

    Ok(())
}

/// Main validation logic.
///
/// Returns `Ok(true)` when every address validated.
async fn run_email_check(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let config = build_config(&args)?;

    if config.api_key.trim().is_empty() {
        return Err(
            "No provider API key. Set ZERO_BOUNCE_API_KEY, EC_API_KEY, or pass --api-key".into(),
        );
    }

    let addresses = get_addresses_to_check(&args).await?;
    if addresses.is_empty() {
        return Err("No email addresses to validate".into());
    }

    let validator = EmailValidator::with_config(config)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling outstanding requests");
                cancel.cancel();
            }
        });
    }

    if addresses.len() == 1 {
        return run_single_check(&validator, &addresses[0], &args, &cancel).await;
    }

    if should_use_streaming(&args, addresses.len()) {
        run_streaming_check(&validator, addresses, &args, cancel).await
    } else {
        run_batch_check(&validator, addresses, &args, &cancel).await
    }
}

/// Determine whether to use streaming or batch mode
fn should_use_streaming(args: &Args, address_count: usize) -> bool {
    if args.batch {
        return false;
    }

    if args.streaming {
        return true;
    }

    // Stream for multiple addresses unless in JSON/CSV mode
    address_count > 1 && !args.json && !args.csv
}

/// Validate one address through the single-request path.
async fn run_single_check(
    validator: &EmailValidator,
    email: &str,
    args: &Args,
    cancel: &CancellationToken,
) -> Result<bool, Box<dyn std::error::Error>> {
    let start_time = Instant::now();

    let outcome = match &args.ip {
        Some(ip) => match ValidationRequest::new(email) {
            Ok(request) => {
                validator
                    .validate_request(&request.with_origin_address(ip.as_str()), cancel)
                    .await
            }
            Err(e) => Err(e),
        },
        None => validator.validate_one(email, cancel).await,
    };

    let item = ItemOutcome {
        index: 0,
        email: email.to_string(),
        outcome,
        duration: Some(start_time.elapsed()),
    };
    let succeeded = item.is_success();

    let report = BatchReport {
        outcomes: vec![item],
        workers: 1,
        duration: start_time.elapsed(),
    };
    display_results(&report, args)?;

    Ok(succeeded)
}

/// Run bulk validation, printing each outcome as it completes.
async fn run_streaming_check(
    validator: &EmailValidator,
    addresses: Vec<String>,
    args: &Args,
    cancel: CancellationToken,
) -> Result<bool, Box<dyn std::error::Error>> {
    let total = addresses.len();
    let concurrency = effective_concurrency(validator, args);

    if args.pretty {
        ui::print_header(total, concurrency, validator.config().rate_limit);
    } else {
        tracing::info!(addresses = total, concurrency, "Validating addresses");
    }

    let (mut rx, handle) = validator.bulk_validate_stream(addresses, concurrency, cancel);

    let mut completed = 0usize;
    while let Some(outcome) = rx.recv().await {
        completed += 1;
        let counter = Some((completed, total));
        if args.pretty {
            ui::print_result(&outcome, args.debug, counter);
        } else {
            ui::print_result_default(&outcome, args.debug, counter);
        }
    }

    let report = handle.await?;

    println!();
    ui::print_summary(&report);
    if report.failed() > 0 || report.cancelled() > 0 {
        println!();
        ui::print_error_summary(&report, args.debug);
    }

    Ok(report.succeeded() == report.len())
}

/// Run bulk validation, collecting every outcome before displaying.
async fn run_batch_check(
    validator: &EmailValidator,
    addresses: Vec<String>,
    args: &Args,
    cancel: &CancellationToken,
) -> Result<bool, Box<dyn std::error::Error>> {
    let is_structured = args.json || args.csv;
    let total = addresses.len();
    let concurrency = effective_concurrency(validator, args);

    if args.pretty && !is_structured {
        ui::print_header(total, concurrency, validator.config().rate_limit);
    }

    let spinner = if !is_structured {
        ui::Spinner::start(format!("Validating {} addresses...", total))
    } else {
        None
    };

    let report = validator.bulk_validate(addresses, concurrency, cancel).await;

    if let Some(spinner) = spinner {
        spinner.stop().await;
    }

    display_results(&report, args)?;

    if !is_structured {
        println!();
        ui::print_summary(&report);
        if report.failed() > 0 || report.cancelled() > 0 {
            println!();
            ui::print_error_summary(&report, args.debug);
        }
    }

    Ok(report.succeeded() == report.len())
}

fn effective_concurrency(validator: &EmailValidator, args: &Args) -> usize {
    args.concurrency.unwrap_or(validator.config().concurrency)
}

/// Build the validator configuration.
///
/// Precedence: defaults < config file(s) < environment < CLI flags.
fn build_config(args: &Args) -> Result<ValidatorConfig, Box<dyn std::error::Error>> {
    let manager = ConfigManager::new(args.verbose);
    let file_config = match &args.config {
        Some(path) => manager.load_file(path)?,
        None => manager.discover_and_load()?,
    };

    let config = apply_file_config(ValidatorConfig::default(), &file_config);
    let config = apply_env_config(config, &load_env_config());

    Ok(apply_cli_args_to_config(config, args))
}

fn apply_cli_args_to_config(mut config: ValidatorConfig, args: &Args) -> ValidatorConfig {
    if let Some(api_key) = &args.api_key {
        config.api_key = api_key.clone();
    }
    if let Some(url) = &args.provider_url {
        config.provider_url = url.clone();
    }
    if let Some(timeout) = args.timeout.as_deref().and_then(parse_timeout_string) {
        config.timeout = timeout;
    }
    if let Some(rate) = args.rate_limit {
        config.rate_limit = rate;
    }
    if let Some(burst) = args.burst {
        config.burst = burst;
    }
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if args.accept_provider_errors {
        config.provider_error_policy = ProviderErrorPolicy::Accept;
    }
    config
}

/// Gather addresses from positional args, --file, and --stdin, in that order.
async fn get_addresses_to_check(args: &Args) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut addresses: Vec<String> = args
        .addresses
        .iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();

    if let Some(file) = &args.file {
        addresses.extend(read_addresses_from_file(file).await?);
    }

    if args.stdin {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        addresses.extend(parse_address_list(&input));
    }

    Ok(addresses)
}

/// Display results in the requested format.
fn display_results(report: &BatchReport, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.json {
        display_json_results(report)
    } else if args.csv {
        display_csv_results(report);
        Ok(())
    } else {
        display_text_results(report, args);
        Ok(())
    }
}

fn display_json_results(report: &BatchReport) -> Result<(), Box<dyn std::error::Error>> {
    let records = report.records();
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn display_csv_results(report: &BatchReport) {
    println!("email,status,provider_error,error_kind,error");
    for record in report.records() {
        println!("{}", csv_line(&record));
    }
}

fn csv_line(record: &OutcomeRecord) -> String {
    [
        Some(record.email.as_str()),
        record.status.as_deref(),
        record.provider_error.as_deref(),
        record.error_kind.as_deref(),
        record.error.as_deref(),
    ]
    .iter()
    .map(|field| csv_escape(field.unwrap_or("")))
    .collect::<Vec<_>>()
    .join(",")
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn display_text_results(report: &BatchReport, args: &Args) {
    for outcome in &report.outcomes {
        if args.pretty {
            ui::print_result(outcome, args.debug, None);
        } else {
            ui::print_result_default(outcome, args.debug, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use email_check_lib::{EmailCheckError, ValidationResult};

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["email-check"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_validate_args_requires_input() {
        assert!(validate_args(&args(&[])).is_err());
        assert!(validate_args(&args(&["a@x.com"])).is_ok());
        assert!(validate_args(&args(&["--stdin"])).is_ok());
    }

    #[test]
    fn test_validate_args_conflicts() {
        assert!(validate_args(&args(&["a@x.com", "--json", "--csv"])).is_err());
        assert!(validate_args(&args(&["a@x.com", "--batch", "--streaming"])).is_err());
        assert!(validate_args(&args(&["a@x.com", "--streaming", "--json"])).is_err());
        assert!(validate_args(&args(&["a@x.com", "-c", "0"])).is_err());
        assert!(validate_args(&args(&["a@x.com", "-c", "1001"])).is_err());
        assert!(validate_args(&args(&["a@x.com", "--timeout", "soon"])).is_err());
        assert!(validate_args(&args(&["a@x.com", "--rate-limit", "0"])).is_err());
        assert!(validate_args(&args(&["a@x.com", "--rate-limit", "1"])).is_ok());
    }

    #[test]
    fn test_cli_args_override_config() {
        let config = apply_cli_args_to_config(
            ValidatorConfig::new("from-env"),
            &args(&[
                "a@x.com",
                "--api-key",
                "from-cli",
                "--rate-limit",
                "10",
                "--burst",
                "5",
                "--timeout",
                "750ms",
                "-c",
                "4",
                "--accept-provider-errors",
            ]),
        );

        assert_eq!(config.api_key, "from-cli");
        assert_eq!(config.rate_limit, 10);
        assert_eq!(config.burst, 5);
        assert_eq!(config.timeout, std::time::Duration::from_millis(750));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.provider_error_policy, ProviderErrorPolicy::Accept);
    }

    #[test]
    fn test_should_use_streaming() {
        assert!(should_use_streaming(&args(&["a@x.com"]), 3));
        assert!(!should_use_streaming(&args(&["a@x.com", "--batch"]), 3));
        assert!(!should_use_streaming(&args(&["a@x.com", "--json"]), 3));
    }

    #[test]
    fn test_csv_line_escapes_fields() {
        let outcome = ItemOutcome {
            index: 0,
            email: "a@x.com".to_string(),
            outcome: Err(EmailCheckError::network("refused, twice")),
            duration: None,
        };
        let line = csv_line(&outcome.record());
        assert_eq!(
            line,
            "a@x.com,,,network_error,\"Network error: refused, twice\""
        );

        let ok = ItemOutcome {
            index: 1,
            email: "b@x.com".to_string(),
            outcome: Ok(ValidationResult::new("valid")),
            duration: None,
        };
        assert_eq!(csv_line(&ok.record()), "b@x.com,valid,,,");
    }
}
