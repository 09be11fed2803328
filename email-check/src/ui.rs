//! Display logic for the email-check CLI.
//!
//! This module handles result lines, the batch spinner, headers, and
//! summaries. Uses only the `console` crate.

use console::{style, Term};
use email_check_lib::{BatchReport, EmailCheckError, ItemOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr so stdout stays clean.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner with the given message, or `None` if stderr isn't a TTY.
    pub fn start(message: String) -> Option<Self> {
        if !Term::stderr().is_term() {
            return None;
        }

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Some(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a pretty run.
pub fn print_header(address_count: usize, concurrency: usize, rate_limit: u32) {
    println!(
        "{} {} {}",
        style("email-check").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "· Validating {} address{}",
            address_count,
            if address_count == 1 { "" } else { "es" }
        ))
        .dim(),
    );
    println!(
        "{}",
        style(format!(
            "Workers: {} · Rate limit: {}/s",
            concurrency.min(address_count.max(1)),
            rate_limit
        ))
        .dim()
    );
    println!();
}

// ── Result lines ─────────────────────────────────────────────────────────────

fn counter_prefix(counter: Option<(usize, usize)>) -> String {
    match counter {
        Some((done, total)) => {
            let width = total.to_string().len();
            format!("[{:>width$}/{}] ", done, total, width = width)
        }
        None => String::new(),
    }
}

/// Print one colored result line.
pub fn print_result(outcome: &ItemOutcome, debug: bool, counter: Option<(usize, usize)>) {
    let prefix = style(counter_prefix(counter)).dim();

    match &outcome.outcome {
        Ok(result) => {
            let status = match result.status.as_str() {
                "valid" => style(result.status.as_str()).green().bold(),
                "invalid" | "spamtrap" | "abuse" | "do_not_mail" => {
                    style(result.status.as_str()).red().bold()
                }
                _ => style(result.status.as_str()).yellow().bold(),
            };
            match &result.error {
                Some(err) => println!(
                    "{}{} {} {}",
                    prefix,
                    outcome.email,
                    status,
                    style(format!("({})", err)).dim()
                ),
                None => println!("{}{} {}", prefix, outcome.email, status),
            }
        }
        Err(err) => {
            let detail = if debug {
                err.to_string()
            } else {
                brief_error(err).to_string()
            };
            println!(
                "{}{} {} {}",
                prefix,
                outcome.email,
                style("error").red().bold(),
                style(format!("({})", detail)).dim()
            );
        }
    }
}

/// Print one plain result line.
pub fn print_result_default(outcome: &ItemOutcome, debug: bool, counter: Option<(usize, usize)>) {
    let prefix = counter_prefix(counter);

    match &outcome.outcome {
        Ok(result) => match &result.error {
            Some(err) => println!("{}{} {} ({})", prefix, outcome.email, result.status, err),
            None => println!("{}{} {}", prefix, outcome.email, result.status),
        },
        Err(err) if debug => println!("{}{} ERROR {}", prefix, outcome.email, err),
        Err(err) => println!("{}{} ERROR ({})", prefix, outcome.email, brief_error(err)),
    }
}

/// Short, user-facing description of an error.
fn brief_error(err: &EmailCheckError) -> &str {
    match err {
        EmailCheckError::InvalidInput { .. } => "invalid address",
        EmailCheckError::Cancelled { .. } => "cancelled",
        EmailCheckError::RateLimitDenied { .. } => "throttled by provider",
        EmailCheckError::NetworkError { .. } => "network error",
        EmailCheckError::MalformedResponse { .. } => "unreadable provider response",
        EmailCheckError::ProviderReportedError { message, .. } => message.as_str(),
        _ => "unexpected error",
    }
}

// ── Summaries ────────────────────────────────────────────────────────────────

/// Print totals for a finished batch.
pub fn print_summary(report: &BatchReport) {
    let secs = report.duration.as_secs_f64();
    let rate = if secs > 0.0 {
        report.len() as f64 / secs
    } else {
        0.0
    };

    println!(
        "{} {} validated, {} failed, {} cancelled in {:.2}s ({:.1}/s)",
        style("Summary:").bold(),
        style(report.succeeded()).green(),
        style(report.failed()).red(),
        style(report.cancelled()).yellow(),
        secs,
        rate
    );
}

/// Print failed addresses grouped by error kind.
pub fn print_error_summary(report: &BatchReport, debug: bool) {
    println!(
        "{}",
        style("⚠️  Some addresses could not be validated:").yellow()
    );

    for (kind, count) in report.summary() {
        let emails: Vec<&str> = report
            .outcomes
            .iter()
            .filter(|o| o.error().map(EmailCheckError::kind) == Some(kind))
            .map(|o| o.email.as_str())
            .collect();

        println!(
            "• {} {}: {}",
            count,
            kind.replace('_', " "),
            format_email_list(&emails, 5)
        );

        if debug {
            let first = report
                .outcomes
                .iter()
                .find_map(|o| o.error().filter(|e| e.kind() == kind));
            if let Some(first) = first {
                println!("    {}", style(first.to_string()).dim());
            }
        }
    }
}

/// Join a list of addresses, truncating after `max_show`.
fn format_email_list(emails: &[&str], max_show: usize) -> String {
    if emails.len() <= max_show {
        emails.join(", ")
    } else {
        let remaining = emails.len() - max_show;
        format!("{}, ... and {} more", emails[..max_show].join(", "), remaining)
    }
}
