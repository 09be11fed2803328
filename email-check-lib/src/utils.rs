//! Utility functions for email address input.
//!
//! This module contains the pre-flight syntax check applied before any
//! rate-limiter token is spent, and helpers for reading address lists.

use crate::error::EmailCheckError;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

/// Longest address accepted (RFC 5321 path limit minus the angle brackets).
pub const MAX_EMAIL_LENGTH: usize = 254;

lazy_static! {
    static ref EMAIL_SHAPE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+$").expect("valid email regex");
}

/// Check that an address is worth sending to the provider.
///
/// This is a shape check only (one `@`, non-empty local and domain parts,
/// no whitespace). Deliverability is the provider's call.
pub fn validate_email(email: &str) -> Result<(), EmailCheckError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(EmailCheckError::invalid_input(email, "Email is required"));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(EmailCheckError::invalid_input(
            email,
            format!("Email is longer than {} characters", MAX_EMAIL_LENGTH),
        ));
    }

    if !EMAIL_SHAPE.is_match(email) {
        return Err(EmailCheckError::invalid_input(
            email,
            "Email must look like local@domain",
        ));
    }

    Ok(())
}

/// Parse a newline-separated address list.
///
/// Blank lines and lines starting with `#` are skipped; surrounding
/// whitespace is trimmed. Order is preserved and duplicates are kept.
pub fn parse_address_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Read an address list from a file.
pub async fn read_addresses_from_file<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<String>, EmailCheckError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        EmailCheckError::file_error(
            path.to_string_lossy(),
            format!("Failed to read address list: {}", e),
        )
    })?;

    let addresses = parse_address_list(&content);
    if addresses.is_empty() {
        return Err(EmailCheckError::file_error(
            path.to_string_lossy(),
            "No email addresses found",
        ));
    }

    Ok(addresses)
}
