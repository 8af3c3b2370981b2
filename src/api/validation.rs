//! Input validation for API requests.
//!
//! Validators return `Result<(), String>` so handlers can feed them into
//! [`ValidationErrorBuilder::check`](super::error::ValidationErrorBuilder::check).

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::UserRole;

lazy_static! {
    /// Loose address check: something@something.tld, no whitespace
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^\s@]+@[^\s@]+\.[^\s@]+$"
    ).unwrap();

    /// Course join codes as handed out: three groups of three, e.g. `K7Q-2MX-P9A`
    static ref JOIN_CODE_REGEX: Regex = Regex::new(
        r"^[A-Z0-9]{3}-[A-Z0-9]{3}-[A-Z0-9]{3}$"
    ).unwrap();

    /// Course cover image: a web link or an inline image data URL
    static ref IMAGE_URL_REGEX: Regex = Regex::new(
        r"^(https?://\S+|data:image/[a-zA-Z0-9.+-]+;base64,[A-Za-z0-9+/=]+)$"
    ).unwrap();

    /// Calendar date `YYYY-MM-DD`
    static ref DATE_REGEX: Regex = Regex::new(
        r"^\d{4}-\d{2}-\d{2}$"
    ).unwrap();
}

pub const MAX_NAME_LENGTH: usize = 200;

/// Validate an email address and the institutional domain suffix
pub fn validate_email(email: &str, required_suffix: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    if !required_suffix.is_empty() && !email.to_lowercase().ends_with(&required_suffix.to_lowercase()) {
        return Err(format!("Email must end with {}", required_suffix));
    }
    Ok(())
}

/// Validate a required, single-line display value such as a name or title
pub fn validate_text(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(format!(
            "{} is too long (max {} characters)",
            label, MAX_NAME_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_role(role: &str) -> Result<UserRole, String> {
    role.parse::<UserRole>()
        .map_err(|_| "Role must be either 'instructor' or 'student'".to_string())
}

/// Normalize a join code typed by a student (case, stray spaces)
pub fn normalize_join_code(code: &str) -> Result<String, String> {
    let normalized: String = code
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    if JOIN_CODE_REGEX.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err("Join code must look like ABC-123-XYZ".to_string())
    }
}

pub fn validate_image_url(value: &str) -> Result<(), String> {
    if IMAGE_URL_REGEX.is_match(value.trim()) {
        Ok(())
    } else {
        Err("Image must be an http(s) URL or an image data URL".to_string())
    }
}

/// Validate an optional assessment date (`YYYY-MM-DD` or RFC 3339)
pub fn validate_date(value: &Option<String>) -> Result<(), String> {
    let Some(value) = value.as_deref().filter(|v| !v.is_empty()) else {
        return Ok(());
    };

    let valid = if DATE_REGEX.is_match(value) {
        chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
    } else {
        chrono::DateTime::parse_from_rfc3339(value).is_ok()
    };

    if valid {
        Ok(())
    } else {
        Err("Date must be YYYY-MM-DD or an RFC 3339 timestamp".to_string())
    }
}
