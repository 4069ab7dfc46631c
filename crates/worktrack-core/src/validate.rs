//! Input normalisation shared by the rule services.

use crate::error::{Result, WorktrackError};

/// Character limits for free-text fields.
pub mod limits {
    pub const PROJECT_NAME: usize = 200;
    pub const PROJECT_DESCRIPTION: usize = 1000;
    pub const TASK_NAME: usize = 200;
    pub const TASK_DESCRIPTION: usize = 2000;
    pub const TASK_NOTES: usize = 2000;
    pub const COMMENT: usize = 2000;
    pub const SCHEDULE_TITLE: usize = 200;
    pub const SCHEDULE_DESCRIPTION: usize = 1000;
    pub const SCHEDULE_LOCATION: usize = 200;
    pub const NOTIFICATION_TITLE: usize = 200;
    pub const NOTIFICATION_CONTENT: usize = 2000;
    pub const NOTIFICATION_URL: usize = 500;
    pub const REPORT_TITLE: usize = 200;
    pub const REPORT_CONTENT: usize = 5000;
    pub const EMAIL: usize = 256;
    pub const EMPLOYEE_CODE: usize = 50;
}

/// Trim `value` and require `1..=max` characters.
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WorktrackError::invalid(field, "must not be empty"));
    }
    check_length(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

/// Trim `value`; blank becomes `None`. At most `max` characters.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(trimmed) => {
            check_length(field, trimmed, max)?;
            Ok(Some(trimmed.to_string()))
        }
    }
}

/// Normalise an email address to trimmed lower case.
pub fn email(value: &str) -> Result<String> {
    let email = required_text("email", value, limits::EMAIL)?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(WorktrackError::invalid("email", format!("'{}' is not an address", email))),
    }
}

/// Minimum password length accepted for new or reset credentials.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Reject passwords that are too short or all whitespace.
pub fn password(value: &str) -> Result<()> {
    if value.trim().is_empty() || value.chars().count() < MIN_PASSWORD_LEN {
        return Err(WorktrackError::invalid(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(WorktrackError::invalid(
            field,
            format!("{} characters exceeds the limit of {}", len, max),
        ));
    }
    Ok(())
}
