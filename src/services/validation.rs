use chrono::{NaiveDate, Utc};

use crate::models::hours::{parse_time, BusinessHours};

/// Client-facing validation failures. Messages are what the booking form
/// shows to the customer, so they stay domain-specific rather than technical.
#[derive(Debug, PartialEq)]
pub enum ValidationError {
    InvalidDateFormat,
    PastDate,
    ClosedDay { hours: String },
    InvalidTimeFormat,
    OutsideOpeningHours { hours: String },
    InvalidName,
    InvalidPhone,
    InvalidEmail,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidDateFormat => {
                write!(f, "Invalid booking date. Please pick a date from the calendar.")
            }
            ValidationError::PastDate => {
                write!(f, "Bookings cannot be made for past dates.")
            }
            ValidationError::ClosedDay { hours } => {
                write!(f, "We are closed that day. Our opening hours: {hours}")
            }
            ValidationError::InvalidTimeFormat => {
                write!(f, "Invalid booking time. Please pick a time from the list.")
            }
            ValidationError::OutsideOpeningHours { hours } => {
                write!(
                    f,
                    "That time is not bookable for the chosen service. Our opening hours: {hours}"
                )
            }
            ValidationError::InvalidName => {
                write!(f, "Please enter your name (at least 2 characters).")
            }
            ValidationError::InvalidPhone => {
                write!(f, "Please enter a valid phone number.")
            }
            ValidationError::InvalidEmail => {
                write!(f, "Please enter a valid email address.")
            }
        }
    }
}

/// Gatekeeps the requested day and time-of-day shape. Opening-hours
/// boundaries and slot availability are layered on by the orchestrator.
pub fn validate_date_time(
    date: &str,
    time: &str,
    hours: &BusinessHours,
) -> Result<(NaiveDate, String), ValidationError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDateFormat)?;

    // Date-only comparison: booking later today is fine.
    if date < Utc::now().date_naive() {
        return Err(ValidationError::PastDate);
    }

    if hours.is_closed(&date) {
        return Err(ValidationError::ClosedDay {
            hours: hours.to_human_readable(),
        });
    }

    let time = time.trim();
    if parse_time(time).is_err() {
        return Err(ValidationError::InvalidTimeFormat);
    }

    Ok((date, time.to_string()))
}

pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.chars().count() < 2 {
        return Err(ValidationError::InvalidName);
    }
    Ok(trimmed.to_string())
}

/// Normalizes by stripping common separators; accepts international format
/// with a leading `+` and 7-15 digits.
pub fn validate_phone(phone: &str) -> Result<String, ValidationError> {
    let stripped: String = phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    let (prefix, digits) = match stripped.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", stripped.as_str()),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidPhone);
    }
    if !(7..=15).contains(&digits.len()) {
        return Err(ValidationError::InvalidPhone);
    }

    Ok(format!("{prefix}{digits}"))
}

pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let normalized = email.trim().to_lowercase();

    if normalized.contains(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }

    let mut parts = normalized.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(normalized)
}
