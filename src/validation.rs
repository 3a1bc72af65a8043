use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};

pub const MAX_TEXT_LEN: usize = 255;

pub const BRAZILIAN_STATES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS",
    "MG", "PA", "PB", "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC",
    "SP", "SE", "TO",
];

pub fn is_valid_email(string: &str) -> Result<(), String> {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
    match RE.is_match(string) && string.len() <= MAX_TEXT_LEN {
        true => Ok(()),
        false => Err("Invalid email".to_string()),
    }
}

/// Checks the password policy, returning every rule that was broken.
pub fn check_password_strength(password: &str) -> Result<(), Vec<String>> {
    static UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]").unwrap());
    static LOWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]").unwrap());
    static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").unwrap());

    let mut errors = Vec::new();
    let len = password.chars().count();

    if len < 8 {
        errors.push("Password must be at least 8 characters long".to_string());
    }
    if !UPPER.is_match(password) {
        errors.push(
            "Password must contain at least one upper-case letter".to_string(),
        );
    }
    if !LOWER.is_match(password) {
        errors.push(
            "Password must contain at least one lower-case letter".to_string(),
        );
    }
    if !DIGIT.is_match(password) {
        errors.push("Password must contain at least one digit".to_string());
    }
    if len > 128 {
        errors.push("Password must be at most 128 characters long".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn is_valid_state_code(code: &str) -> Result<(), String> {
    match BRAZILIAN_STATES.contains(&code) {
        true => Ok(()),
        false => Err(format!("Invalid state code: {code}")),
    }
}

/// Trims the input and caps it at [`MAX_TEXT_LEN`] characters.
pub fn sanitize_input(input: &str) -> String {
    input.trim().chars().take(MAX_TEXT_LEN).collect()
}

pub fn sanitize_email(email: &str) -> String {
    sanitize_input(email).to_lowercase()
}

/// Treats missing, empty and whitespace-only strings alike.
pub fn non_blank(input: Option<&str>) -> Option<String> {
    input
        .map(sanitize_input)
        .filter(|s| !s.is_empty())
}

/// Accepts RFC 3339 timestamps, `datetime-local` style values and plain
/// dates (taken as midnight).
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.naive_utc());
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Distinguishes a key which is absent (`None`) from one which is explicitly
/// `null` (`Some(None)`). Use with `#[serde(default)]`.
pub fn deserialize_some<'de, T, D>(
    deserializer: D,
) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
