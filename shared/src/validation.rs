//! Input normalization and parsing helpers

use serde::{Deserialize, Deserializer};

/// Normalize an email address for storage and lookup.
///
/// Emails are the login key, so `Ann@X.com ` and `ann@x.com` must resolve to
/// the same account.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Deserialize an email field already normalized.
///
/// Used with `#[serde(deserialize_with)]` so format validation sees the same
/// value the store will.
pub fn deserialize_email<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_email(&raw))
}

/// Parse a token lifetime into seconds.
///
/// Accepts a bare number of seconds (`"900"`) or a number followed by one of
/// the units `s`, `m`, `h`, `d` (`"15m"`, `"24h"`, `"7d"`).
pub fn parse_ttl(value: &str) -> Result<i64, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (digits, multiplier) = match value.chars().last() {
        Some('s') => (&value[..value.len() - 1], 1),
        Some('m') => (&value[..value.len() - 1], 60),
        Some('h') => (&value[..value.len() - 1], 60 * 60),
        Some('d') => (&value[..value.len() - 1], 24 * 60 * 60),
        _ => (value, 1),
    };

    let amount: i64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("Invalid duration: {}", value))?;

    amount
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Duration too large: {}", value))
}
