//! # Input Coercion
//!
//! The validation boundary between operator text (or loosely typed JSON)
//! and the engine. Numbers that fail to parse, are not finite or are
//! negative are silently corrected to 0 before they reach pricing; nothing
//! here ever fails.
//!
//! The serde helpers in this module apply the same rules while
//! deserializing, so a stored `"qty": "3"` reads as `3.0` and a stored
//! `"rate": -10` reads as `0.0`.

use serde::{Deserialize, Deserializer};

/// Largest markup percentage a line accepts.
pub const MAX_MARKUP_PERCENT: f64 = 100.0;

/// Clamp an amount to a finite, non-negative value.
pub fn sanitize_amount(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Clamp a percentage to `[0, 100]`.
pub fn sanitize_percent(value: f64) -> f64 {
    sanitize_amount(value).min(MAX_MARKUP_PERCENT)
}

/// Parse operator text into an amount. Blank and garbage become 0.
///
/// ```rust
/// use quote_core::input::parse_amount;
///
/// assert_eq!(parse_amount(" 12.5 "), 12.5);
/// assert_eq!(parse_amount(""), 0.0);
/// assert_eq!(parse_amount("abc"), 0.0);
/// assert_eq!(parse_amount("-4"), 0.0);
/// ```
pub fn parse_amount(text: &str) -> f64 {
    text.trim().parse::<f64>().map(sanitize_amount).unwrap_or(0.0)
}

/// Parse operator text into a percentage in `[0, 100]`.
pub fn parse_percent(text: &str) -> f64 {
    sanitize_percent(parse_amount(text))
}

/// Parse text as a number, returning `None` when blank or non-numeric.
///
/// Used for fields whose blank state means "use the default".
pub fn parse_optional(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn value(self) -> Option<f64> {
        match self {
            NumberOrText::Number(n) => Some(n).filter(|v| v.is_finite()),
            NumberOrText::Text(s) => parse_optional(&s),
        }
    }
}

/// Deserialize a non-negative amount from a number, numeric text or null.
pub(crate) fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(raw.and_then(NumberOrText::value).map(sanitize_amount).unwrap_or(0.0))
}

/// Deserialize an optional percentage. Null stays `None` so the caller's
/// default applies; numbers and numeric text are clamped to `[0, 100]`.
/// Non-numeric text coerces to 0, the same as at the input boundary.
pub(crate) fn de_optional_percent<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        None => None,
        Some(raw) => Some(raw.value().map(sanitize_percent).unwrap_or(0.0)),
    })
}

/// Deserialize an optional number where blank text and null both mean
/// "not set". Used by project fields that fall back to settings defaults.
pub(crate) fn de_optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<NumberOrText>::deserialize(deserializer)?
        .and_then(NumberOrText::value)
        .map(sanitize_amount))
}

/// Deserialize a string that older files may have stored as a number.
pub(crate) fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        None => String::new(),
        Some(NumberOrText::Text(s)) => s,
        Some(NumberOrText::Number(n)) => n.to_string(),
    })
}
