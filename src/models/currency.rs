//! Currency code handling.
//!
//! The ledger never converts between currencies; it only compares codes.
//! Codes are stored as three uppercase ASCII letters (ISO 4217 style).

/// Normalize a user-supplied currency code.
///
/// Trims whitespace and uppercases. Returns `None` unless the result is
/// exactly three ASCII letters.
///
/// ```text
/// "usd"  -> Some("USD")
/// " EUR" -> Some("EUR")
/// "US"   -> None
/// "U$D"  -> None
/// ```
pub fn normalize_currency(code: &str) -> Option<String> {
    let code = code.trim();
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}

/// Default currency for new cards when the request omits one.
pub fn default_currency() -> String {
    "USD".to_string()
}
