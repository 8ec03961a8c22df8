use crate::{errors::Error, Result};

/// Replace a leading Iranian country code (`+98` or `98`) with the local `0`.
///
/// Exactly one replacement is applied; anything else passes through unchanged.
pub fn normalize_phone(phone: &str) -> String {
    if let Some(rest) = phone.strip_prefix("+98") {
        return format!("0{rest}");
    }
    if let Some(rest) = phone.strip_prefix("98") {
        return format!("0{rest}");
    }
    phone.to_string()
}

/// Digits with an optional leading `+`.
pub fn validate_phone(phone: &str) -> Result<()> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidPhone(phone.to_string()));
    }
    Ok(())
}

/// `1000000` -> `1,000,000`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
