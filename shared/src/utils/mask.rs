//! Masking helpers so delivery targets never appear verbatim in logs

use once_cell::sync::Lazy;
use regex::Regex;

// International phone number regex (E.164 format)
static E164_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid E.164 regex")
});

// `+` followed by digits with optional spaces, dashes and parentheses
static FORMATTED_PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[0-9 ()\-]+$").expect("valid phone formatting regex")
});

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});

/// Normalize a phone number by removing common formatting characters
pub fn normalize_phone_number(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// Check if a phone number is in E.164 format after normalization
///
/// Only spaces, dashes and parentheses count as formatting; any other
/// character rejects the number instead of being stripped.
pub fn is_e164(phone: &str) -> bool {
    let phone = phone.trim();
    FORMATTED_PHONE_REGEX.is_match(phone) && E164_REGEX.is_match(&normalize_phone_number(phone))
}

/// Check if a value looks like an email address
pub fn is_email(value: &str) -> bool {
    EMAIL_REGEX.is_match(value)
}

/// Mask a phone number keeping the leading `+`/country digits and the last 3 digits
/// (e.g., `+51999999999` -> `+51******999`)
pub fn mask_phone_number(phone: &str) -> String {
    let normalized = normalize_phone_number(phone);
    let chars: Vec<char> = normalized.chars().collect();
    if chars.len() < 7 {
        return "****".to_string();
    }
    let head = if chars[0] == '+' { 3 } else { 2 };
    let tail = 3;
    let hidden = chars.len() - head - tail;
    let mut masked: String = chars[..head].iter().collect();
    masked.push_str(&"*".repeat(hidden));
    masked.extend(&chars[chars.len() - tail..]);
    masked
}

/// Mask an email address keeping the first character of the local part
/// (e.g., `jane@example.com` -> `j***@example.com`)
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        _ => "****".to_string(),
    }
}

/// Mask any delivery target, choosing email or phone masking by shape
pub fn mask_target(target: &str) -> String {
    if target.contains('@') {
        mask_email(target)
    } else {
        mask_phone_number(target.trim_start_matches("whatsapp:"))
    }
}
