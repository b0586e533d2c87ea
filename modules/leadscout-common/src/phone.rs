/// Country code assumed for numbers written in national format.
pub const DEFAULT_COUNTRY_CODE: &str = "55";

/// Normalize a phone number to digits with country code, the form WhatsApp
/// gateways expect (`5511933334444`).
///
/// Numbers written with a leading `+` are taken as already international.
/// National numbers (DDD + subscriber, 10 or 11 digits, optional trunk `0`)
/// get the default country code. Anything shorter is ambiguous and yields `None`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    if raw.trim_start().starts_with('+') {
        return (10..=15).contains(&digits.len()).then_some(digits);
    }

    let national = digits.strip_prefix('0').unwrap_or(&digits);
    match national.len() {
        12 | 13 if national.starts_with(DEFAULT_COUNTRY_CODE) => Some(national.to_string()),
        10 | 11 => Some(format!("{DEFAULT_COUNTRY_CODE}{national}")),
        _ => None,
    }
}
