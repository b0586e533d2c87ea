//! Lead identity: the dedup key a business keeps across repeated searches.
//!
//! Name and address are case-folded, stripped of diacritics and punctuation,
//! and whitespace-collapsed. Trailing legal-form tokens are dropped from the
//! name so "Pizzaria Bella" and "PIZZARIA BELLA LTDA" resolve to one lead.
//! Without an address the phone stands in; without either, the name alone.

use sha2::{Digest, Sha256};

use crate::phone::normalize_phone;

/// Brazilian legal-form suffixes that do not identify a business.
const LEGAL_FORM_TOKENS: &[&str] = &["ltda", "me", "epp", "eireli", "sa", "mei"];

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Decomposed input ("a" + U+0303) carries its accents as these.
const COMBINING_MARKS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036F}';

/// Lowercase, fold diacritics, replace punctuation with spaces, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let spaced: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_diacritic)
        .filter(|c| !COMBINING_MARKS.contains(c))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `normalize_text` plus removal of trailing legal-form tokens ("ltda", "s/a", ...).
/// A name is never reduced to nothing.
pub fn normalize_name(name: &str) -> String {
    let normalized = normalize_text(name);
    let mut tokens: Vec<&str> = normalized.split(' ').collect();

    loop {
        let n = tokens.len();
        if n > 2 && tokens[n - 2] == "s" && tokens[n - 1] == "a" {
            tokens.truncate(n - 2);
        } else if n > 1 && LEGAL_FORM_TOKENS.contains(&tokens[n - 1]) {
            tokens.pop();
        } else {
            break;
        }
    }

    tokens.join(" ")
}

/// The pre-hash identity key. Exposed for diagnostics and tests.
pub fn identity_key(name: &str, address: Option<&str>, phone: Option<&str>) -> String {
    let name = normalize_name(name);
    let address = address.map(normalize_text).filter(|a| !a.is_empty());

    match (address, phone.and_then(normalize_phone)) {
        (Some(address), _) => format!("{name}|{address}"),
        (None, Some(tel)) => format!("{name}|tel:{tel}"),
        (None, None) => format!("{name}|"),
    }
}

/// Hex SHA-256 of the identity key.
pub fn fingerprint(name: &str, address: Option<&str>, phone: Option<&str>) -> String {
    let key = identity_key(name, address, phone);
    hex::encode(Sha256::digest(key.as_bytes()))
}
