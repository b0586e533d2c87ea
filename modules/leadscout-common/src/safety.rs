use regex::Regex;
use std::sync::LazyLock;

use crate::error::LeadScoutError;

pub const MAX_QUERY_LEN: usize = 200;
pub const MAX_LOCATION_LEN: usize = 100;

static INJECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(union\s+select|insert\s+into|update\s+.+\s+set|delete\s+from|drop\s+table|exec\s*\(|script\s*>)",
    )
    .unwrap()
});

/// A validated, sanitized search term pair, safe to embed in a provider query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchInput {
    pub query: String,
    pub location: String,
}

impl SearchInput {
    /// The composed place query sent to the maps provider.
    pub fn provider_query(&self) -> String {
        format!("{} em {}", self.query, self.location)
    }
}

/// Keep letters (accented included), digits, whitespace and `.,-'`; drop
/// everything else, control characters included. Collapses whitespace.
pub fn sanitize_term(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | ',' | '-' | '\''))
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate and sanitize a query/location pair. Runs before any provider or
/// store call; every failure is a `Validation` error.
pub fn validate_search_input(query: &str, location: &str) -> Result<SearchInput, LeadScoutError> {
    let query = query.trim();
    let location = location.trim();

    if query.is_empty() || location.is_empty() {
        return Err(LeadScoutError::Validation(
            "Query and location are required".to_string(),
        ));
    }

    if query.chars().count() > MAX_QUERY_LEN || location.chars().count() > MAX_LOCATION_LEN {
        return Err(LeadScoutError::Validation(format!(
            "Query must be under {MAX_QUERY_LEN} characters and location under {MAX_LOCATION_LEN} characters"
        )));
    }

    if INJECTION_RE.is_match(query) || INJECTION_RE.is_match(location) {
        tracing::warn!("Rejected search input matching injection pattern");
        return Err(LeadScoutError::Validation("Invalid input detected".to_string()));
    }

    let input = SearchInput {
        query: sanitize_term(query),
        location: sanitize_term(location),
    };

    if input.query.is_empty() || input.location.is_empty() {
        return Err(LeadScoutError::Validation(
            "Query and location cannot be empty after sanitization".to_string(),
        ));
    }

    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_trims_regular_terms() {
        let input = validate_search_input("  Pizzarias ", " São Paulo, SP ").unwrap();
        assert_eq!(input.query, "Pizzarias");
        assert_eq!(input.location, "São Paulo, SP");
        assert_eq!(input.provider_query(), "Pizzarias em São Paulo, SP");
    }

    #[test]
    fn blank_terms_are_rejected() {
        assert!(validate_search_input("", "São Paulo").is_err());
        assert!(validate_search_input("Pizzarias", "   ").is_err());
        assert!(validate_search_input("\t\n", "\t").is_err());
    }

    #[test]
    fn oversized_terms_are_rejected() {
        let long_query = "a".repeat(MAX_QUERY_LEN + 1);
        assert!(validate_search_input(&long_query, "São Paulo").is_err());

        let long_location = "b".repeat(MAX_LOCATION_LEN + 1);
        assert!(validate_search_input("Pizzarias", &long_location).is_err());

        // Limits count characters, not bytes.
        let accented = "ã".repeat(MAX_LOCATION_LEN);
        assert!(validate_search_input("Pizzarias", &accented).is_ok());
    }

    #[test]
    fn control_characters_and_symbols_are_stripped() {
        assert_eq!(sanitize_term("Pizza\u{0007}rias <b>&"), "Pizzarias b");
        assert_eq!(sanitize_term("D'Ávila\tBar"), "D'Ávila Bar");
    }

    #[test]
    fn input_that_sanitizes_to_nothing_is_rejected() {
        let err = validate_search_input("<<>>", "São Paulo").unwrap_err();
        assert!(err.to_string().contains("empty after sanitization"));
    }

    #[test]
    fn injection_shaped_input_is_rejected() {
        assert!(validate_search_input("x' union select * from leads", "SP").is_err());
        assert!(validate_search_input("Pizzarias", "<script>alert(1)</script>").is_err());
    }
}
