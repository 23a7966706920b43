use regex::Regex;

use crate::error::{DomainError, DomainResult};

/// Reserved match-any token; only valid in dispatch names
pub const WILDCARD_EVENT_ALIAS: char = '*';

/// Reject empty, blank and control-character names.
pub fn validate_event_name(name: &str) -> DomainResult<()> {
    if name.is_empty() {
        return Err(DomainError::EmptyEventName);
    }
    if name.trim().is_empty() || name.chars().any(char::is_control) {
        return Err(DomainError::InvalidEventName(name.to_string()));
    }
    Ok(())
}

/// Names that are stored (subscriptions, registrations) must not carry the
/// wildcard token.
pub fn validate_literal_event_name(name: &str) -> DomainResult<()> {
    validate_event_name(name)?;
    if is_wildcard(name) {
        return Err(DomainError::WildcardNotAllowed(name.to_string()));
    }
    Ok(())
}

pub fn is_wildcard(name: &str) -> bool {
    name.contains(WILDCARD_EVENT_ALIAS)
}

/// Anchored pattern compiled from a wildcard event name.
///
/// Every `*` matches any run of characters; everything else is literal.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    regex: Regex,
}

impl WildcardPattern {
    pub fn compile(name: &str) -> DomainResult<Self> {
        let body = name
            .split(WILDCARD_EVENT_ALIAS)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{}$", body))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(validate_event_name(""), Err(DomainError::EmptyEventName)));
    }

    #[test]
    fn test_blank_and_control_names_rejected() {
        assert!(matches!(validate_event_name("   "), Err(DomainError::InvalidEventName(_))));
        assert!(matches!(
            validate_event_name("user\ncreated"),
            Err(DomainError::InvalidEventName(_))
        ));
    }

    #[test]
    fn test_literal_names() {
        assert!(validate_literal_event_name("user:created").is_ok());
        assert!(matches!(
            validate_literal_event_name("user:*"),
            Err(DomainError::WildcardNotAllowed(_))
        ));
        assert!(validate_event_name("user:*").is_ok());
    }

    #[test]
    fn test_suffix_wildcard() {
        let pattern = WildcardPattern::compile("user:*").unwrap();
        assert!(pattern.matches("user:created"));
        assert!(pattern.matches("user:"));
        assert!(!pattern.matches("admin:user:created"));
        assert!(!pattern.matches("order:created"));
    }

    #[test]
    fn test_prefix_and_inner_wildcards() {
        let prefix = WildcardPattern::compile("*:created").unwrap();
        assert!(prefix.matches("user:created"));
        assert!(!prefix.matches("user:deleted"));

        let inner = WildcardPattern::compile("user.*.done").unwrap();
        assert!(inner.matches("user.signup.done"));
        assert!(!inner.matches("userXsignupXdone"));
    }

    #[test]
    fn test_regex_characters_are_literal() {
        let pattern = WildcardPattern::compile("cart(1)+*").unwrap();
        assert!(pattern.matches("cart(1)+item"));
        assert!(!pattern.matches("cart1item"));
    }
}
