//! Field-level checks shared by records and forms.

use innkeep_core::{DomainError, DomainResult};

pub(crate) const REQUIRED: &str = "This field is required.";
pub(crate) const INVALID_EMAIL: &str = "Enter a valid email address.";

pub(crate) fn max_chars_message(value: &str, max: usize) -> Option<String> {
    let n = value.chars().count();
    (n > max).then(|| format!("Ensure this value has at most {max} characters (it has {n})."))
}

/// Lowercases the domain part, as account managers usually do.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) || email.chars().count() > 254 {
        return false;
    }
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty()
                && !l.starts_with('-')
                && !l.ends_with('-')
                && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// Record-level check for a required, bounded text column.
pub(crate) fn text(field: &str, value: &str, max: usize) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field}: {REQUIRED}")));
    }
    if let Some(msg) = max_chars_message(value, max) {
        return Err(DomainError::validation(format!("{field}: {msg}")));
    }
    Ok(())
}

pub(crate) fn email(field: &str, value: &str) -> DomainResult<()> {
    if !is_valid_email(value) {
        return Err(DomainError::validation(format!("{field}: {INVALID_EMAIL}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(is_valid_email("guest@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co"));
    }

    #[test]
    fn rejects_broken_addresses() {
        for bad in ["", "plain", "@example.com", "a@b", "a@@b.com", "a b@c.com", "a@-x.com", "a@x..com"] {
            assert!(!is_valid_email(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn normalizes_domain_case_only() {
        assert_eq!(normalize_email(" Guest@Example.COM "), "Guest@example.com");
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert!(max_chars_message("ééé", 3).is_none());
        assert_eq!(
            max_chars_message("abcd", 3).unwrap(),
            "Ensure this value has at most 3 characters (it has 4)."
        );
    }
}
