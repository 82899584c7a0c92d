//! Local name rules for constructs.
//!
//! A local name becomes a mapping key in the synthesized document and a path
//! segment of the construct address, so it is restricted to characters that
//! are safe as a plain YAML key, a job identifier and a file stem.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::address::SEPARATOR;
use crate::domain::error::{DomainError, DomainResult};

const NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_.-]*$";

fn name_regex() -> &'static Regex {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    NAME_REGEX.get_or_init(|| Regex::new(NAME_PATTERN).expect("valid name pattern"))
}

/// Validate a construct's local name.
pub fn validate_local_name(name: &str) -> DomainResult<()> {
    let invalid = |reason: String| DomainError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty".into()));
    }
    if name.contains(SEPARATOR) {
        return Err(invalid(format!(
            "name must not contain the address separator '{}'",
            SEPARATOR
        )));
    }
    if !name_regex().is_match(name) {
        return Err(invalid(format!("name must match {}", NAME_PATTERN)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_job_style_identifiers() {
        for name in ["ci", "build-linux", "_private", "release.v2", "Main"] {
            assert!(validate_local_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_separator_with_specific_reason() {
        let err = validate_local_name("a/b").unwrap_err();
        assert!(err.to_string().contains("separator"));
    }

    #[test]
    fn rejects_leading_digit_and_whitespace() {
        assert!(validate_local_name("1st").is_err());
        assert!(validate_local_name("with space").is_err());
        assert!(validate_local_name("colon:key").is_err());
    }
}
