//! Checker identifiers.
//!
//! A checker id has the form `scheme:name`. Both parts use the character set
//! `[a-zA-Z0-9._-]`. The scheme also becomes a ref-name component, so it is
//! further restricted (length, `.lock` suffix, dot runs).

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{ChecksError, Result};

/// Maximum length of the scheme part.
pub const MAX_SCHEME_LENGTH: usize = 100;

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._-]+:[a-zA-Z0-9._-]+$").expect("checker id pattern compiles")
    })
}

/// Globally unique, case-sensitive checker identifier (`scheme:name`).
///
/// Ordering is lexicographic on the full string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CheckerId(String);

impl CheckerId {
    /// Parse and validate a checker id.
    pub fn parse(s: &str) -> Result<Self> {
        if !Self::is_valid(s) {
            return Err(ChecksError::InvalidCheckerId(s.to_string()));
        }
        Ok(CheckerId(s.to_string()))
    }

    /// Whether `s` is a well-formed checker id.
    pub fn is_valid(s: &str) -> bool {
        if !id_pattern().is_match(s) {
            return false;
        }
        let scheme = s.split(':').next().unwrap_or_default();
        scheme.len() <= MAX_SCHEME_LENGTH
            && !scheme.starts_with('.')
            && !scheme.ends_with(".lock")
            && !scheme.contains("..")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the colon.
    pub fn scheme(&self) -> &str {
        self.0.split_once(':').map(|(s, _)| s).unwrap_or_default()
    }

    /// The part after the colon.
    pub fn name(&self) -> &str {
        self.0.split_once(':').map(|(_, n)| n).unwrap_or_default()
    }
}

impl FromStr for CheckerId {
    type Err = ChecksError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CheckerId {
    type Error = ChecksError;

    fn try_from(s: String) -> Result<Self> {
        if !Self::is_valid(&s) {
            return Err(ChecksError::InvalidCheckerId(s));
        }
        Ok(CheckerId(s))
    }
}

impl From<CheckerId> for String {
    fn from(id: CheckerId) -> Self {
        id.0
    }
}

impl fmt::Display for CheckerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_and_name() {
        let id = CheckerId::parse("test-ci:lint.v2").unwrap();
        assert_eq!(id.scheme(), "test-ci");
        assert_eq!(id.name(), "lint.v2");
        assert_eq!(id.to_string(), "test-ci:lint.v2");
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in ["", "noscheme", ":name", "scheme:", "a:b:c", "sch eme:x", "a/b:c"] {
            assert!(!CheckerId::is_valid(bad), "{bad:?} should be invalid");
        }
    }

    #[test]
    fn rejects_schemes_unusable_in_ref_names() {
        assert!(!CheckerId::is_valid("foo.lock:x"));
        assert!(!CheckerId::is_valid(".hidden:x"));
        assert!(!CheckerId::is_valid("a..b:x"));
        assert!(!CheckerId::is_valid(&format!("{}:x", "s".repeat(101))));
        assert!(CheckerId::is_valid(&format!("{}:x", "s".repeat(100))));
    }

    #[test]
    fn is_case_sensitive_and_ordered() {
        let upper = CheckerId::parse("Test:X").unwrap();
        let lower = CheckerId::parse("test:x").unwrap();
        assert_ne!(upper, lower);

        let mut ids: Vec<CheckerId> = ["foo:baz", "abc:xyz", "foo:bar"]
            .iter()
            .map(|s| CheckerId::parse(s).unwrap())
            .collect();
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(CheckerId::as_str).collect();
        assert_eq!(sorted, vec!["abc:xyz", "foo:bar", "foo:baz"]);
    }

    #[test]
    fn serde_validates() {
        let id: CheckerId = serde_json::from_str("\"a:b\"").unwrap();
        assert_eq!(id.as_str(), "a:b");
        assert!(serde_json::from_str::<CheckerId>("\"nope\"").is_err());
    }
}
