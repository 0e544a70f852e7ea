//! Runtime configuration for the checks services.
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults
//! 2. a TOML file named by `CHECKS_CONFIG`
//! 3. `CHECKS_*` environment variables

use checks_state::PersonIdent;
use serde::{Deserialize, Serialize};

use crate::domain::error::{ChecksError, Result};

/// Default bound on optimistic-concurrency retries.
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// Attempts per write before giving up with `Conflict`. At least 1.
    pub max_commit_attempts: u32,
    /// Identity recorded on commits written by the server.
    pub committer_name: String,
    pub committer_email: String,
    /// Emit newline-delimited JSON logs.
    pub log_json: bool,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
            committer_name: "Checks Server".to_string(),
            committer_email: "noreply@checks.local".to_string(),
            log_json: false,
        }
    }
}

impl ChecksConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ChecksConfig = toml::from_str(s)?;
        config.validated()
    }

    /// Build from the process environment.
    ///
    /// Reads:
    /// - CHECKS_CONFIG (optional, path of a TOML file)
    /// - CHECKS_MAX_COMMIT_ATTEMPTS (optional)
    /// - CHECKS_COMMITTER_NAME (optional)
    /// - CHECKS_COMMITTER_EMAIL (optional)
    /// - CHECKS_LOG_FORMAT (optional, `json` enables JSON logs)
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match var("CHECKS_CONFIG") {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|e| {
                    ChecksError::InvalidConfig(format!("cannot read {path}: {e}"))
                })?;
                toml::from_str(&text)?
            }
            None => ChecksConfig::default(),
        };

        if let Some(raw) = var("CHECKS_MAX_COMMIT_ATTEMPTS") {
            config.max_commit_attempts = raw.trim().parse().map_err(|_| {
                ChecksError::InvalidConfig(format!("CHECKS_MAX_COMMIT_ATTEMPTS: {raw:?}"))
            })?;
        }
        if let Some(name) = var("CHECKS_COMMITTER_NAME") {
            config.committer_name = name;
        }
        if let Some(email) = var("CHECKS_COMMITTER_EMAIL") {
            config.committer_email = email;
        }
        if let Some(format) = var("CHECKS_LOG_FORMAT") {
            config.log_json = format.eq_ignore_ascii_case("json");
        }
        config.validated()
    }

    fn validated(self) -> Result<Self> {
        if self.max_commit_attempts == 0 {
            return Err(ChecksError::InvalidConfig(
                "max_commit_attempts must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }

    /// Identity for server-written commits.
    pub fn committer(&self) -> PersonIdent {
        PersonIdent::new(&self.committer_name, &self.committer_email)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ChecksConfig::default();
        assert_eq!(config.max_commit_attempts, 3);
        assert!(!config.log_json);
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let config = ChecksConfig::from_toml_str("max_commit_attempts = 5\nlog_json = true\n").unwrap();
        assert_eq!(config.max_commit_attempts, 5);
        assert!(config.log_json);
        assert_eq!(config.committer_name, "Checks Server");
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = ChecksConfig::from_toml_str("max_commit_attempts = 0").unwrap_err();
        assert!(matches!(err, ChecksError::InvalidConfig(_)));
    }

    #[test]
    fn env_overrides() {
        let config = ChecksConfig::from_vars(vars(&[
            ("CHECKS_MAX_COMMIT_ATTEMPTS", "7"),
            ("CHECKS_COMMITTER_NAME", "Bot"),
            ("CHECKS_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.max_commit_attempts, 7);
        assert_eq!(config.committer().name, "Bot");
        assert!(config.log_json);
    }

    #[test]
    fn env_rejects_non_numeric_attempts() {
        let err = ChecksConfig::from_vars(vars(&[("CHECKS_MAX_COMMIT_ATTEMPTS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("CHECKS_MAX_COMMIT_ATTEMPTS"));
    }

    #[test]
    fn env_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checks.toml");
        std::fs::write(&path, "committer_email = \"ci@example.com\"\n").unwrap();

        let config =
            ChecksConfig::from_vars(vars(&[("CHECKS_CONFIG", path.to_str().unwrap())])).unwrap();
        assert_eq!(config.committer_email, "ci@example.com");
        assert_eq!(config.max_commit_attempts, 3);
    }
}
