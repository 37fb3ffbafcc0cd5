//! Ledger configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! request_ttl_ms = 3600000
//! max_cleartext_len = 65536
//! trusted_compute_stages = ["solver-a", "solver-b"]
//! oracle_public_key = "3b6a27bc..."
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{VerifyingKey, parse_verifying_key};

/// Default lifetime of a pending decryption request (one hour).
pub const DEFAULT_REQUEST_TTL_MS: u64 = 60 * 60 * 1000;

/// Default per-field cleartext limit (64 KiB).
pub const DEFAULT_MAX_CLEARTEXT_LEN: usize = 64 * 1024;

/// Configuration errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range or inconsistent.
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Lifetime of a pending request before its target becomes
    /// re-requestable. `0` disables expiry.
    #[serde(default = "default_request_ttl_ms")]
    pub request_ttl_ms: u64,

    /// Maximum length of one decrypted record field, in bytes.
    #[serde(default = "default_max_cleartext_len")]
    pub max_cleartext_len: usize,

    /// Actors allowed to submit analysis results for records they do not
    /// own.
    #[serde(default)]
    pub trusted_compute_stages: Vec<String>,

    /// Hex-encoded Ed25519 key the oracle must sign callbacks with. When
    /// set, the ledger refuses a library whose key differs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_public_key: Option<String>,
}

const fn default_request_ttl_ms() -> u64 {
    DEFAULT_REQUEST_TTL_MS
}

const fn default_max_cleartext_len() -> usize {
    DEFAULT_MAX_CLEARTEXT_LEN
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            request_ttl_ms: DEFAULT_REQUEST_TTL_MS,
            max_cleartext_len: DEFAULT_MAX_CLEARTEXT_LEN,
            trusted_compute_stages: Vec::new(),
            oracle_public_key: None,
        }
    }
}

impl LedgerConfig {
    /// Loads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks value ranges and the pinned oracle key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cleartext_len == 0 {
            return Err(ConfigError::Validation(
                "max_cleartext_len must be greater than zero".to_string(),
            ));
        }
        if let Some(stage) = self.trusted_compute_stages.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "trusted_compute_stages contains a blank entry: {stage:?}"
            )));
        }
        self.oracle_verifying_key()?;
        Ok(())
    }

    /// Request lifetime, or `None` when expiry is disabled.
    #[must_use]
    pub const fn request_ttl(&self) -> Option<u64> {
        if self.request_ttl_ms == 0 {
            None
        } else {
            Some(self.request_ttl_ms)
        }
    }

    /// Parses the pinned oracle key, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the key is not valid hex or not
    /// a valid Ed25519 point.
    pub fn oracle_verifying_key(&self) -> Result<Option<VerifyingKey>, ConfigError> {
        let Some(encoded) = &self.oracle_public_key else {
            return Ok(None);
        };
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| ConfigError::Validation(format!("oracle_public_key: {e}")))?;
        parse_verifying_key(&bytes)
            .map(Some)
            .map_err(|e| ConfigError::Validation(format!("oracle_public_key: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::crypto::Signer;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = LedgerConfig::from_toml("").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.request_ttl(), Some(DEFAULT_REQUEST_TTL_MS));
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = LedgerConfig::from_toml("request_ttl_ms = 0").unwrap();
        assert_eq!(config.request_ttl(), None);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result = LedgerConfig::from_toml("request_tll_ms = 5");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_cleartext_len_rejected() {
        let result = LedgerConfig::from_toml("max_cleartext_len = 0");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_blank_compute_stage_rejected() {
        let result = LedgerConfig::from_toml(r#"trusted_compute_stages = ["solver", " "]"#);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_oracle_key_parsing() {
        let signer = Signer::generate();
        let key_hex = hex::encode(signer.verifying_key().as_bytes());
        let config = LedgerConfig::from_toml(&format!("oracle_public_key = \"{key_hex}\"")).unwrap();
        assert_eq!(
            config.oracle_verifying_key().unwrap(),
            Some(signer.verifying_key())
        );

        let bad = LedgerConfig::from_toml("oracle_public_key = \"zz\"");
        assert!(matches!(bad, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_toml_roundtrip_and_file_load() {
        let config = LedgerConfig {
            request_ttl_ms: 5_000,
            max_cleartext_len: 128,
            trusted_compute_stages: vec!["solver-a".into()],
            oracle_public_key: None,
        };
        let rendered = config.to_toml().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(rendered.as_bytes()).unwrap();
        let loaded = LedgerConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = LedgerConfig::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
