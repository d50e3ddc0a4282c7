//! Ballot pipeline configuration
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then `BALLOT_*` environment variables. [`BallotConfig::validate`] runs last.

use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "BALLOT_";

/// One-time passcode policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    /// Digits per code
    pub code_length: usize,
    /// Seconds a code stays valid after issue
    pub ttl_secs: u64,
    /// Mismatches tolerated before lockout
    pub max_attempts: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            ttl_secs: 5 * 60,
            max_attempts: 3,
        }
    }
}

/// Authorization window after a successful OTP check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds a grant stays valid
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_secs: 15 * 60 }
    }
}

/// Receipt ledger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Hex-encoded MAC key file, relative to `storage.data_dir` unless absolute
    pub key_file: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            key_file: PathBuf::from("ledger.key"),
        }
    }
}

/// Storage location for the filesystem handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one file per key
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./ballot-data"),
        }
    }
}

/// Log filter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing-subscriber` env-filter directive
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallotConfig {
    /// `[otp]`
    pub otp: OtpConfig,
    /// `[session]`
    pub session: SessionConfig,
    /// `[ledger]`
    pub ledger: LedgerConfig,
    /// `[storage]`
    pub storage: StorageConfig,
    /// `[logging]`
    pub logging: LoggingConfig,
}

impl BallotConfig {
    /// Parse a TOML document; missing sections take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ValidationError> {
        toml::from_str(content).map_err(|e| invalid("file", e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| invalid("file", format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Apply `BALLOT_*` overrides from the process environment.
    pub fn merge_with_env(&mut self) -> Result<(), ValidationError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply overrides from an explicit variable list.
    ///
    /// Unknown `BALLOT_*` names are ignored.
    pub fn merge_with_vars<I>(&mut self, vars: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                "OTP_CODE_LENGTH" => self.otp.code_length = parse_number(&name, &value)?,
                "OTP_TTL_SECS" => self.otp.ttl_secs = parse_number(&name, &value)?,
                "OTP_MAX_ATTEMPTS" => self.otp.max_attempts = parse_number(&name, &value)?,
                "SESSION_TTL_SECS" => self.session.ttl_secs = parse_number(&name, &value)?,
                "DATA_DIR" => self.storage.data_dir = PathBuf::from(value),
                "LEDGER_KEY_FILE" => self.ledger.key_file = PathBuf::from(value),
                "LOG" => self.logging.filter = value,
                _ => {}
            }
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(4..=10).contains(&self.otp.code_length) {
            return Err(invalid("otp.code_length", "must be between 4 and 10"));
        }
        if self.otp.ttl_secs == 0 {
            return Err(invalid("otp.ttl_secs", "must be positive"));
        }
        if self.otp.max_attempts == 0 {
            return Err(invalid("otp.max_attempts", "must be at least 1"));
        }
        if self.session.ttl_secs == 0 {
            return Err(invalid("session.ttl_secs", "must be positive"));
        }
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(invalid("storage.data_dir", "must not be empty"));
        }
        Ok(())
    }

    /// Ledger key path, resolved against the data directory.
    pub fn ledger_key_path(&self) -> PathBuf {
        if self.ledger.key_file.is_absolute() {
            self.ledger.key_file.clone()
        } else {
            self.storage.data_dir.join(&self.ledger.key_file)
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidConfig {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ValidationError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_policy() {
        let config = BallotConfig::default();
        assert_eq!(config.otp.code_length, 6);
        assert_eq!(config.otp.ttl_secs, 300);
        assert_eq!(config.otp.max_attempts, 3);
        assert_eq!(config.session.ttl_secs, 900);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = BallotConfig::from_toml_str("[otp]\nttl_secs = 60\n").unwrap();
        assert_eq!(config.otp.ttl_secs, 60);
        assert_eq!(config.otp.code_length, 6);
        assert_eq!(config.session.ttl_secs, 900);
    }

    #[test]
    fn load_from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nttl_secs = 120\n[storage]\ndata_dir = \"/var/ballot\"").unwrap();
        let config = BallotConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.session.ttl_secs, 120);
        assert_eq!(config.ledger_key_path(), PathBuf::from("/var/ballot/ledger.key"));
    }

    #[test]
    fn env_overrides_apply_and_reject_garbage() {
        let mut config = BallotConfig::default();
        config
            .merge_with_vars(vec![
                ("BALLOT_OTP_MAX_ATTEMPTS".to_string(), "5".to_string()),
                ("BALLOT_LOG".to_string(), "debug".to_string()),
                ("HOME".to_string(), "/root".to_string()),
            ])
            .unwrap();
        assert_eq!(config.otp.max_attempts, 5);
        assert_eq!(config.logging.filter, "debug");

        let err = config
            .merge_with_vars(vec![("BALLOT_OTP_TTL_SECS".to_string(), "soon".to_string())])
            .unwrap_err();
        assert_matches!(err, ValidationError::InvalidConfig { .. });
    }

    #[test]
    fn validation_rejects_unusable_policy() {
        let mut config = BallotConfig::default();
        config.otp.code_length = 2;
        assert!(config.validate().is_err());

        let mut config = BallotConfig::default();
        config.otp.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
