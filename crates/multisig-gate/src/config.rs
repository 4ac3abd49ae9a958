use std::path::Path;

use multisig_types::{PayloadLimits, Pubkey};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Seed hashed into the default program id.
const DEFAULT_PROGRAM_SEED: &[u8] = b"multisig-gate-program-v1";

/// Configuration for the multisig engine.
///
/// Loadable from TOML; every field is optional and falls back to its default:
///
/// ```toml
/// program_id = "…64 hex chars…"
/// max_owners = 5
/// max_actions = 5
/// max_accounts_per_action = 15
/// max_data_len = 1232
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Namespace every address is derived under (default: blake3 of a fixed seed)
    pub program_id: Pubkey,
    /// Maximum owners per multisig (default: 5)
    pub max_owners: usize,
    /// Maximum actions per proposed transaction (default: 5)
    pub max_actions: usize,
    /// Maximum account references per action (default: 15)
    pub max_accounts_per_action: usize,
    /// Maximum data bytes per action (default: 1232)
    pub max_data_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let limits = PayloadLimits::default();
        Self {
            program_id: Pubkey::new(*blake3::hash(DEFAULT_PROGRAM_SEED).as_bytes()),
            max_owners: 5,
            max_actions: limits.max_actions,
            max_accounts_per_action: limits.max_accounts_per_action,
            max_data_len: limits.max_data_len,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, or the defaults if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml_str(&contents)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject limits that would make every request fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("max_owners", self.max_owners),
            ("max_actions", self.max_actions),
            ("max_accounts_per_action", self.max_accounts_per_action),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }

    pub fn payload_limits(&self) -> PayloadLimits {
        PayloadLimits {
            max_actions: self.max_actions,
            max_accounts_per_action: self.max_accounts_per_action,
            max_data_len: self.max_data_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_payload_limits() {
        let config = EngineConfig::default();
        assert_eq!(config.max_owners, 5);
        assert_eq!(config.max_actions, 5);
        assert_eq!(config.max_accounts_per_action, 15);
        assert_eq!(config.max_data_len, 1232);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("max_owners = 11").unwrap();
        assert_eq!(config.max_owners, 11);
        assert_eq!(config.max_actions, 5);
        assert_eq!(config.program_id, EngineConfig::default().program_id);
    }

    #[test]
    fn program_id_parses_from_hex() {
        let program = Pubkey::new([0xab; 32]);
        let doc = format!("program_id = \"{program}\"");
        let config = EngineConfig::from_toml_str(&doc).unwrap();
        assert_eq!(config.program_id, program);
    }

    #[test]
    fn zero_limit_rejected() {
        let err = EngineConfig::from_toml_str("max_actions = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("max_actions")));
    }

    #[test]
    fn malformed_program_id_rejected() {
        let err = EngineConfig::from_toml_str("program_id = \"xyz\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let config = EngineConfig::load("/nonexistent/path/multisig.toml").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_owners = 7\nmax_data_len = 64").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.max_owners, 7);
        assert_eq!(config.payload_limits().max_data_len, 64);
    }
}
