//! Deployment configuration, read from TOML.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::auth::Delegated;
use crate::automation::DEFAULT_UPDATE_INTERVAL_SECS;
use crate::badge::DuplicateFlightPolicy;
use crate::ledger::AccountId;

/// First account of a local development chain; used when no administrator is configured.
pub const DEFAULT_ADMINISTRATOR: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("administrator account must not be empty")]
    EmptyAdministrator,
    #[error("reward_points must be greater than zero")]
    ZeroReward,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub administrator: AccountId,
    pub update_interval_secs: u64,
    pub reward_points: u64,
    pub duplicate_flights: DuplicateFlightPolicy,
    pub output_dir: PathBuf,
    pub issuers: Vec<AccountId>,
    pub keepers: Vec<AccountId>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            administrator: DEFAULT_ADMINISTRATOR.to_string(),
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            reward_points: 1_000,
            duplicate_flights: DuplicateFlightPolicy::Reject,
            output_dir: PathBuf::from("output"),
            issuers: Vec::new(),
            keepers: Vec::new(),
        }
    }
}

impl Config {
    /// Reads `path` if given; otherwise all defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::parse(&text).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.administrator.trim().is_empty() {
            return Err(ConfigError::EmptyAdministrator);
        }
        if self.reward_points == 0 {
            return Err(ConfigError::ZeroReward);
        }
        Ok(())
    }

    pub fn roles(&self) -> Delegated {
        Delegated {
            administrator: self.administrator.clone(),
            issuers: self.issuers.iter().cloned().collect(),
            keepers: self.keepers.iter().cloned().collect(),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.output_dir.join(crate::deploy::STATE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.update_interval_secs, 3_600);
    }

    #[test]
    fn fields_override_defaults() {
        let config = Config::parse(
            r#"
administrator = "0xadmin"
update_interval_secs = 60
duplicate_flights = "ignore"
issuers = ["0xairline"]
"#,
        )
        .unwrap();
        assert_eq!(config.administrator, "0xadmin");
        assert_eq!(config.update_interval_secs, 60);
        assert_eq!(config.duplicate_flights, DuplicateFlightPolicy::Ignore);
        assert!(config.roles().issuers.contains("0xairline"));
        assert_eq!(config.reward_points, 1_000);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::parse("gas_price = 5").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn zero_reward_fails_validation() {
        let config = Config {
            reward_points: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroReward)));
    }
}
