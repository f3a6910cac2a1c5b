//! Engine configuration - environment variable parsing

use std::env;

use serde::{Deserialize, Serialize};

/// Per-game rule switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Advance automatically once every required actor has submitted
    pub auto_advance: bool,
    /// Witch may use the antidote on herself
    pub witch_self_save: bool,
    /// A poisoned hunter still gets to shoot
    pub hunter_shoots_when_poisoned: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_advance: true,
            witch_self_save: false,
            hunter_shoots_when_poisoned: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            auto_advance: bool_var("WEREWOLF_AUTO_ADVANCE", defaults.auto_advance)?,
            witch_self_save: bool_var("WEREWOLF_WITCH_SELF_SAVE", defaults.witch_self_save)?,
            hunter_shoots_when_poisoned: bool_var(
                "WEREWOLF_HUNTER_SHOOTS_WHEN_POISONED",
                defaults.hunter_shoots_when_poisoned,
            )?,
        })
    }
}

fn bool_var(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(value) => parse_bool(&value).ok_or(ConfigError::InvalidBool { key, value }),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(key)),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid boolean for {key}: {value:?}")]
    InvalidBool { key: &'static str, value: String },

    #[error("Environment variable {0} is not valid unicode")]
    NotUnicode(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.auto_advance);
        assert!(!config.witch_self_save);
        assert!(!config.hunter_shoots_when_poisoned);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"witch_self_save": true}"#).unwrap();
        assert!(config.witch_self_save);
        assert!(config.auto_advance);
    }
}
