//! Registry identity metadata

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NAME_VAR: &str = "REGISTRY_NAME";
pub const VERIFICATION_URL_VAR: &str = "REGISTRY_VERIFICATION_URL";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required env var: {0}")]
    Missing(&'static str),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Organization name and verification URL, exposed verbatim to callers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub name: String,
    pub verification_url: String,
}

impl RegistryConfig {
    pub fn new(name: impl Into<String>, verification_url: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            name: name.into(),
            verification_url: verification_url.into(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = lookup(NAME_VAR).ok_or(ConfigError::Missing(NAME_VAR))?;
        let url = lookup(VERIFICATION_URL_VAR).ok_or(ConfigError::Missing(VERIFICATION_URL_VAR))?;
        Self::new(name, url)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "name",
                reason: "must not be blank".into(),
            });
        }
        if !self.verification_url.starts_with("http://") && !self.verification_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "verification_url",
                reason: "must start with http:// or https://".into(),
            });
        }
        Ok(())
    }
}
