use std::{fs, path::Path};

use serde::Deserialize;

use crate::{matcher::DEFAULT_PLACEHOLDER, separate::NameCleanup};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name for target groups the matcher could not pair
    pub placeholder: String,
    /// Removed from material names when separating by material
    pub strip_tokens: Vec<String>,
    /// Default upper bound for `fill`
    pub largest_group: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_owned(),
            strip_tokens: NameCleanup::default().strip_tokens,
            largest_group: 0,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&fs::read_to_string(path)?)?)
    }

    /// Load `path` when given, otherwise the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn name_cleanup(&self) -> NameCleanup {
        NameCleanup {
            strip_tokens: self.strip_tokens.clone(),
        }
    }
}
