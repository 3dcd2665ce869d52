//! Lab configuration: defaults, then `tether.toml`, then environment.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LabError, LabResult};
use crate::scenarios::Scenario;

/// Default config file name (read from the working directory).
pub const CONFIG_FILE_NAME: &str = "tether.toml";

/// Database used when nothing else is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://helloapp.db";

/// Lab configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Scenarios to run, in order.
    pub scenarios: Vec<Scenario>,

    /// Drop and recreate the tables before running.
    pub recreate: bool,

    /// Insert the sample rows after recreating.
    pub seed: bool,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            scenarios: Scenario::ALL.to_vec(),
            recreate: true,
            seed: true,
        }
    }
}

impl LabConfig {
    /// Load `tether.toml` from the working directory if present, then apply
    /// `DATABASE_URL` and `TETHER_SCENARIOS`.
    pub fn load() -> LabResult<Self> {
        let path = Path::new(CONFIG_FILE_NAME);
        let config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> LabResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML. Missing keys take their defaults.
    pub fn from_toml(content: &str) -> LabResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> LabResult<Self> {
        if let Some(url) = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            self.database_url = url;
        }

        if let Some(list) = lookup("TETHER_SCENARIOS") {
            self.scenarios = list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::parse)
                .collect::<Result<_, _>>()?;
        }

        if self.scenarios.is_empty() {
            return Err(LabError::Config("no scenarios selected".to_string()));
        }
        Ok(self)
    }
}
