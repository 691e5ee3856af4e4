// bookstore-core/src/config.rs
// Connection target: defaults < TOML file < environment < command line

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{BookstoreError, Result};

pub const ENV_CONFIG: &str = "BOOKSTORE_CONFIG";
pub const ENV_URI: &str = "BOOKSTORE_URI";
pub const ENV_DATABASE: &str = "BOOKSTORE_DATABASE";
pub const ENV_COLLECTION: &str = "BOOKSTORE_COLLECTION";

/// Where the catalog runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Connection string identifying the database instance
    pub uri: String,
    /// Logical database name
    pub database: String,
    pub collection: String,
    /// Documents per page in the pagination entries
    pub page_size: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "plp_bookstore".to_string(),
            collection: "books".to_string(),
            page_size: 5,
        }
    }
}

/// Values that override whatever the file and environment provide
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub uri: Option<String>,
    pub database: Option<String>,
    pub collection: Option<String>,
    pub page_size: Option<u64>,
}

impl RunnerConfig {
    /// Parse a TOML file; keys left out keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BookstoreError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Resolve the full configuration
    ///
    /// `explicit_path` (or `BOOKSTORE_CONFIG`) must exist when given; without
    /// either, `bookstore.toml` in the working directory is used if present.
    pub fn load(explicit_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let env_path = std::env::var(ENV_CONFIG).ok();
        let mut config = match explicit_path.or(env_path.as_deref().map(Path::new)) {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new("bookstore.toml");
                if fallback.exists() {
                    Self::from_file(fallback)?
                } else {
                    tracing::debug!("no config file, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply `BOOKSTORE_*` variables through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup(ENV_URI) {
            self.uri = uri;
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            self.database = database;
        }
        if let Some(collection) = lookup(ENV_COLLECTION) {
            self.collection = collection;
        }
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(uri) = overrides.uri {
            self.uri = uri;
        }
        if let Some(database) = overrides.database {
            self.database = database;
        }
        if let Some(collection) = overrides.collection {
            self.collection = collection;
        }
        if let Some(page_size) = overrides.page_size {
            self.page_size = page_size;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("uri", &self.uri),
            ("database", &self.database),
            ("collection", &self.collection),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(BookstoreError::Config(format!("{} must not be empty", name)));
            }
        }
        if self.page_size == 0 {
            return Err(BookstoreError::Config(
                "page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
