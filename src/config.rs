//! Application-level configuration loading: name matching policy, statistics
//! policy, request limits and storage backend selection.

use std::{env, fs, io::ErrorKind, path::PathBuf, str::FromStr};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GAME_VOTE_BACK_CONFIG_PATH";
/// Environment variable selecting the storage backend.
const STORAGE_BACKEND_ENV: &str = "STORAGE_BACKEND";
/// Largest list accepted by a full vote replacement unless configured otherwise.
const DEFAULT_REPLACE_LIMIT: usize = 200;

/// How two normalized keys are compared when resolving a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameMatching {
    /// Keys must be identical.
    #[default]
    Exact,
    /// Keys match when one is a prefix of the other. Not transitive.
    Prefix,
}

/// Which games the statistics view reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StatisticsPolicy {
    /// Report games nobody currently votes for.
    pub include_zero_votes: bool,
}

impl Default for StatisticsPolicy {
    fn default() -> Self {
        Self {
            include_zero_votes: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Key comparison used when resolving typed names.
    pub name_matching: NameMatching,
    /// Statistics view policy.
    pub statistics: StatisticsPolicy,
    /// Largest list accepted by a full selection replacement.
    pub replace_limit: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        name_matching = ?app_config.name_matching,
                        include_zero_votes = app_config.statistics.include_zero_votes,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name_matching: NameMatching::default(),
            statistics: StatisticsPolicy::default(),
            replace_limit: DEFAULT_REPLACE_LIMIT,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    name_matching: NameMatching,
    #[serde(default)]
    statistics: StatisticsPolicy,
    #[serde(default)]
    replace_limit: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            name_matching: value.name_matching,
            statistics: value.statistics,
            replace_limit: value
                .replace_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(DEFAULT_REPLACE_LIMIT),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Storage backend the binary connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Process-local maps; state is lost on restart.
    Memory,
    /// MongoDB, configured through `MONGO_URI` and `MONGO_DB`.
    #[default]
    Mongo,
    /// CouchDB, configured through the `COUCH_*` variables.
    Couch,
}

impl StorageBackend {
    /// Read [`STORAGE_BACKEND_ENV`], defaulting to MongoDB.
    pub fn from_env() -> Self {
        match env::var(STORAGE_BACKEND_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                warn!(value = %value, "unknown storage backend; using MongoDB");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "couch" | "couchdb" => Ok(Self::Couch),
            other => Err(format!("unknown storage backend `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        assert_eq!(AppConfig::from_json("{}").unwrap(), AppConfig::default());
    }

    #[test]
    fn full_document_is_applied() {
        let config = AppConfig::from_json(
            r#"{
                "name_matching": "prefix",
                "statistics": { "include_zero_votes": false },
                "replace_limit": 25
            }"#,
        )
        .unwrap();

        assert_eq!(config.name_matching, NameMatching::Prefix);
        assert!(!config.statistics.include_zero_votes);
        assert_eq!(config.replace_limit, 25);
    }

    #[test]
    fn zero_replace_limit_falls_back_to_default() {
        let config = AppConfig::from_json(r#"{ "replace_limit": 0 }"#).unwrap();
        assert_eq!(config.replace_limit, DEFAULT_REPLACE_LIMIT);
    }

    #[test]
    fn unknown_matching_mode_is_rejected() {
        assert!(AppConfig::from_json(r#"{ "name_matching": "fuzzy" }"#).is_err());
    }

    #[test]
    fn storage_backend_parses_aliases() {
        assert_eq!("MongoDB".parse::<StorageBackend>(), Ok(StorageBackend::Mongo));
        assert_eq!(" couch ".parse::<StorageBackend>(), Ok(StorageBackend::Couch));
        assert_eq!("memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert!("redis".parse::<StorageBackend>().is_err());
    }
}
