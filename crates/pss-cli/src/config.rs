//! Loader configuration.
//!
//! Read from `--config`, else `<config dir>/pss-loader/config.toml`, else
//! built-in defaults. Every section and key is optional.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use pss_core::{LoginScheme, PssError, TransformContext};
use pss_io::FirestoreConfig;
use pss_sync::{Collections, RetryPolicy};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PssConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub collections: CollectionsConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Document store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries of timed-out or unavailable calls
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            database: default_database(),
            base_url: default_base_url(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_base_url() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionsConfig {
    #[serde(default = "default_stations")]
    pub stations: String,
    #[serde(default = "default_people")]
    pub people: String,
    #[serde(default = "default_submissions")]
    pub submissions: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            stations: default_stations(),
            people: default_people(),
            submissions: default_submissions(),
        }
    }
}

fn default_stations() -> String {
    "stations".to_string()
}

fn default_people() -> String {
    "people".to_string()
}

fn default_submissions() -> String {
    "submissions".to_string()
}

/// Record derivation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// First generated login identifier
    #[serde(default = "default_login_base")]
    pub login_base: u64,
    /// Login identifiers reserved per station row
    #[serde(default = "default_login_stride")]
    pub login_stride: u64,
    /// PTR count used when a station gives none
    #[serde(default = "default_ptr_count")]
    pub default_ptr_count: u32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            login_base: default_login_base(),
            login_stride: default_login_stride(),
            default_ptr_count: default_ptr_count(),
        }
    }
}

fn default_login_base() -> u64 {
    9_100_000_000
}

fn default_login_stride() -> u64 {
    100
}

fn default_ptr_count() -> u32 {
    pss_core::DEFAULT_PTR_COUNT
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default location: `<config dir>/pss-loader/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pss-loader").join("config.toml"))
}

/// Load the configuration. An explicit path must exist; the default path is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<PssConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(PssError::Config(format!(
                    "config file '{}' does not exist",
                    path.display()
                ))
                .into());
            }
            path.to_path_buf()
        }
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => path,
            None => return Ok(PssConfig::default()),
        },
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config '{}'", path.display()))?;
    let config: PssConfig = toml::from_str(&contents)
        .map_err(|e| PssError::Config(format!("'{}': {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

impl PssConfig {
    pub fn validate(&self) -> Result<(), PssError> {
        if self.store.timeout_secs == 0 {
            return Err(PssError::Config("store.timeout_secs must be at least 1".into()));
        }
        if self.import.login_stride == 0 {
            return Err(PssError::Config("import.login_stride must be at least 1".into()));
        }
        if self.import.default_ptr_count == 0 {
            return Err(PssError::Config(
                "import.default_ptr_count must be at least 1".into(),
            ));
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<tracing::Level, PssError> {
        self.logging.level.parse().map_err(|_| {
            PssError::Config(format!("unknown logging.level '{}'", self.logging.level))
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.store.max_retries,
            backoff: Duration::from_millis(self.store.retry_backoff_ms),
        }
    }

    pub fn collections(&self) -> Collections {
        Collections {
            stations: self.collections.stations.clone(),
            people: self.collections.people.clone(),
            submissions: self.collections.submissions.clone(),
        }
    }

    pub fn transform_context(&self) -> TransformContext {
        TransformContext {
            login: LoginScheme::new(self.import.login_base, self.import.login_stride),
            default_ptr_count: self.import.default_ptr_count,
        }
    }

    pub fn firestore(&self, project_id: &str) -> FirestoreConfig {
        FirestoreConfig {
            project_id: project_id.to_string(),
            database: self.store.database.clone(),
            base_url: self.store.base_url.clone(),
            timeout: Duration::from_secs(self.store.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_means_defaults() {
        let config: PssConfig = toml::from_str("").unwrap();
        assert_eq!(config.store.timeout_secs, 30);
        assert_eq!(config.store.max_retries, 3);
        assert_eq!(config.collections.people, "people");
        assert_eq!(config.import.login_base, 9_100_000_000);
        assert_eq!(config.log_level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: PssConfig = toml::from_str(
            r#"
            [store]
            timeout_secs = 5

            [collections]
            stations = "pss_stations"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.timeout_secs, 5);
        assert_eq!(config.store.retry_backoff_ms, 500);
        assert_eq!(config.collections().stations, "pss_stations");
        assert_eq!(config.collections().submissions, "submissions");
        assert_eq!(config.firestore("p").timeout, Duration::from_secs(5));
        assert_eq!(config.log_level().unwrap(), tracing::Level::DEBUG);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[import]\nlogin_stride = 0\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
        std::fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
