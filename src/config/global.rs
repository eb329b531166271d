//! Global configuration management for Rally Tools.
//!
//! This module handles the global user configuration file (`~/.rally/config.toml`),
//! which stores one API section per Rally environment (base URL and bearer key) plus a
//! few user-wide settings. API keys live only in this file; they are never written to
//! the repository directory entities are synced into.
//!
//! # Configuration File Location
//!
//! - Default: `~/.rally/config.toml`
//! - Override: the `--config` flag, or the `RALLY_CONFIG` environment variable
//!
//! # File Format
//!
//! ```toml
//! repodir = "/home/me/rally-repo"
//! default_env = "DEV"
//! request_timeout_secs = 60
//! max_parallel = 10
//!
//! [api.DEV]
//! url = "https://discovery-dev.sdvi.com/api/v2"
//! key = "..."
//!
//! [api.UAT]
//! url = "https://discovery-uat.sdvi.com/api/v2"
//! key = "..."
//! restrict_uat = true
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use rally_cli::config::GlobalConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GlobalConfig::load().await?;
//! if let Some(api) = config.api("DEV") {
//!     println!("DEV is served from {}", api.url);
//! }
//! # Ok(())
//! # }
//! ```

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, CONFIG_PATH_ENV, DEFAULT_REQUEST_TIMEOUT_SECS,
    MIN_PARALLELISM,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_max_parallel() -> usize {
    MIN_PARALLELISM
}

fn is_default_request_timeout(secs: &u64) -> bool {
    *secs == DEFAULT_REQUEST_TIMEOUT_SECS
}

fn is_default_max_parallel(n: &usize) -> bool {
    *n == MIN_PARALLELISM
}

/// API credentials for one Rally environment.
///
/// `url` is the API root (e.g. `https://discovery-dev.sdvi.com/api/v2`); every
/// request path is appended to it. `key` is sent as a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the Rally v2 API for this environment
    pub url: String,

    /// API key sent as `Authorization: Bearer <key>`
    pub key: String,

    /// Guard mutating requests against this environment when it is `UAT`.
    ///
    /// `PROD` is always guarded regardless of this flag.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub restrict_uat: bool,
}

/// Global configuration structure for Rally Tools.
///
/// # Security Considerations
///
/// - Contains API keys: **never commit** this file
/// - Saved with `0600` permissions on Unix systems
///
/// # Examples
///
/// ```rust,no_run
/// use rally_cli::config::{ApiConfig, GlobalConfig};
///
/// let mut config = GlobalConfig::default();
/// config.add_api(
///     "DEV".to_string(),
///     ApiConfig {
///         url: "https://discovery-dev.sdvi.com/api/v2".to_string(),
///         key: "secret".to_string(),
///         restrict_uat: false,
///     },
/// );
/// assert!(config.has_api("DEV"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// API configuration per environment name (`DEV`, `UAT`, `PROD`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub api: BTreeMap<String, ApiConfig>,

    /// Directory synced entities are written to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repodir: Option<PathBuf>,

    /// Environment used when a command is run without `--env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_env: Option<String>,

    /// Timeout applied to each API request, in seconds.
    #[serde(
        default = "default_request_timeout_secs",
        skip_serializing_if = "is_default_request_timeout"
    )]
    pub request_timeout_secs: u64,

    /// Maximum number of concurrent preset code downloads.
    #[serde(default = "default_max_parallel", skip_serializing_if = "is_default_max_parallel")]
    pub max_parallel: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            api: BTreeMap::new(),
            repodir: None,
            default_env: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_parallel: MIN_PARALLELISM,
        }
    }
}

impl GlobalConfig {
    /// Load global configuration from the default location.
    ///
    /// If the file doesn't exist, returns a default (empty) configuration in which
    /// every environment is unconfigured.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load global configuration from an optional path.
    ///
    /// Resolution order: the explicit `path`, then `RALLY_CONFIG`, then
    /// `~/.rally/config.toml`. A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = Self::resolve_path(path)?;

        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No global config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load global configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    /// Save global configuration to a specific file path.
    ///
    /// Creates parent directories as needed, writes pretty TOML and restricts the
    /// file to owner read/write on Unix.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// The file the configuration is read from and written to: the explicit `path`,
    /// then `RALLY_CONFIG`, then the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the default path is needed and the home directory cannot
    /// be determined.
    pub fn resolve_path(path: Option<PathBuf>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(path),
            None => match std::env::var_os(CONFIG_PATH_ENV) {
                Some(env_path) => Ok(PathBuf::from(env_path)),
                None => Self::default_path(),
            },
        }
    }

    /// Default file path for the global configuration: `~/.rally/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
        Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// API configuration of an environment, if any.
    #[must_use]
    pub fn api(&self, env: &str) -> Option<&ApiConfig> {
        self.api.get(env)
    }

    /// Add or replace the API configuration of an environment.
    pub fn add_api(&mut self, env: String, api: ApiConfig) {
        self.api.insert(env, api);
    }

    /// Whether an environment has API configuration.
    #[must_use]
    pub fn has_api(&self, env: &str) -> bool {
        self.api.contains_key(env)
    }

    /// Names of all configured environments, sorted.
    pub fn environments(&self) -> impl Iterator<Item = &str> {
        self.api.keys().map(String::as_str)
    }

    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the environment to act on: the explicit one, else `default_env`.
    #[must_use]
    pub fn resolve_env(&self, explicit: Option<String>) -> Option<String> {
        explicit.or_else(|| self.default_env.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_file_gives_default() {
        let temp = TempDir::new().unwrap();
        let config =
            GlobalConfig::load_with_optional(Some(temp.path().join("missing.toml"))).await.unwrap();

        assert!(config.api.is_empty());
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.max_parallel, MIN_PARALLELISM);
    }

    #[tokio::test]
    async fn test_parse_full_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(
            &path,
            r#"
repodir = "/tmp/repo"
default_env = "DEV"
request_timeout_secs = 5

[api.DEV]
url = "https://dev.example.com/api/v2"
key = "dev-key"

[api.UAT]
url = "https://uat.example.com/api/v2"
key = "uat-key"
restrict_uat = true
"#,
        )
        .await
        .unwrap();

        let config = GlobalConfig::load_from(&path).await.unwrap();
        assert_eq!(config.repodir, Some(PathBuf::from("/tmp/repo")));
        assert_eq!(config.resolve_env(None), Some("DEV".to_string()));
        assert_eq!(config.resolve_env(Some("UAT".into())), Some("UAT".to_string()));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(!config.api("DEV").unwrap().restrict_uat);
        assert!(config.api("UAT").unwrap().restrict_uat);
        assert_eq!(config.environments().collect::<Vec<_>>(), vec!["DEV", "UAT"]);
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = GlobalConfig::default();
        config.add_api(
            "DEV".to_string(),
            ApiConfig {
                url: "https://dev.example.com".to_string(),
                key: "k".to_string(),
                restrict_uat: false,
            },
        );
        config.save_to(&path).await.unwrap();

        let loaded = GlobalConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded.api("DEV"), config.api("DEV"));
        assert!(!loaded.has_api("PROD"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_config_file_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        GlobalConfig::default().save_to(&path).await.unwrap();

        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "Config file should have 600 permissions");
    }

    #[tokio::test]
    async fn test_invalid_toml_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "[api.DEV\nurl = ").await.unwrap();

        let err = GlobalConfig::load_from(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse global config"));
    }
}
