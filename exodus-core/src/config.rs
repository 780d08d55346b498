//! YAML configuration and settings resolution.
//!
//! # Storage layout
//!
//! ```text
//! ~/.exodus/
//!   config.yaml
//! ```
//!
//! # API pattern
//!
//! Loading has two forms, like every home-rooted lookup in this workspace:
//! - `load_at(home)`: explicit home; used in tests with `TempDir`
//! - `load()`: derives home from `dirs::home_dir()`, delegates to `load_at`
//!
//! The resolved [`Settings`] value is what the orchestration layer consumes;
//! nothing downstream reads the environment or the filesystem for config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EnvName;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_FETCH_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_ENV: &str = "live";

// ---------------------------------------------------------------------------
// On-disk shape
// ---------------------------------------------------------------------------

/// Per-environment gateway and credential settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gw_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<PathBuf>,
}

/// Root of `~/.exodus/config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub environments: BTreeMap<String, EnvConfig>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub env: Option<String>,
    pub gw_url: Option<String>,
    pub upload_url: Option<String>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub ca_bundle: Option<PathBuf>,
    pub poll_interval_secs: Option<u64>,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub env: EnvName,
    pub gw_url: String,
    pub upload_url: String,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub ca_bundle: Option<PathBuf>,
    pub poll_interval: Duration,
    pub fetch_retries: u32,
    pub timeout: Duration,
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<home>/.exodus/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".exodus").join("config.yaml")
}

/// Load the config file under `home`.
///
/// Returns `Config::default()` if the file does not exist and
/// `CoreError::Parse` (with path + line context) if it is malformed.
pub fn load_at(home: &Path) -> Result<Config, CoreError> {
    let path = config_path_at(home);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file; using defaults");
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| crate::error::io_err(&path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, CoreError> {
    load_at(&home()?)
}

fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Resolve
// ---------------------------------------------------------------------------

impl Config {
    /// Merge the file with command-line overrides.
    ///
    /// Precedence is flag > environment entry > built-in default. When no
    /// credentials are given anywhere, `<home>/certs/<user>.crt` and
    /// `<home>/certs/<user>.key` are used if both exist.
    pub fn resolve(
        &self,
        overrides: &Overrides,
        home: &Path,
        user: Option<&str>,
    ) -> Result<Settings, CoreError> {
        let env = overrides
            .env
            .clone()
            .or_else(|| self.default_env.clone())
            .unwrap_or_else(|| DEFAULT_ENV.to_string());
        let entry = self.environments.get(&env).cloned().unwrap_or_default();

        let gw_url = overrides
            .gw_url
            .clone()
            .or(entry.gw_url)
            .ok_or_else(|| CoreError::MissingSetting {
                env: env.clone(),
                setting: "gateway URL",
            })?;
        let gw_url = gw_url.trim_end_matches('/').to_string();
        let upload_url = overrides
            .upload_url
            .clone()
            .or(entry.upload_url)
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("{gw_url}/upload"));

        let mut cert = overrides.cert.clone().or(entry.cert);
        let mut key = overrides.key.clone().or(entry.key);
        if cert.is_none() && key.is_none() {
            if let Some((c, k)) = user.and_then(|u| default_credentials(home, u)) {
                tracing::debug!(cert = %c.display(), "using default credentials");
                cert = Some(c);
                key = Some(k);
            }
        }
        if cert.is_some() != key.is_some() {
            return Err(CoreError::IncompleteCredentials { env });
        }

        let poll_interval_secs = overrides
            .poll_interval_secs
            .or(self.poll_interval_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        Ok(Settings {
            env: EnvName::from(env),
            gw_url,
            upload_url,
            cert,
            key,
            ca_bundle: overrides.ca_bundle.clone().or(entry.ca_bundle),
            poll_interval: Duration::from_secs(poll_interval_secs),
            fetch_retries: self.fetch_retries.unwrap_or(DEFAULT_FETCH_RETRIES),
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }
}

fn default_credentials(home: &Path, user: &str) -> Option<(PathBuf, PathBuf)> {
    let dir = home.join("certs");
    let cert = dir.join(format!("{user}.crt"));
    let key = dir.join(format!("{user}.key"));
    (cert.is_file() && key.is_file()).then_some((cert, key))
}
