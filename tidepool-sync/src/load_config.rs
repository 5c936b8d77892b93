/// `load_config` module: Loads a static YAML config and injects secrets from the environment.
///
/// The YAML file holds everything that is safe to commit: the sync window, the
/// target-glucose low bound and the two service URLs. Credentials are never
/// read from the file; they come from the environment (a `.env` file is loaded
/// by `main`):
///
/// - `TIDEPOOL_USERNAME`, `TIDEPOOL_PASSWORD`
/// - `NIGHTSCOUT_API_SECRET`
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tidepool_sync_core::config::SyncConfig;
use tidepool_sync_core::tidepool_client::DEFAULT_BASE_URL;
use tracing::{error, info};

pub const TIDEPOOL_USERNAME_ENV: &str = "TIDEPOOL_USERNAME";
pub const TIDEPOOL_PASSWORD_ENV: &str = "TIDEPOOL_PASSWORD";
pub const NIGHTSCOUT_API_SECRET_ENV: &str = "NIGHTSCOUT_API_SECRET";

#[derive(Debug)]
pub struct CliConfig {
    pub sync: SyncConfig,
    pub tidepool: TidepoolSection,
    pub nightscout: NightscoutSection,
}

pub struct TidepoolSection {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for TidepoolSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TidepoolSection")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub struct NightscoutSection {
    pub base_url: String,
    pub api_secret: String,
}

impl fmt::Debug for NightscoutSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NightscoutSection")
            .field("base_url", &self.base_url)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

fn default_tidepool_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

#[derive(Debug, Deserialize)]
struct RawTidepool {
    #[serde(default = "default_tidepool_url")]
    base_url: String,
}

impl Default for RawTidepool {
    fn default() -> Self {
        RawTidepool {
            base_url: default_tidepool_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNightscout {
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    sync: SyncConfig,
    #[serde(default)]
    tidepool: RawTidepool,
    nightscout: RawNightscout,
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) => {
            info!(var = name, "Found secret in env");
            Ok(value)
        }
        Err(e) => {
            error!(error = ?e, var = name, "Environment variable not set");
            Err(anyhow::anyhow!("{name} environment variable not set: {e}"))
        }
    }
}

/// Loads a static YAML config file (no secrets) and injects required env vars for secrets.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let tidepool = TidepoolSection {
        base_url: raw.tidepool.base_url,
        username: require_env(TIDEPOOL_USERNAME_ENV)?,
        password: require_env(TIDEPOOL_PASSWORD_ENV)?,
    };
    let nightscout = NightscoutSection {
        base_url: raw.nightscout.base_url,
        api_secret: require_env(NIGHTSCOUT_API_SECRET_ENV)?,
    };

    raw.sync.trace_loaded();
    info!(
        tidepool_url = %tidepool.base_url,
        nightscout_url = %nightscout.base_url,
        "Config loaded and merged successfully"
    );

    Ok(CliConfig {
        sync: raw.sync,
        tidepool,
        nightscout,
    })
}
