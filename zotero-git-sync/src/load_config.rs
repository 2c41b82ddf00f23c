/// `load_config` module: loads the YAML settings file, injects secrets from the
/// environment, and validates the result into a [`SyncConfig`].
///
/// This is the only place where the user-supplied YAML is parsed.
///
/// # Responsibilities
/// - Parse the config file into the loosely-typed [`RawSyncConfig`]
/// - Fill `zoteroApiKey` from `ZOTERO_API_KEY` when the file leaves it out
/// - Hand over to core validation so a missing field is reported by name
///
/// # Errors
/// Every failure is a [`ConfigError`]; nothing here touches the network.
use std::fs;
use std::path::Path;
use tracing::{error, info};
use zotero_git_sync_core::config::{RawSyncConfig, SyncConfig};
use zotero_git_sync_core::ConfigError;

pub const API_KEY_ENV: &str = "ZOTERO_API_KEY";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SyncConfig, ConfigError> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(ConfigError::Read {
                path: path_ref.to_path_buf(),
                source: e,
            });
        }
    };

    let mut raw: RawSyncConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(ConfigError::Parse {
                path: path_ref.to_path_buf(),
                message: e.to_string(),
            });
        }
    };

    if raw.zotero_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            info!("{API_KEY_ENV} found in env");
            raw.zotero_api_key = Some(key);
        }
    }

    let config = SyncConfig::try_from(raw).map_err(|e| {
        error!(error = %e, config_path = ?path_ref, "Config validation failed");
        e
    })?;
    config.trace_loaded();
    Ok(config)
}
