use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::ConfigError;

pub const DEFAULT_ZOTERO_API_URL: &str = "https://api.zotero.org";
pub const DEFAULT_BIBLIOGRAPHY_FILE: &str = "README.md";
pub const DEFAULT_MAX_DOWNLOAD_DELAY_SECS: f64 = 10.0;
/// Upper bound accepted for `maxDownloadDelaySecs`.
pub const MAX_DOWNLOAD_DELAY_LIMIT_SECS: f64 = 3600.0;

/// Which kind of Zotero library the IDs refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    #[default]
    User,
    Group,
}

impl LibraryType {
    /// Path prefix used by the Zotero Web API.
    pub fn path_segment(&self) -> &'static str {
        match self {
            LibraryType::User => "users",
            LibraryType::Group => "groups",
        }
    }
}

/// The config file as written by the user: every field optional so that
/// validation can name exactly which one is missing.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSyncConfig {
    #[serde(default, deserialize_with = "string_or_number")]
    pub git_repository_url: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub git_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub git_email: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub zotero_api_key: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub zotero_user_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub zotero_collection_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub export_path: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub commit_message: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub zotero_api_url: Option<String>,
    #[serde(default)]
    pub zotero_library_type: Option<LibraryType>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub bibliography_file: Option<String>,
    #[serde(default)]
    pub max_download_delay_secs: Option<f64>,
}

/// Validated settings for one sync run. Immutable once built.
#[derive(Clone, Serialize)]
pub struct SyncConfig {
    pub git_repository_url: String,
    pub git_name: String,
    pub git_email: String,
    #[serde(skip_serializing)]
    pub zotero_api_key: String,
    pub zotero_user_id: String,
    pub zotero_collection_id: String,
    pub export_path: PathBuf,
    pub commit_message: String,
    pub zotero_api_url: String,
    pub zotero_library_type: LibraryType,
    pub bibliography_file: PathBuf,
    pub max_download_delay_secs: f64,
}

// Hand-written so the API key never ends up in logs.
impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("git_repository_url", &self.git_repository_url)
            .field("git_name", &self.git_name)
            .field("git_email", &self.git_email)
            .field("zotero_api_key", &"<redacted>")
            .field("zotero_user_id", &self.zotero_user_id)
            .field("zotero_collection_id", &self.zotero_collection_id)
            .field("export_path", &self.export_path)
            .field("commit_message", &self.commit_message)
            .field("zotero_api_url", &self.zotero_api_url)
            .field("zotero_library_type", &self.zotero_library_type)
            .field("bibliography_file", &self.bibliography_file)
            .field("max_download_delay_secs", &self.max_download_delay_secs)
            .finish()
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField(field)),
    }
}

impl TryFrom<RawSyncConfig> for SyncConfig {
    type Error = ConfigError;

    fn try_from(raw: RawSyncConfig) -> Result<Self, Self::Error> {
        let config = SyncConfig {
            git_repository_url: required(raw.git_repository_url, "gitRepositoryUrl")?,
            git_name: required(raw.git_name, "gitName")?,
            git_email: required(raw.git_email, "gitEmail")?,
            zotero_api_key: required(raw.zotero_api_key, "zoteroApiKey")?,
            zotero_user_id: required(raw.zotero_user_id, "zoteroUserId")?,
            zotero_collection_id: required(raw.zotero_collection_id, "zoteroCollectionId")?,
            export_path: PathBuf::from(required(raw.export_path, "exportPath")?),
            commit_message: required(raw.commit_message, "commitMessage")?,
            zotero_api_url: raw
                .zotero_api_url
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ZOTERO_API_URL.to_string()),
            zotero_library_type: raw.zotero_library_type.unwrap_or_default(),
            bibliography_file: PathBuf::from(
                raw.bibliography_file
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_BIBLIOGRAPHY_FILE.to_string()),
            ),
            max_download_delay_secs: raw
                .max_download_delay_secs
                .unwrap_or(DEFAULT_MAX_DOWNLOAD_DELAY_SECS),
        };

        if config.export_path.is_absolute() {
            return Err(ConfigError::InvalidValue {
                field: "exportPath",
                message: "must be relative to the repository root".into(),
            });
        }
        if config.bibliography_file.components().count() != 1 {
            return Err(ConfigError::InvalidValue {
                field: "bibliographyFile",
                message: "must be a plain file name".into(),
            });
        }
        let delay = config.max_download_delay_secs;
        if !delay.is_finite() || delay < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "maxDownloadDelaySecs",
                message: format!("{delay} is not a non-negative number"),
            });
        }
        if delay > MAX_DOWNLOAD_DELAY_LIMIT_SECS {
            return Err(ConfigError::InvalidValue {
                field: "maxDownloadDelaySecs",
                message: format!("{delay} exceeds the limit of {MAX_DOWNLOAD_DELAY_LIMIT_SECS} seconds"),
            });
        }

        Ok(config)
    }
}

impl SyncConfig {
    pub fn trace_loaded(&self) {
        info!(
            repository = %self.git_repository_url,
            collection = %self.zotero_collection_id,
            export_path = %self.export_path.display(),
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}

/// YAML happily turns `zoteroUserId: 1234567` into a number.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|s| match s {
        Scalar::Str(s) => s,
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> RawSyncConfig {
        RawSyncConfig {
            git_repository_url: Some("git@example.com:me/papers.git".into()),
            git_name: Some("Paper Bot".into()),
            git_email: Some("bot@example.com".into()),
            zotero_api_key: Some("secret".into()),
            zotero_user_id: Some("123".into()),
            zotero_collection_id: Some("ABCD1234".into()),
            export_path: Some("papers".into()),
            commit_message: Some("Update papers".into()),
            ..Default::default()
        }
    }

    #[test]
    fn complete_config_gets_defaults() {
        let config = SyncConfig::try_from(complete()).unwrap();
        assert_eq!(config.zotero_api_url, DEFAULT_ZOTERO_API_URL);
        assert_eq!(config.zotero_library_type, LibraryType::User);
        assert_eq!(config.bibliography_file, PathBuf::from("README.md"));
        assert_eq!(config.max_download_delay_secs, 10.0);
        assert_eq!(config.export_path, PathBuf::from("papers"));
    }

    #[test]
    fn missing_field_is_named() {
        let mut raw = complete();
        raw.zotero_collection_id = None;
        match SyncConfig::try_from(raw) {
            Err(ConfigError::MissingField(field)) => assert_eq!(field, "zoteroCollectionId"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn blank_field_counts_as_missing() {
        let mut raw = complete();
        raw.git_email = Some("   ".into());
        assert!(matches!(
            SyncConfig::try_from(raw),
            Err(ConfigError::MissingField("gitEmail"))
        ));
    }

    #[test]
    fn absolute_export_path_is_rejected() {
        let mut raw = complete();
        raw.export_path = Some("/etc".into());
        assert!(matches!(
            SyncConfig::try_from(raw),
            Err(ConfigError::InvalidValue { field: "exportPath", .. })
        ));
    }

    #[test]
    fn negative_delay_is_rejected() {
        let mut raw = complete();
        raw.max_download_delay_secs = Some(-1.0);
        assert!(matches!(
            SyncConfig::try_from(raw),
            Err(ConfigError::InvalidValue { field: "maxDownloadDelaySecs", .. })
        ));
    }

    #[test]
    fn huge_delay_is_rejected() {
        let mut raw = complete();
        raw.max_download_delay_secs = Some(1e300);
        assert!(matches!(
            SyncConfig::try_from(raw),
            Err(ConfigError::InvalidValue { field: "maxDownloadDelaySecs", .. })
        ));

        let mut raw = complete();
        raw.max_download_delay_secs = Some(MAX_DOWNLOAD_DELAY_LIMIT_SECS);
        assert!(SyncConfig::try_from(raw).is_ok());
    }

    #[test]
    fn numeric_ids_deserialize_as_strings() {
        let raw: RawSyncConfig =
            serde_json::from_str(r#"{"zoteroUserId": 987654, "zoteroLibraryType": "group"}"#)
                .unwrap();
        assert_eq!(raw.zotero_user_id.as_deref(), Some("987654"));
        assert_eq!(raw.zotero_library_type, Some(LibraryType::Group));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let config = SyncConfig::try_from(complete()).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
