//! Per-user configuration
//!
//! Optional `config.toml` in the platform config directory
//! (`~/.config/droidpack` on Linux). Values here are defaults for every
//! project; the project file and command line override them.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Android toolchain defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidDefaults {
    /// SDK root used when `ANDROID_SDK_ROOT` is unset
    pub sdk_root: Option<PathBuf>,
    /// Java home used when `JAVA_HOME` is unset
    pub java_home: Option<PathBuf>,
    /// Install missing build-tools/platforms through sdkmanager
    pub auto_install: Option<bool>,
}

/// Contents of the per-user config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub android: AndroidDefaults,
}

impl UserConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "droidpack", "droidpack").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load the user config, or defaults when there is none
    pub async fn load() -> Result<Self, ConfigError> {
        match Self::config_file() {
            Some(path) => Self::load_from(&path).await,
            None => Ok(Self::default()),
        }
    }

    /// Load from an explicit path; a missing file yields defaults
    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No user config at {:?}", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        debug!("Loading user config from {:?}", path);
        toml::from_str(&contents).map_err(|source| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = UserConfig::load_from(&dir.path().join("config.toml"))
            .await
            .unwrap();
        assert_eq!(config, UserConfig::default());
    }

    #[tokio::test]
    async fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[android]\nsdk_root = \"/opt/android-sdk\"\n").unwrap();

        let config = UserConfig::load_from(&path).await.unwrap();
        assert_eq!(config.android.sdk_root, Some(PathBuf::from("/opt/android-sdk")));
        assert_eq!(config.android.java_home, None);
        assert_eq!(config.android.auto_install, None);
    }

    #[tokio::test]
    async fn test_invalid_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[android\n").unwrap();

        let err = UserConfig::load_from(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse { .. }));
    }
}
