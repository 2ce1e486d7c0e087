//! Project configuration (`droidpack.toml`)
//!
//! Optional file next to where `droidpack` is run. Relative paths in it are
//! resolved against the directory holding the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Project file name
pub const PROJECT_FILE: &str = "droidpack.toml";

/// `[android]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AndroidSection {
    /// Android project root, `android` when unset
    pub dir: Option<PathBuf>,
    /// Output root, `target/android` when unset
    pub target_dir: Option<PathBuf>,
    pub auto_install: Option<bool>,
    pub skip_preview: Option<bool>,
}

/// `[signing]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SigningSection {
    pub keystore: Option<PathBuf>,
    /// `pass:`, `env:` or `file:` specification
    pub password: Option<String>,
}

/// droidpack project configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub android: AndroidSection,
    pub signing: SigningSection,
}

impl ProjectConfig {
    /// Load `droidpack.toml` from `dir`, or defaults when there is none
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(PROJECT_FILE);
        if !path.exists() {
            debug!("No {} in {}", PROJECT_FILE, dir.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Load from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.resolve_paths(base))
    }

    fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |p: Option<PathBuf>| p.map(|p| if p.is_relative() { base.join(p) } else { p });
        self.android.dir = resolve(self.android.dir.take());
        self.android.target_dir = resolve(self.android.target_dir.take());
        self.signing.keystore = resolve(self.signing.keystore.take());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ProjectConfig::discover(dir.path()).unwrap(), ProjectConfig::default());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_FILE),
            r#"
[android]
dir = "platform/android"
auto_install = true

[signing]
keystore = "/keys/release.keystore"
password = "env:KS_PASS"
"#,
        )
        .unwrap();

        let config = ProjectConfig::discover(dir.path()).unwrap();
        assert_eq!(config.android.dir, Some(dir.path().join("platform/android")));
        assert_eq!(config.android.target_dir, None);
        assert_eq!(config.android.auto_install, Some(true));
        assert_eq!(config.android.skip_preview, None);
        assert_eq!(
            config.signing.keystore,
            Some(PathBuf::from("/keys/release.keystore"))
        );
        assert_eq!(config.signing.password.as_deref(), Some("env:KS_PASS"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_FILE);
        std::fs::write(&path, "[android]\nsdk = \"/opt/sdk\"\n").unwrap();
        let err = ProjectConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse"));
    }
}
