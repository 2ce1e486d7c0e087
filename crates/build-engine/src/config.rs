//! Build Configuration
//!
//! [`BuildConfig`] is built once at program entry and handed to the pipeline
//! by reference. Nothing in the pipeline mutates it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::BuildError;

/// Default output root, relative to the working directory
pub const DEFAULT_TARGET_DIR: &str = "target/android";

/// Password of the generated debug keystore
pub const DEBUG_KEYSTORE_PASSWORD: &str = "android";

/// Keystore password specification, passed to `apksigner --ks-pass`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeystorePassword {
    /// `pass:<literal>`
    Literal(String),
    /// `env:<NAME>`
    Env(String),
    /// `file:<path>`
    File(PathBuf),
}

impl Default for KeystorePassword {
    fn default() -> Self {
        KeystorePassword::Literal(DEBUG_KEYSTORE_PASSWORD.to_string())
    }
}

impl FromStr for KeystorePassword {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s.split_once(':').ok_or_else(|| {
            BuildError::Config(format!(
                "invalid keystore password \"{s}\": expected pass:<password>, env:<name> or file:<path>"
            ))
        })?;

        match kind {
            "pass" => Ok(KeystorePassword::Literal(value.to_string())),
            "env" if !value.is_empty() => Ok(KeystorePassword::Env(value.to_string())),
            "file" if !value.is_empty() => Ok(KeystorePassword::File(PathBuf::from(value))),
            "env" | "file" => Err(BuildError::Config(format!(
                "keystore password \"{s}\" is missing its {kind} value"
            ))),
            other => Err(BuildError::Config(format!(
                "unknown keystore password form \"{other}\", expected pass, env or file"
            ))),
        }
    }
}

impl fmt::Display for KeystorePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeystorePassword::Literal(p) => write!(f, "pass:{p}"),
            KeystorePassword::Env(name) => write!(f, "env:{name}"),
            KeystorePassword::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// Build configuration
#[derive(Debug, Clone)]
pub struct BuildConfig {
    android_dir: PathBuf,
    target_dir: PathBuf,
    keystore: Option<PathBuf>,
    keystore_password: KeystorePassword,
    javac_source: String,
    javac_target: String,
    auto_install: bool,
    skip_preview: bool,
    sdk_root: Option<PathBuf>,
    java_home: Option<PathBuf>,
}

impl BuildConfig {
    /// Start a configuration for the Android project at `android_dir`
    pub fn builder(android_dir: impl Into<PathBuf>) -> BuildConfigBuilder {
        BuildConfigBuilder::new(android_dir)
    }

    /// Android project root (contains `app/`)
    pub fn android_dir(&self) -> &Path {
        &self.android_dir
    }

    /// Output root, wiped at the start of every build
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Explicit keystore; `None` means the debug keystore
    pub fn keystore(&self) -> Option<&Path> {
        self.keystore.as_deref()
    }

    pub fn keystore_password(&self) -> &KeystorePassword {
        &self.keystore_password
    }

    pub fn javac_source(&self) -> &str {
        &self.javac_source
    }

    pub fn javac_target(&self) -> &str {
        &self.javac_target
    }

    /// Install missing SDK components through `sdkmanager`
    pub fn auto_install(&self) -> bool {
        self.auto_install
    }

    /// Ignore preview packages when resolving from the remote index
    pub fn skip_preview(&self) -> bool {
        self.skip_preview
    }

    /// SDK root override; `None` reads `ANDROID_SDK_ROOT`
    pub fn sdk_root(&self) -> Option<&Path> {
        self.sdk_root.as_deref()
    }

    /// Java home override; `None` reads `JAVA_HOME` or searches `PATH`
    pub fn java_home(&self) -> Option<&Path> {
        self.java_home.as_deref()
    }
}

/// Builder for [`BuildConfig`]
#[derive(Debug, Clone)]
pub struct BuildConfigBuilder {
    config: BuildConfig,
}

impl BuildConfigBuilder {
    fn new(android_dir: impl Into<PathBuf>) -> Self {
        Self {
            config: BuildConfig {
                android_dir: android_dir.into(),
                target_dir: PathBuf::from(DEFAULT_TARGET_DIR),
                keystore: None,
                keystore_password: KeystorePassword::default(),
                javac_source: "8".to_string(),
                javac_target: "8".to_string(),
                auto_install: false,
                skip_preview: true,
                sdk_root: None,
                java_home: None,
            },
        }
    }

    pub fn target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.target_dir = dir.into();
        self
    }

    pub fn keystore(mut self, path: impl Into<PathBuf>, password: KeystorePassword) -> Self {
        self.config.keystore = Some(path.into());
        self.config.keystore_password = password;
        self
    }

    /// `javac -source`
    pub fn javac_source(mut self, version: impl Into<String>) -> Self {
        self.config.javac_source = version.into();
        self
    }

    /// `javac -target`
    pub fn javac_target(mut self, version: impl Into<String>) -> Self {
        self.config.javac_target = version.into();
        self
    }

    pub fn auto_install(mut self, enabled: bool) -> Self {
        self.config.auto_install = enabled;
        self
    }

    pub fn skip_preview(mut self, skip: bool) -> Self {
        self.config.skip_preview = skip;
        self
    }

    pub fn sdk_root(mut self, path: Option<PathBuf>) -> Self {
        self.config.sdk_root = path;
        self
    }

    pub fn java_home(mut self, path: Option<PathBuf>) -> Self {
        self.config.java_home = path;
        self
    }

    /// Validate and freeze the configuration
    pub fn build(self) -> Result<BuildConfig, BuildError> {
        let config = self.config;

        if !config.android_dir.is_dir() {
            return Err(BuildError::Config(format!(
                "android project directory {} does not exist",
                config.android_dir.display()
            )));
        }
        if config.javac_source.trim().is_empty() || config.javac_target.trim().is_empty() {
            return Err(BuildError::Config(
                "javac source and target compatibility must not be empty".to_string(),
            ));
        }
        if config.target_dir.as_os_str().is_empty() {
            return Err(BuildError::Config("target directory must not be empty".to_string()));
        }

        Ok(config)
    }
}
