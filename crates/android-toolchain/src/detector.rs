//! Toolchain Detection
//!
//! Resolves the Java installation and the Android SDK root a build runs
//! against. Detection only probes the filesystem; the one subprocess it may
//! start is `java` itself, to ask where it is installed.

use std::path::{Path, PathBuf};

use droidpack_core::host;
use tracing::{debug, info, warn};

use crate::jdk::{is_file, JavaHome};
use crate::ToolchainError;

/// A validated Android SDK root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkRoot {
    path: PathBuf,
    licenses_accepted: bool,
}

impl SdkRoot {
    /// Resolve from `ANDROID_SDK_ROOT` (or `ANDROID_HOME`)
    pub async fn from_env() -> Result<Self, ToolchainError> {
        Self::resolve(sdk_root_from_env()).await
    }

    /// Validate an SDK root taken from the environment or configuration
    pub async fn resolve(path: Option<PathBuf>) -> Result<Self, ToolchainError> {
        let path = path.ok_or(ToolchainError::EnvNotSet(crate::SDK_ROOT_ENV))?;
        Self::validate(path).await
    }

    /// Scan the root for `licenses`, `platform-tools` and `cmdline-tools`.
    ///
    /// The two tool directories must also contain `adb` and
    /// `latest/bin/sdkmanager` respectively.
    pub async fn validate(path: impl Into<PathBuf>) -> Result<Self, ToolchainError> {
        let path = path.into();

        let mut entries = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| ToolchainError::io(&path, e))?;

        let mut licenses = false;
        let mut platform_tools = false;
        let mut cmdline_tools = false;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ToolchainError::io(&path, e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            match entry.file_name().to_str() {
                Some("licenses") => licenses = true,
                Some("platform-tools") => platform_tools = true,
                Some("cmdline-tools") => cmdline_tools = true,
                _ => {}
            }
        }

        let root = Self {
            path,
            licenses_accepted: licenses,
        };

        let mut missing = Vec::new();
        if !platform_tools || !is_file(&root.adb()).await {
            missing.push(host::exe_name("adb"));
        }
        if !cmdline_tools || !is_file(&root.sdkmanager()).await {
            missing.push(host::exe_name("sdkmanager"));
        }
        if !missing.is_empty() {
            return Err(ToolchainError::InvalidSdkRoot {
                path: root.path,
                missing,
            });
        }

        debug!(
            "Android SDK at {:?} (licenses accepted: {})",
            root.path, root.licenses_accepted
        );
        Ok(root)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn licenses_accepted(&self) -> bool {
        self.licenses_accepted
    }

    /// Fail with the command that accepts the licenses
    pub fn require_licenses(&self) -> Result<(), ToolchainError> {
        if self.licenses_accepted {
            Ok(())
        } else {
            Err(ToolchainError::LicensesNotAccepted {
                sdkmanager: self.sdkmanager(),
            })
        }
    }

    pub fn adb(&self) -> PathBuf {
        self.path.join("platform-tools").join(host::exe_name("adb"))
    }

    pub fn sdkmanager(&self) -> PathBuf {
        self.path
            .join("cmdline-tools")
            .join("latest")
            .join("bin")
            .join(host::exe_name("sdkmanager"))
    }

    pub fn build_tools_dir(&self) -> PathBuf {
        self.path.join("build-tools")
    }

    pub fn platforms_dir(&self) -> PathBuf {
        self.path.join("platforms")
    }

    pub fn ndk_dir(&self) -> PathBuf {
        self.path.join("ndk")
    }
}

fn sdk_root_from_env() -> Option<PathBuf> {
    std::env::var_os(crate::SDK_ROOT_ENV)
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var_os(crate::ANDROID_HOME_ENV).filter(|v| !v.is_empty()))
        .map(PathBuf::from)
}

/// Resolved Java installation and SDK root
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub java: JavaHome,
    pub sdk: SdkRoot,
}

/// Toolchain locator
///
/// Starts from the environment; explicit paths from configuration replace
/// the environment values.
#[derive(Debug, Clone, Default)]
pub struct ToolchainLocator {
    java_home: Option<PathBuf>,
    sdk_root: Option<PathBuf>,
}

impl ToolchainLocator {
    /// Locator seeded from `JAVA_HOME` and `ANDROID_SDK_ROOT`
    pub fn from_env() -> Self {
        Self {
            java_home: std::env::var_os(crate::JAVA_HOME_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            sdk_root: sdk_root_from_env(),
        }
    }

    /// Locator that ignores the environment entirely
    pub fn new(java_home: Option<PathBuf>, sdk_root: Option<PathBuf>) -> Self {
        Self {
            java_home,
            sdk_root,
        }
    }

    pub fn with_java_home(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.java_home = path;
        }
        self
    }

    pub fn with_sdk_root(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.sdk_root = path;
        }
        self
    }

    /// Resolve and validate both installations
    pub async fn locate(&self) -> Result<Toolchain, ToolchainError> {
        info!("Detecting Java and Android SDK...");

        let java = JavaHome::resolve(self.java_home.clone()).await?;
        let sdk = SdkRoot::resolve(self.sdk_root.clone()).await?;

        if !sdk.licenses_accepted() {
            warn!("Android SDK licenses have not been accepted in {:?}", sdk.path());
        }

        info!("Found JDK: {:?}", java.path());
        info!("Found Android SDK: {:?}", sdk.path());
        Ok(Toolchain { java, sdk })
    }
}
