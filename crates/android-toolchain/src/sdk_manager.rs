//! SDK Components
//!
//! Finds the build-tools and platform directories for a target API level
//! and installs them through `sdkmanager` when they are missing and
//! installation is allowed.

use std::path::{Path, PathBuf};

use droidpack_core::{host, ToolCommand};
use tracing::{debug, info};

use crate::detector::SdkRoot;
use crate::jdk::is_file;
use crate::ndk::Ndk;
use crate::repository::{RepositoryIndex, REPOSITORY_URL};
use crate::ToolchainError;

/// Binaries the pipeline needs from a build-tools directory
pub const REQUIRED_BUILD_TOOLS: [&str; 4] = ["aapt2", "d8", "zipalign", "apksigner"];

/// Platform reference classpath archive
pub const ANDROID_JAR: &str = "android.jar";

/// Installable SDK component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkComponent {
    BuildTools(String), // build-tools;XX.X.X
    Platform(String),   // platforms;android-XX
    Ndk(String),        // ndk;XX.X.XXXXX
}

impl SdkComponent {
    /// Get the SDK manager package name
    pub fn package_name(&self) -> String {
        match self {
            SdkComponent::BuildTools(version) => format!("build-tools;{}", version),
            SdkComponent::Platform(api) => format!("platforms;android-{}", api),
            SdkComponent::Ndk(version) => format!("ndk;{}", version),
        }
    }
}

/// A verified build-tools directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTools {
    pub dir: PathBuf,
    pub aapt2: PathBuf,
    pub d8: PathBuf,
    pub zipalign: PathBuf,
    pub apksigner: PathBuf,
}

impl BuildTools {
    /// Check that all four pipeline binaries are present
    pub async fn verify(dir: impl Into<PathBuf>) -> Result<Self, ToolchainError> {
        let dir = dir.into();

        let mut missing = Vec::new();
        for tool in REQUIRED_BUILD_TOOLS {
            let name = host::exe_name(tool);
            if !is_file(&dir.join(&name)).await {
                missing.push(name);
            }
        }
        if !missing.is_empty() {
            return Err(ToolchainError::IncompleteComponent { dir, missing });
        }

        Ok(Self {
            aapt2: dir.join(host::exe_name("aapt2")),
            d8: dir.join(host::exe_name("d8")),
            zipalign: dir.join(host::exe_name("zipalign")),
            apksigner: dir.join(host::exe_name("apksigner")),
            dir,
        })
    }
}

/// A verified platform directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub dir: PathBuf,
    pub android_jar: PathBuf,
}

impl Platform {
    pub async fn verify(dir: impl Into<PathBuf>) -> Result<Self, ToolchainError> {
        let dir = dir.into();
        let android_jar = dir.join(ANDROID_JAR);
        if !is_file(&android_jar).await {
            return Err(ToolchainError::IncompleteComponent {
                dir,
                missing: vec![ANDROID_JAR.to_string()],
            });
        }
        Ok(Self { dir, android_jar })
    }
}

/// Pick the build-tools directory for an API level.
///
/// `names` must be sorted ascending; the last name starting with `api` is
/// the highest matching version.
pub fn select_build_tools<'a>(names: &'a [String], api: &str) -> Option<&'a str> {
    names
        .iter()
        .rev()
        .find(|name| name.starts_with(api))
        .map(String::as_str)
}

/// Sorted names of the immediate subdirectories; a missing directory is empty
pub(crate) async fn list_subdirs(dir: &Path) -> Result<Vec<String>, ToolchainError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ToolchainError::io(dir, e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ToolchainError::io(dir, e))?
    {
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Resolves SDK components against one SDK root
#[derive(Debug, Clone)]
pub struct SdkComponentResolver {
    sdk: SdkRoot,
    java_home: Option<PathBuf>,
    auto_install: bool,
    skip_preview: bool,
    index_url: String,
}

impl SdkComponentResolver {
    /// Resolver that never installs anything
    pub fn new(sdk: SdkRoot) -> Self {
        Self {
            sdk,
            java_home: None,
            auto_install: false,
            skip_preview: true,
            index_url: REPOSITORY_URL.to_string(),
        }
    }

    /// JDK handed to `sdkmanager` through `JAVA_HOME`
    pub fn with_java_home(mut self, java_home: impl Into<PathBuf>) -> Self {
        self.java_home = Some(java_home.into());
        self
    }

    pub fn auto_install(mut self, enabled: bool) -> Self {
        self.auto_install = enabled;
        self
    }

    pub fn skip_preview(mut self, skip: bool) -> Self {
        self.skip_preview = skip;
        self
    }

    pub fn index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = url.into();
        self
    }

    pub fn sdk(&self) -> &SdkRoot {
        &self.sdk
    }

    async fn find_build_tools(&self, api: &str) -> Result<Option<PathBuf>, ToolchainError> {
        let root = self.sdk.build_tools_dir();
        let names = list_subdirs(&root).await?;
        Ok(select_build_tools(&names, api).map(|name| root.join(name)))
    }

    async fn find_platform(&self, api: &str) -> Result<Option<PathBuf>, ToolchainError> {
        let root = self.sdk.platforms_dir();
        let wanted = format!("android-{}", api);
        let names = list_subdirs(&root).await?;
        Ok(names.contains(&wanted).then(|| root.join(wanted)))
    }

    /// Build-tools for `api`, installing the latest matching release if allowed
    pub async fn build_tools(&self, api: &str) -> Result<BuildTools, ToolchainError> {
        let dir = match self.find_build_tools(api).await? {
            Some(dir) => dir,
            None => {
                let searched = self.sdk.build_tools_dir();
                if !self.auto_install {
                    return Err(ToolchainError::ComponentNotFound {
                        component: format!("build-tools for targetSdkVersion={}", api),
                        searched,
                    });
                }

                let version = self.latest_remote("build-tools", api).await?;
                self.install(&SdkComponent::BuildTools(version)).await?;

                self.find_build_tools(api)
                    .await?
                    .ok_or_else(|| ToolchainError::ComponentNotFound {
                        component: format!("build-tools for targetSdkVersion={} after install", api),
                        searched,
                    })?
            }
        };

        info!("Using build-tools {:?}", dir);
        BuildTools::verify(dir).await
    }

    /// Platform `android-<api>`, installing it if allowed
    pub async fn platform(&self, api: &str) -> Result<Platform, ToolchainError> {
        let dir = match self.find_platform(api).await? {
            Some(dir) => dir,
            None => {
                let searched = self.sdk.platforms_dir();
                if !self.auto_install {
                    return Err(ToolchainError::ComponentNotFound {
                        component: format!("platform android-{}", api),
                        searched,
                    });
                }

                self.install(&SdkComponent::Platform(api.to_string())).await?;

                self.find_platform(api)
                    .await?
                    .ok_or_else(|| ToolchainError::ComponentNotFound {
                        component: format!("platform android-{} after install", api),
                        searched,
                    })?
            }
        };

        info!("Using platform {:?}", dir);
        Platform::verify(dir).await
    }

    /// Latest installed NDK, installing the newest release if allowed
    pub async fn ndk(&self) -> Result<Ndk, ToolchainError> {
        if let Some(ndk) = Ndk::latest_installed(&self.sdk).await? {
            return Ok(ndk);
        }

        let searched = self.sdk.ndk_dir();
        if !self.auto_install {
            return Err(ToolchainError::ComponentNotFound {
                component: "ndk".into(),
                searched,
            });
        }

        let version = self.latest_remote("ndk", "").await?;
        self.install(&SdkComponent::Ndk(version)).await?;

        Ndk::latest_installed(&self.sdk)
            .await?
            .ok_or(ToolchainError::ComponentNotFound {
                component: "ndk after install".into(),
                searched,
            })
    }

    async fn latest_remote(&self, family: &str, api: &str) -> Result<String, ToolchainError> {
        let index = RepositoryIndex::fetch(&self.index_url).await?;
        index
            .latest_version(family, api, self.skip_preview)
            .ok_or_else(|| ToolchainError::NotInIndex {
                family: family.to_string(),
                api: api.to_string(),
            })
    }

    /// Install a component, streaming sdkmanager's output to the console
    pub async fn install(&self, component: &SdkComponent) -> Result<(), ToolchainError> {
        let package = component.package_name();
        info!("Installing {}...", package);

        let mut cmd = ToolCommand::new(self.sdk.sdkmanager())
            .arg(&package)
            .env(crate::SDK_ROOT_ENV, self.sdk.path())
            .env(crate::ANDROID_HOME_ENV, self.sdk.path());
        if let Some(java_home) = &self.java_home {
            cmd = cmd.env(crate::JAVA_HOME_ENV, java_home);
        }

        cmd.status()
            .await
            .map_err(|source| ToolchainError::InstallFailed {
                package: package.clone(),
                source,
            })?;

        debug!("Installed {}", package);
        Ok(())
    }
}
