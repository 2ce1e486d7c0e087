//! CLI commands
//!
//! Each command merges its flags with `droidpack.toml` and the per-user
//! config (flags win), then drives the build engine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use droidpack_android_toolchain::{SdkRoot, ANDROID_HOME_ENV, JAVA_HOME_ENV, SDK_ROOT_ENV};
use droidpack_build_engine::{
    ApkAnalyzer, BuildConfig, BuildOutput, BuildRunner, KeystorePassword, ProjectLayout,
};
use droidpack_core::UserConfig;
use droidpack_device_bridge::AdbClient;
use droidpack_manifest_manager::{component_name, ManifestReader};
use tracing::{info, warn};

use crate::project::ProjectConfig;

/// Android project directory used when neither flag nor project file sets one
pub const DEFAULT_ANDROID_DIR: &str = "android";

/// Build a signed APK
#[derive(Args, Debug, Clone, Default)]
pub struct BuildCommand {
    /// Android project root (contains app/)
    #[arg(long, value_name = "DIR")]
    pub android_dir: Option<PathBuf>,

    /// Output root, wiped before every build
    #[arg(long, value_name = "DIR")]
    pub target_dir: Option<PathBuf>,

    /// Keystore to sign with instead of the debug keystore
    #[arg(long, value_name = "FILE")]
    pub keystore: Option<PathBuf>,

    /// Keystore password: pass:<password>, env:<name> or file:<path>
    #[arg(long, value_name = "SPEC", requires = "keystore")]
    pub ks_pass: Option<KeystorePassword>,

    /// Install missing build-tools and platforms with sdkmanager
    #[arg(long)]
    pub download: bool,

    /// javac -source value
    #[arg(long, value_name = "VERSION")]
    pub javac_source: Option<String>,

    /// javac -target value
    #[arg(long, value_name = "VERSION")]
    pub javac_target: Option<String>,
}

impl BuildCommand {
    /// Merge flags, project file and user config into a [`BuildConfig`]
    pub fn config(&self, project: &ProjectConfig, user: &UserConfig) -> Result<BuildConfig> {
        let android_dir = self
            .android_dir
            .clone()
            .or_else(|| project.android.dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ANDROID_DIR));

        let mut builder = BuildConfig::builder(android_dir)
            .auto_install(
                self.download
                    || project
                        .android
                        .auto_install
                        .or(user.android.auto_install)
                        .unwrap_or(false),
            )
            .sdk_root(fallback(&[SDK_ROOT_ENV, ANDROID_HOME_ENV], &user.android.sdk_root))
            .java_home(fallback(&[JAVA_HOME_ENV], &user.android.java_home));

        if let Some(target_dir) = self.target_dir.as_ref().or(project.android.target_dir.as_ref()) {
            builder = builder.target_dir(target_dir);
        }
        if let Some(skip) = project.android.skip_preview {
            builder = builder.skip_preview(skip);
        }

        if let Some(source) = &self.javac_source {
            builder = builder.javac_source(source);
        }
        if let Some(target) = &self.javac_target {
            builder = builder.javac_target(target);
        }

        match self.keystore.as_ref().or(project.signing.keystore.as_ref()) {
            Some(keystore) => {
                let password = match (&self.ks_pass, &project.signing.password) {
                    (Some(password), _) => password.clone(),
                    (None, Some(spec)) => spec
                        .parse()
                        .context("Invalid [signing] password in project file")?,
                    (None, None) => KeystorePassword::default(),
                };
                builder = builder.keystore(keystore, password);
            }
            None if project.signing.password.is_some() => {
                warn!("Ignoring [signing] password without a keystore, using the debug keystore");
            }
            None => {}
        }

        Ok(builder.build()?)
    }

    /// Execute the build command
    pub async fn execute(&self, project: &ProjectConfig, user: &UserConfig) -> Result<BuildOutput> {
        let config = self.config(project, user)?;
        let output = BuildRunner::new(config)
            .build()
            .await
            .context("Build failed")?;

        let apk = ApkAnalyzer::analyze(&output.path)?;
        info!(
            "Build successful: {} ({}, {} entries, ABIs: {})",
            output.path.display(),
            ApkAnalyzer::format_size(output.size),
            apk.entries.len(),
            apk.abis().join(", ")
        );
        Ok(output)
    }
}

/// Build, install and launch on a device, then follow its log
#[derive(Args, Debug, Clone, Default)]
pub struct RunCommand {
    #[command(flatten)]
    pub build: BuildCommand,

    /// Device serial, required when more than one device is connected
    #[arg(long)]
    pub serial: Option<String>,
}

impl RunCommand {
    /// Execute the run command
    pub async fn execute(&self, project: &ProjectConfig, user: &UserConfig) -> Result<()> {
        let config = self.build.config(project, user)?;
        let layout = ProjectLayout::new(config.android_dir());
        let sdk_root = config.sdk_root().map(Path::to_path_buf);

        let output = BuildRunner::new(config)
            .build()
            .await
            .context("Build failed")?;
        info!("Build complete: {}", output.path.display());

        let (package, activity) = ManifestReader::new(layout.manifest(), layout.gradle_file())
            .main_activity()
            .await?;

        let sdk = match sdk_root {
            Some(path) => SdkRoot::validate(path).await?,
            None => SdkRoot::from_env().await?,
        };
        let adb = AdbClient::new(sdk.adb()).with_serial(self.serial.clone());

        adb.install(&output.path).await?;
        adb.start_activity(&component_name(&package, &activity))
            .await?;
        let pid = adb.pidof(&package).await?;
        info!("{} running as pid {}", package, pid);
        adb.logcat(&pid).await?;

        Ok(())
    }
}

/// Print the resolved project manifest as JSON
#[derive(Args, Debug, Clone, Default)]
pub struct ManifestCommand {
    /// Android project root (contains app/)
    #[arg(long, value_name = "DIR")]
    pub android_dir: Option<PathBuf>,
}

impl ManifestCommand {
    /// Execute the manifest command
    pub async fn execute(&self, project: &ProjectConfig) -> Result<()> {
        let android_dir = self
            .android_dir
            .clone()
            .or_else(|| project.android.dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ANDROID_DIR));
        let layout = ProjectLayout::new(android_dir);

        let manifest = ManifestReader::new(layout.manifest(), layout.gradle_file())
            .read()
            .await
            .with_context(|| format!("Failed to read {}", layout.manifest().display()))?;

        println!("{}", serde_json::to_string_pretty(&manifest)?);
        Ok(())
    }
}

/// The user config value, used only while none of `vars` is set
fn fallback(vars: &[&str], value: &Option<PathBuf>) -> Option<PathBuf> {
    let env_set = vars
        .iter()
        .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()));
    if env_set {
        None
    } else {
        value.clone()
    }
}
