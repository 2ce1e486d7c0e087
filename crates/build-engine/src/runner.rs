//! Build Runner
//!
//! Resolves everything up front, then runs the packaging stages strictly in
//! order. Each stage is wrapped in an `info_span` and any error escaping it
//! is labelled with the stage name.

use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

use droidpack_android_toolchain::{SdkComponentResolver, Toolchain, ToolchainLocator};
use droidpack_manifest_manager::ManifestReader;
use tracing::{info, info_span, Instrument};

use crate::archive::ArchiveMerger;
use crate::config::BuildConfig;
use crate::context::{BuildContext, ProjectLayout, SigningParams, ToolchainPaths};
use crate::resources::ResourceCompiler;
use crate::signing::{KeystoreProvider, Signer};
use crate::sources::SourceCompiler;
use crate::{BuildError, Stage};

/// Build output
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Signed APK
    pub path: PathBuf,
    /// APK size in bytes
    pub size: u64,
    pub duration_secs: f64,
}

/// Runs one full build for a [`BuildConfig`]
pub struct BuildRunner {
    config: BuildConfig,
    locator: ToolchainLocator,
}

impl BuildRunner {
    /// Runner resolving the toolchain from the environment, overridden by
    /// the paths set in `config`
    pub fn new(config: BuildConfig) -> Self {
        let locator = ToolchainLocator::from_env()
            .with_java_home(config.java_home().map(PathBuf::from))
            .with_sdk_root(config.sdk_root().map(PathBuf::from));
        Self { config, locator }
    }

    /// Runner with an explicit locator, for callers that must not read the
    /// environment
    pub fn with_locator(config: BuildConfig, locator: ToolchainLocator) -> Self {
        Self { config, locator }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Resolve toolchain, manifest, SDK components and keystore
    pub async fn prepare(&self) -> Result<BuildContext, BuildError> {
        let layout = ProjectLayout::new(self.config.android_dir());

        let toolchain = run_stage(Stage::Toolchain, async {
            let toolchain = self.locator.locate().await?;
            toolchain.sdk.require_licenses()?;
            Ok::<_, BuildError>(toolchain)
        })
        .await?;

        let manifest = run_stage(Stage::Manifest, async {
            let reader = ManifestReader::new(layout.manifest(), layout.gradle_file());
            let manifest = reader.read().await?;
            info!(
                "Package {} (minSdk {}, targetSdk {})",
                manifest.package, manifest.min_sdk, manifest.target_sdk
            );
            Ok::<_, BuildError>(manifest)
        })
        .await?;

        let tools = run_stage(Stage::Sdk, self.resolve_sdk(&toolchain, &manifest.target_sdk)).await?;

        let signing = run_stage(Stage::Keystore, async {
            let keystore = match self.config.keystore() {
                Some(path) => match tokio::fs::metadata(path).await {
                    Ok(meta) if meta.is_file() => path.to_path_buf(),
                    _ => {
                        return Err(BuildError::Config(format!(
                            "keystore {} does not exist",
                            path.display()
                        )))
                    }
                },
                None => KeystoreProvider::debug(&tools.keytool)?
                    .find_or_generate()
                    .await?,
            };
            Ok::<_, BuildError>(SigningParams {
                keystore,
                password: self.config.keystore_password().clone(),
            })
        })
        .await?;

        Ok(BuildContext::new(&self.config, tools, manifest, signing))
    }

    async fn resolve_sdk(
        &self,
        toolchain: &Toolchain,
        api: &str,
    ) -> Result<ToolchainPaths, BuildError> {
        let resolver = SdkComponentResolver::new(toolchain.sdk.clone())
            .with_java_home(toolchain.java.path())
            .auto_install(self.config.auto_install())
            .skip_preview(self.config.skip_preview());

        let build_tools = resolver.build_tools(api).await?;
        info!("Using build-tools {}", build_tools.dir.display());
        let platform = resolver.platform(api).await?;
        info!("Using platform {}", platform.dir.display());

        Ok(ToolchainPaths::new(&toolchain.java, &build_tools, &platform))
    }

    /// Full build: prepare, clean, then resources → sources → merge → sign
    pub async fn build(&self) -> Result<BuildOutput, BuildError> {
        let start = Instant::now();
        info!("Starting build for {}", self.config.android_dir().display());

        let ctx = self.prepare().await?;

        run_stage(Stage::Clean, clean(&ctx)).await?;
        run_stage(Stage::Resources, ResourceCompiler::new(&ctx).run()).await?;
        run_stage(Stage::Sources, SourceCompiler::new(&ctx).run()).await?;
        run_stage(Stage::Merge, ArchiveMerger::new(&ctx).run()).await?;
        let path = run_stage(Stage::Sign, Signer::new(&ctx).run()).await?;

        let size = tokio::fs::metadata(&path)
            .await
            .map_err(|e| BuildError::io(&path, e))?
            .len();
        let duration_secs = start.elapsed().as_secs_f64();
        info!("Built {} in {:.1}s", path.display(), duration_secs);

        Ok(BuildOutput {
            path,
            size,
            duration_secs,
        })
    }
}

async fn run_stage<T, F>(stage: Stage, fut: F) -> Result<T, BuildError>
where
    F: Future<Output = Result<T, BuildError>>,
{
    let span = info_span!("stage", name = stage.as_str());
    fut.instrument(span)
        .await
        .map_err(|e| e.in_stage(stage))
}

/// Remove the whole output root and recreate the intermediates directory
async fn clean(ctx: &BuildContext) -> Result<(), BuildError> {
    let root = ctx.output.root();
    match tokio::fs::remove_dir_all(root).await {
        Ok(()) => info!("Removed {}", root.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(BuildError::io(root, e)),
    }

    let intermediates = ctx.output.intermediates();
    tokio::fs::create_dir_all(&intermediates)
        .await
        .map_err(|e| BuildError::io(&intermediates, e))
}
