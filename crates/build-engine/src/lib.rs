//! Android Build Engine
//!
//! Packages an Android project into a signed APK by driving the JDK and
//! SDK tools directly, without Gradle:
//!
//! 1. `aapt2 compile` / `aapt2 link` produce the unsigned base APK and `R.java`
//! 2. `javac` + `jar` turn `R.java` into `R.jar`
//! 3. `javac` + `d8` turn the project sources into `classes.dex`
//! 4. the dex file and `jniLibs/*/*.so` are merged into the base APK, then
//!    `zipalign` aligns it
//! 5. `apksigner` signs the aligned APK
//!
//! Every stage runs only after the previous one succeeded; the first failure
//! aborts the build and leaves the output directory for inspection.

pub mod apk;
pub mod archive;
pub mod config;
pub mod context;
pub mod resources;
pub mod runner;
pub mod signing;
pub mod sources;

pub use apk::{ApkAnalyzer, ApkEntry, ApkInfo};
pub use archive::{patch_archive, ArchiveEntry, ArchiveMerger};
pub use config::{BuildConfig, BuildConfigBuilder, KeystorePassword};
pub use context::{BuildContext, OutputLayout, ProjectLayout, SigningParams, ToolchainPaths};
pub use resources::ResourceCompiler;
pub use runner::{BuildOutput, BuildRunner};
pub use signing::{KeystoreProvider, Signer};
pub use sources::SourceCompiler;

use std::fmt;
use std::path::PathBuf;

use droidpack_android_toolchain::ToolchainError;
use droidpack_core::{ErrorKind, ToolError};
use droidpack_manifest_manager::ManifestError;

/// Pipeline stage, used to label failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Toolchain,
    Manifest,
    Sdk,
    Keystore,
    Clean,
    Resources,
    Sources,
    Merge,
    Sign,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Toolchain => "toolchain",
            Stage::Manifest => "manifest",
            Stage::Sdk => "sdk",
            Stage::Keystore => "keystore",
            Stage::Clean => "clean",
            Stage::Resources => "resources",
            Stage::Sources => "sources",
            Stage::Merge => "merge",
            Stage::Sign => "sign",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("missing intermediate artifact {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("duplicate archive entry {0}")]
    DuplicateEntry(String),

    #[error("archive error in {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("rewritten archive {} has {found} entries, expected {expected}", .path.display())]
    ArchiveVerification {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<BuildError>,
    },
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Config(_) => ErrorKind::Configuration,
            BuildError::Toolchain(e) => e.kind(),
            BuildError::Manifest(e) => e.kind(),
            BuildError::Tool(e) => e.kind(),
            BuildError::MissingArtifact(_)
            | BuildError::DuplicateEntry(_)
            | BuildError::Archive { .. }
            | BuildError::ArchiveVerification { .. }
            | BuildError::Io { .. } => ErrorKind::Filesystem,
            BuildError::Stage { source, .. } => source.kind(),
        }
    }

    /// Stage the error escaped from, if it was labelled
    pub fn stage(&self) -> Option<Stage> {
        match self {
            BuildError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Label with the stage it escaped from
    pub fn in_stage(self, stage: Stage) -> Self {
        BuildError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn archive(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        BuildError::Archive {
            path: path.into(),
            source,
        }
    }
}

/// Fail unless a predecessor stage left `path` behind
pub(crate) async fn require_artifact(path: &std::path::Path) -> Result<(), BuildError> {
    match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() => Ok(()),
        _ => Err(BuildError::MissingArtifact(path.to_path_buf())),
    }
}
