//! Android Manifest Manager
//!
//! Reads the project metadata the packaging pipeline depends on: the
//! package name, the min/target SDK pair and the launchable activity.
//! The SDK pair falls back to `app/build.gradle` when the manifest does
//! not provide it.

pub mod gradle;
pub mod manifest;
pub mod parser;
pub mod reader;

pub use gradle::GradleFile;
pub use manifest::{component_name, Activity, ActivityEntry, AndroidManifest, IntentFilter, ProjectManifest};
pub use parser::ManifestParser;
pub use reader::ManifestReader;

use std::path::PathBuf;

use droidpack_core::ErrorKind;

/// Intent action of the launcher entry point
pub const ACTION_MAIN: &str = "android.intent.action.MAIN";

/// Manifest errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid manifest structure: {0}")]
    InvalidStructure(String),

    #[error("no package attribute on <manifest> in {}", .0.display())]
    MissingPackage(PathBuf),

    #[error("unable to find minSdk and targetSdk in {} or {}", .manifest.display(), .gradle.display())]
    SdkVersionsNotFound { manifest: PathBuf, gradle: PathBuf },

    #[error("no activity handles android.intent.action.MAIN in {}", .0.display())]
    MainActivityNotFound(PathBuf),
}

impl ManifestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ManifestError::Io { .. } => ErrorKind::Filesystem,
            _ => ErrorKind::Parse,
        }
    }
}
