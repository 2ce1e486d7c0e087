//! Android Toolchain Discovery
//!
//! Locates and validates everything the packaging pipeline shells out to:
//! - the JDK (`java`, `javac`, `jar`, `keytool`)
//! - the Android SDK root and its license state
//! - build-tools and platform directories for a target API level,
//!   installing them through `sdkmanager` when allowed
//! - the NDK used to cross-compile native libraries

pub mod detector;
pub mod jdk;
pub mod ndk;
pub mod repository;
pub mod sdk_manager;

pub use detector::{SdkRoot, Toolchain, ToolchainLocator};
pub use jdk::{JavaHome, JavaTools};
pub use ndk::{Abi, CompilerEnv, Ndk};
pub use repository::{RemotePackage, RepositoryIndex, REPOSITORY_URL};
pub use sdk_manager::{BuildTools, Platform, SdkComponent, SdkComponentResolver};

use std::path::PathBuf;

use droidpack_core::{ErrorKind, ToolError};

/// Environment variable holding the SDK root
pub const SDK_ROOT_ENV: &str = "ANDROID_SDK_ROOT";

/// Legacy name of [`SDK_ROOT_ENV`], read when the former is unset
pub const ANDROID_HOME_ENV: &str = "ANDROID_HOME";

/// Environment variable holding the Java installation
pub const JAVA_HOME_ENV: &str = "JAVA_HOME";

/// Toolchain errors
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error("{0} is not set")]
    EnvNotSet(&'static str),

    #[error("invalid java home {}: unable to find {} in bin", .path.display(), .missing.join(", "))]
    InvalidJavaHome { path: PathBuf, missing: Vec<String> },

    #[error("unable to find java: JAVA_HOME is not set and java is not on PATH")]
    JavaNotFound,

    #[error("unable to read java.home from the output of {}", .java.display())]
    JavaHomeProperty { java: PathBuf },

    #[error("invalid android sdk root {}: unable to find {}", .path.display(), .missing.join(", "))]
    InvalidSdkRoot { path: PathBuf, missing: Vec<String> },

    #[error("android sdk licenses not accepted, run \"{} --licenses\"", .sdkmanager.display())]
    LicensesNotAccepted { sdkmanager: PathBuf },

    #[error("unable to find {component} in {}", .searched.display())]
    ComponentNotFound { component: String, searched: PathBuf },

    #[error("unable to find {} in {}", .missing.join(", "), .dir.display())]
    IncompleteComponent { dir: PathBuf, missing: Vec<String> },

    #[error("no {family} package for API level {api} in the remote package index")]
    NotInIndex { family: String, api: String },

    #[error("installing {package} failed: {source}")]
    InstallFailed {
        package: String,
        #[source]
        source: ToolError,
    },

    #[error("invalid package index: {0}")]
    Index(String),

    #[error("fetching package index failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ToolchainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolchainError::EnvNotSet(_)
            | ToolchainError::InvalidJavaHome { .. }
            | ToolchainError::JavaNotFound
            | ToolchainError::JavaHomeProperty { .. }
            | ToolchainError::InvalidSdkRoot { .. }
            | ToolchainError::LicensesNotAccepted { .. } => ErrorKind::Configuration,
            ToolchainError::ComponentNotFound { .. }
            | ToolchainError::IncompleteComponent { .. }
            | ToolchainError::NotInIndex { .. }
            | ToolchainError::InstallFailed { .. }
            | ToolchainError::Network(_) => ErrorKind::Resolution,
            ToolchainError::Index(_) => ErrorKind::Parse,
            ToolchainError::Tool(_) => ErrorKind::ToolExecution,
            ToolchainError::Io { .. } => ErrorKind::Filesystem,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ToolchainError::Io {
            path: path.into(),
            source,
        }
    }
}
