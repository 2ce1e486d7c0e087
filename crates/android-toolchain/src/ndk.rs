//! NDK
//!
//! Locates the installed NDK and describes the per-architecture compiler
//! invocations used to cross-compile the native libraries that end up in
//! `jniLibs/<abi>/`.

use std::fmt;
use std::path::{Path, PathBuf};

use droidpack_core::host;

use crate::detector::SdkRoot;
use crate::sdk_manager::list_subdirs;
use crate::ToolchainError;

/// Target ABI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Abi {
    ArmeabiV7a,
    Arm64V8a,
    X86,
    X86_64,
}

impl Abi {
    /// Every supported ABI, in build order
    pub const ALL: [Abi; 4] = [Abi::ArmeabiV7a, Abi::Arm64V8a, Abi::X86, Abi::X86_64];

    /// Get the ABI name as used in the APK lib directory
    pub fn abi_name(&self) -> &'static str {
        match self {
            Abi::ArmeabiV7a => "armeabi-v7a",
            Abi::Arm64V8a => "arm64-v8a",
            Abi::X86 => "x86",
            Abi::X86_64 => "x86_64",
        }
    }

    /// Clang `--target` triple, without the API level suffix
    pub fn clang_target(&self) -> &'static str {
        match self {
            Abi::ArmeabiV7a => "armv7-none-linux-androideabi",
            Abi::Arm64V8a => "aarch64-none-linux-android",
            Abi::X86 => "i686-none-linux-android",
            Abi::X86_64 => "x86_64-none-linux-android",
        }
    }

    pub fn from_abi_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|abi| abi.abi_name() == name)
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abi_name())
    }
}

/// `CC`/`CXX` values for one ABI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerEnv {
    pub abi: Abi,
    pub cc: String,
    pub cxx: String,
}

/// An installed NDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ndk {
    path: PathBuf,
    version: String,
}

impl Ndk {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let version = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, version }
    }

    /// Whether the SDK root has an `ndk` directory at all
    pub async fn is_installed(sdk: &SdkRoot) -> bool {
        tokio::fs::metadata(sdk.ndk_dir())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// The last (highest sorting) version under `<sdk>/ndk`
    pub async fn latest_installed(sdk: &SdkRoot) -> Result<Option<Self>, ToolchainError> {
        let root = sdk.ndk_dir();
        let versions = list_subdirs(&root).await?;
        Ok(versions.last().map(|v| Self::new(root.join(v))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `toolchains/llvm/prebuilt/<host>`
    pub fn prebuilt_dir(&self) -> PathBuf {
        self.path
            .join("toolchains")
            .join("llvm")
            .join("prebuilt")
            .join(host::ndk_host_tag())
    }

    /// Compiler commands targeting `abi` at API level `min_sdk`
    pub fn compiler_env(&self, abi: Abi, min_sdk: &str) -> CompilerEnv {
        let prebuilt = self.prebuilt_dir();
        let bin = prebuilt.join("bin");
        let flags = format!(
            "--target={}{} --gcc-toolchain={} --sysroot={}",
            abi.clang_target(),
            min_sdk,
            prebuilt.display(),
            prebuilt.join("sysroot").display()
        );

        CompilerEnv {
            abi,
            cc: format!("{} {}", bin.join(host::exe_name("clang")).display(), flags),
            cxx: format!("{} {}", bin.join(host::exe_name("clang++")).display(), flags),
        }
    }

    /// Compiler environments for every ABI, in build order
    pub fn compiler_envs(&self, min_sdk: &str) -> Vec<CompilerEnv> {
        Abi::ALL
            .iter()
            .map(|abi| self.compiler_env(*abi, min_sdk))
            .collect()
    }
}
