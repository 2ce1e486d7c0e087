//! droidpack
//!
//! Packages a cross-compiled native library and a conventional Android
//! project layout into a signed, aligned APK by driving the JDK and Android
//! SDK tools directly.
//!
//! ## Architecture
//!
//! - `droidpack-core`: error taxonomy, subprocess runner, user config
//! - `droidpack-android-toolchain`: JDK/SDK discovery, component resolution, NDK
//! - `droidpack-manifest-manager`: AndroidManifest.xml and build.gradle reading
//! - `droidpack-build-engine`: the packaging pipeline
//! - `droidpack-device-bridge`: adb install, launch and logcat

#![warn(clippy::all)]

pub mod commands;
pub mod project;

pub use droidpack_android_toolchain as toolchain;
pub use droidpack_build_engine as build;
pub use droidpack_core as core;
pub use droidpack_device_bridge as device;
pub use droidpack_manifest_manager as manifest;

/// Prelude module for convenient imports
pub mod prelude {
    pub use droidpack_android_toolchain::{SdkComponentResolver, ToolchainLocator};
    pub use droidpack_build_engine::{BuildConfig, BuildRunner, KeystorePassword};
    pub use droidpack_device_bridge::AdbClient;
    pub use droidpack_manifest_manager::ManifestReader;
}
