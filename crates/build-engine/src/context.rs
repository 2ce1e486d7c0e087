//! Build context and the file-path contracts between stages

use std::path::{Path, PathBuf};

use droidpack_android_toolchain::{BuildTools, JavaHome, Platform};
use droidpack_manifest_manager::ProjectManifest;

use crate::config::{BuildConfig, KeystorePassword};

/// Fixed paths of a conventional Android project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(android_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: android_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn app_dir(&self) -> PathBuf {
        self.root.join("app")
    }

    pub fn manifest(&self) -> PathBuf {
        self.main_dir().join("AndroidManifest.xml")
    }

    pub fn gradle_file(&self) -> PathBuf {
        self.app_dir().join("build.gradle")
    }

    /// Resource tree fed to `aapt2 compile`
    pub fn res_dir(&self) -> PathBuf {
        self.main_dir().join("res")
    }

    /// Root of the Java source walk
    pub fn src_dir(&self) -> PathBuf {
        self.app_dir().join("src")
    }

    /// Per-ABI native library directories live here
    pub fn jni_libs_dir(&self) -> PathBuf {
        self.main_dir().join("jniLibs")
    }

    fn main_dir(&self) -> PathBuf {
        self.app_dir().join("src").join("main")
    }
}

/// Intermediate and final artifacts under the output root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: target_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn intermediates(&self) -> PathBuf {
        self.root.join("intermediates")
    }

    /// Compiled resources from `aapt2 compile`
    pub fn compiled_res(&self) -> PathBuf {
        self.intermediates().join("res.zip")
    }

    /// Base APK from `aapt2 link`, patched in place by the merge stage
    pub fn unaligned_apk(&self) -> PathBuf {
        self.intermediates().join("unaligned.apk")
    }

    pub fn symbols(&self) -> PathBuf {
        self.intermediates().join("R.txt")
    }

    /// Generated `R.java` for `package`
    pub fn r_java(&self, package: &str) -> PathBuf {
        package
            .split('.')
            .fold(self.intermediates(), |path, part| path.join(part))
            .join("R.java")
    }

    /// Class output of the `R.java` compile
    pub fn r_classes(&self) -> PathBuf {
        self.intermediates().join("R")
    }

    pub fn r_jar(&self) -> PathBuf {
        self.intermediates().join("R.jar")
    }

    pub fn classes_dex(&self) -> PathBuf {
        self.intermediates().join("classes.dex")
    }

    pub fn aligned_apk(&self) -> PathBuf {
        self.intermediates().join("aligned.apk")
    }

    /// The signed result
    pub fn final_apk(&self) -> PathBuf {
        self.root.join("app.apk")
    }
}

/// Resolved tool binaries and the platform classpath
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainPaths {
    pub javac: PathBuf,
    pub jar: PathBuf,
    pub keytool: PathBuf,
    pub aapt2: PathBuf,
    pub d8: PathBuf,
    pub zipalign: PathBuf,
    pub apksigner: PathBuf,
    pub android_jar: PathBuf,
}

impl ToolchainPaths {
    pub fn new(java: &JavaHome, build_tools: &BuildTools, platform: &Platform) -> Self {
        let jdk = java.tools();
        Self {
            javac: jdk.javac,
            jar: jdk.jar,
            keytool: jdk.keytool,
            aapt2: build_tools.aapt2.clone(),
            d8: build_tools.d8.clone(),
            zipalign: build_tools.zipalign.clone(),
            apksigner: build_tools.apksigner.clone(),
            android_jar: platform.android_jar.clone(),
        }
    }
}

/// Keystore and password handed to `apksigner`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningParams {
    pub keystore: PathBuf,
    pub password: KeystorePassword,
}

/// Everything a single pipeline run needs, resolved up front
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub project: ProjectLayout,
    pub output: OutputLayout,
    pub tools: ToolchainPaths,
    pub manifest: ProjectManifest,
    pub signing: SigningParams,
    pub javac_source: String,
    pub javac_target: String,
}

impl BuildContext {
    pub fn new(
        config: &BuildConfig,
        tools: ToolchainPaths,
        manifest: ProjectManifest,
        signing: SigningParams,
    ) -> Self {
        Self {
            project: ProjectLayout::new(config.android_dir()),
            output: OutputLayout::new(config.target_dir()),
            tools,
            manifest,
            signing,
            javac_source: config.javac_source().to_string(),
            javac_target: config.javac_target().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_layout() {
        let layout = ProjectLayout::new("android");
        assert_eq!(
            layout.manifest(),
            Path::new("android/app/src/main/AndroidManifest.xml")
        );
        assert_eq!(layout.res_dir(), Path::new("android/app/src/main/res"));
        assert_eq!(layout.src_dir(), Path::new("android/app/src"));
        assert_eq!(
            layout.jni_libs_dir(),
            Path::new("android/app/src/main/jniLibs")
        );
        assert_eq!(layout.gradle_file(), Path::new("android/app/build.gradle"));
    }

    #[test]
    fn test_output_layout() {
        let out = OutputLayout::new("target/android");
        assert_eq!(
            out.compiled_res(),
            Path::new("target/android/intermediates/res.zip")
        );
        assert_eq!(
            out.r_java("com.example.app"),
            Path::new("target/android/intermediates/com/example/app/R.java")
        );
        assert_eq!(out.final_apk(), Path::new("target/android/app.apk"));
        assert!(out.aligned_apk().starts_with(out.intermediates()));
    }
}
