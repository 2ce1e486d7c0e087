//! Java installation
//!
//! Resolves and validates the JDK whose `bin` directory provides the four
//! tools the pipeline needs.

use std::path::{Path, PathBuf};

use droidpack_core::{host, ToolCommand};
use tracing::{debug, info};
use which::which;

use crate::ToolchainError;

/// Tools that must be present in `<java home>/bin`
pub const REQUIRED_JAVA_TOOLS: [&str; 4] = ["java", "javac", "jar", "keytool"];

const JAVA_HOME_PROPERTY: &str = "java.home = ";

/// Absolute paths to the JDK tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaTools {
    pub java: PathBuf,
    pub javac: PathBuf,
    pub jar: PathBuf,
    pub keytool: PathBuf,
}

/// A validated Java installation directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaHome {
    path: PathBuf,
}

impl JavaHome {
    /// Resolve from `JAVA_HOME`, falling back to the `java` on `PATH`
    pub async fn from_env() -> Result<Self, ToolchainError> {
        let explicit = std::env::var_os(crate::JAVA_HOME_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::resolve(explicit).await
    }

    /// Resolve a Java home.
    ///
    /// An explicit path is validated strictly and never falls back to the
    /// search path, so a broken `JAVA_HOME` is reported instead of masked.
    pub async fn resolve(explicit: Option<PathBuf>) -> Result<Self, ToolchainError> {
        if let Some(path) = explicit {
            debug!("Using explicit java home {:?}", path);
            return Self::validate(path).await;
        }

        let java = which("java").map_err(|_| ToolchainError::JavaNotFound)?;
        let home = Self::query_java_home(&java).await?;
        info!("Found java home {:?} via {:?}", home, java);
        Self::validate(home).await
    }

    /// Check that `bin` holds every required tool
    pub async fn validate(path: impl Into<PathBuf>) -> Result<Self, ToolchainError> {
        let path = path.into();
        let bin = path.join("bin");

        let mut missing = Vec::new();
        for tool in REQUIRED_JAVA_TOOLS {
            let name = host::exe_name(tool);
            if !is_file(&bin.join(&name)).await {
                missing.push(name);
            }
        }

        if !missing.is_empty() {
            return Err(ToolchainError::InvalidJavaHome { path, missing });
        }

        Ok(Self { path })
    }

    /// Ask the runtime where it is installed
    async fn query_java_home(java: &Path) -> Result<PathBuf, ToolchainError> {
        let output = ToolCommand::new(java)
            .args(["-XshowSettings:properties", "--version"])
            .output()
            .await?;

        parse_java_home(&output.combined()).ok_or_else(|| ToolchainError::JavaHomeProperty {
            java: java.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tools(&self) -> JavaTools {
        let bin = self.path.join("bin");
        JavaTools {
            java: bin.join(host::exe_name("java")),
            javac: bin.join(host::exe_name("javac")),
            jar: bin.join(host::exe_name("jar")),
            keytool: bin.join(host::exe_name("keytool")),
        }
    }
}

/// Extract `java.home` from `-XshowSettings:properties` output
fn parse_java_home(output: &str) -> Option<PathBuf> {
    output
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(JAVA_HOME_PROPERTY))
        .map(|home| PathBuf::from(home.trim()))
        .filter(|home| !home.as_os_str().is_empty())
}

pub(crate) async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_jdk(tools: &[&str]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        for tool in tools {
            std::fs::write(bin.join(host::exe_name(tool)), "").unwrap();
        }
        dir
    }

    #[test]
    fn test_parse_java_home() {
        let output = "Property settings:\n    file.encoding = UTF-8\n    java.home = /usr/lib/jvm/java-17-openjdk\n    java.io.tmpdir = /tmp\nopenjdk 17.0.9 2023-10-17\n";
        assert_eq!(
            parse_java_home(output),
            Some(PathBuf::from("/usr/lib/jvm/java-17-openjdk"))
        );
        assert_eq!(parse_java_home("openjdk 17.0.9"), None);
    }

    #[tokio::test]
    async fn test_validate_complete_jdk() {
        let jdk = fake_jdk(&REQUIRED_JAVA_TOOLS);
        let home = JavaHome::validate(jdk.path()).await.unwrap();
        assert_eq!(home.path(), jdk.path());
        assert_eq!(
            home.tools().keytool,
            jdk.path().join("bin").join(host::exe_name("keytool"))
        );
    }

    #[tokio::test]
    async fn test_validate_reports_every_missing_tool() {
        let jdk = fake_jdk(&["java", "jar"]);
        let err = JavaHome::validate(jdk.path()).await.unwrap_err();
        match err {
            ToolchainError::InvalidJavaHome { missing, .. } => {
                assert_eq!(missing, vec![host::exe_name("javac"), host::exe_name("keytool")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_explicit_invalid_home_does_not_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let err = JavaHome::resolve(Some(dir.path().to_path_buf()))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolchainError::InvalidJavaHome { .. }));
        assert_eq!(err.kind(), droidpack_core::ErrorKind::Configuration);
    }
}
