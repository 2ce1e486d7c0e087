//! Project metadata reader
//!
//! The SDK pair comes from the manifest when it declares both values and
//! from the Gradle build file otherwise, whatever the reason the manifest
//! fell short. The two sources are never merged.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::gradle::GradleFile;
use crate::manifest::{ActivityEntry, AndroidManifest, ProjectManifest};
use crate::parser::ManifestParser;
use crate::ManifestError;

/// Reads project metadata from a manifest and its Gradle fallback
#[derive(Debug, Clone)]
pub struct ManifestReader {
    manifest: PathBuf,
    gradle: PathBuf,
}

impl ManifestReader {
    pub fn new(manifest: impl Into<PathBuf>, gradle: impl Into<PathBuf>) -> Self {
        Self {
            manifest: manifest.into(),
            gradle: gradle.into(),
        }
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest
    }

    pub fn gradle_path(&self) -> &Path {
        &self.gradle
    }

    /// `(minSdk, targetSdk)`
    pub async fn sdk_versions(&self) -> Result<(String, String), ManifestError> {
        let parsed = ManifestParser::parse_file(&self.manifest).await;
        self.sdk_versions_from(&parsed).await
    }

    async fn sdk_versions_from(
        &self,
        parsed: &Result<AndroidManifest, ManifestError>,
    ) -> Result<(String, String), ManifestError> {
        match parsed {
            Ok(manifest) => {
                if let Some(versions) = manifest.sdk_versions() {
                    return Ok(versions);
                }
                warn!("{:?} has no minSdkVersion/targetSdkVersion, reading {:?}", self.manifest, self.gradle);
            }
            Err(e) => warn!("{}, reading {:?}", e, self.gradle),
        }

        let not_found = || ManifestError::SdkVersionsNotFound {
            manifest: self.manifest.clone(),
            gradle: self.gradle.clone(),
        };

        match GradleFile::read(&self.gradle).await {
            Ok(gradle) => gradle.sdk_versions().ok_or_else(not_found),
            Err(e) => {
                debug!("{}", e);
                Err(not_found())
            }
        }
    }

    /// Package attribute of the manifest root
    pub async fn package(&self) -> Result<String, ManifestError> {
        let manifest = ManifestParser::parse_file(&self.manifest).await?;
        self.package_from(&manifest)
    }

    fn package_from(&self, manifest: &AndroidManifest) -> Result<String, ManifestError> {
        manifest
            .package
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ManifestError::MissingPackage(self.manifest.clone()))
    }

    /// `(package, activity name)` of the first activity handling MAIN
    pub async fn main_activity(&self) -> Result<(String, String), ManifestError> {
        let manifest = ManifestParser::parse_file(&self.manifest).await?;
        let package = self.package_from(&manifest)?;
        let activity = manifest
            .main_activity()
            .ok_or_else(|| ManifestError::MainActivityNotFound(self.manifest.clone()))?;
        Ok((package, activity.name.clone()))
    }

    /// Package, SDK pair and activities in one pass
    pub async fn read(&self) -> Result<ProjectManifest, ManifestError> {
        let parsed = ManifestParser::parse_file(&self.manifest).await;
        let (min_sdk, target_sdk) = self.sdk_versions_from(&parsed).await?;

        let manifest = parsed?;
        let package = self.package_from(&manifest)?;
        let activities = manifest
            .activities
            .iter()
            .map(|a| ActivityEntry {
                name: a.name.clone(),
                is_main: a.is_main(),
            })
            .collect();

        Ok(ProjectManifest {
            package,
            min_sdk,
            target_sdk,
            activities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example.app">
    <uses-sdk android:minSdkVersion="21" android:targetSdkVersion="33"/>
    <application>
        <activity android:name=".First"/>
        <activity android:name=".Second">
            <intent-filter>
                <action android:name="android.intent.action.MAIN"/>
            </intent-filter>
        </activity>
    </application>
</manifest>"#;

    const NO_SDK: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example.app">
    <application/>
</manifest>"#;

    fn project(manifest: Option<&str>, gradle: Option<&str>) -> (TempDir, ManifestReader) {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("AndroidManifest.xml");
        let gradle_path = dir.path().join("build.gradle");
        if let Some(content) = manifest {
            std::fs::write(&manifest_path, content).unwrap();
        }
        if let Some(content) = gradle {
            std::fs::write(&gradle_path, content).unwrap();
        }
        (dir, ManifestReader::new(manifest_path, gradle_path))
    }

    #[tokio::test]
    async fn test_versions_from_manifest() {
        let (_dir, reader) = project(Some(FULL), Some("minSdk 1\ntargetSdk 2\n"));
        assert_eq!(reader.sdk_versions().await.unwrap(), ("21".into(), "33".into()));
    }

    #[tokio::test]
    async fn test_fallback_when_attributes_missing() {
        let (_dir, reader) = project(Some(NO_SDK), Some("  minSdk 21\n  targetSdk 33\n"));
        assert_eq!(reader.sdk_versions().await.unwrap(), ("21".into(), "33".into()));
    }

    #[tokio::test]
    async fn test_fallback_when_manifest_missing_or_malformed() {
        let (_dir, reader) = project(None, Some("minSdk 24\ntargetSdk 34\n"));
        assert_eq!(reader.sdk_versions().await.unwrap(), ("24".into(), "34".into()));

        let (_dir, reader) = project(Some("<manifest><uses-sdk"), Some("minSdk 24\ntargetSdk 34\n"));
        assert_eq!(reader.sdk_versions().await.unwrap(), ("24".into(), "34".into()));
    }

    #[tokio::test]
    async fn test_both_sources_fail() {
        let (_dir, reader) = project(Some(NO_SDK), None);
        let err = reader.sdk_versions().await.unwrap_err();
        assert!(matches!(err, ManifestError::SdkVersionsNotFound { .. }));
        assert_eq!(err.kind(), droidpack_core::ErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_main_activity_second_of_two() {
        let (_dir, reader) = project(Some(FULL), None);
        assert_eq!(
            reader.main_activity().await.unwrap(),
            ("com.example.app".to_string(), ".Second".to_string())
        );
    }

    #[tokio::test]
    async fn test_main_activity_not_found() {
        let (_dir, reader) = project(Some(NO_SDK), None);
        assert!(matches!(
            reader.main_activity().await.unwrap_err(),
            ManifestError::MainActivityNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_read_project_manifest() {
        let (_dir, reader) = project(Some(FULL), None);
        let manifest = reader.read().await.unwrap();
        assert_eq!(manifest.package, "com.example.app");
        assert_eq!(manifest.min_sdk, "21");
        assert_eq!(manifest.target_sdk, "33");
        assert_eq!(manifest.main_activity(), Some(".Second"));
        assert_eq!(manifest.activities.len(), 2);

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["activities"][1]["is_main"], true);
    }

    #[tokio::test]
    async fn test_read_needs_package_from_manifest() {
        let (_dir, reader) = project(None, Some("minSdk 21\ntargetSdk 33\n"));
        let err = reader.read().await.unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));

        let (_dir, reader) = project(Some("<manifest><uses-sdk minSdkVersion=\"21\" targetSdkVersion=\"33\"/></manifest>"), None);
        assert!(matches!(reader.read().await.unwrap_err(), ManifestError::MissingPackage(_)));
    }
}
