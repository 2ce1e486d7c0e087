//! Android Manifest Data Structures
//!
//! The subset of AndroidManifest.xml the pipeline reads, and the resolved
//! project metadata handed to the build.

use serde::Serialize;

use crate::ACTION_MAIN;

/// Parsed AndroidManifest.xml
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AndroidManifest {
    /// Package name (e.g., "com.example.app")
    pub package: Option<String>,
    /// `uses-sdk` minSdkVersion
    pub min_sdk: Option<String>,
    /// `uses-sdk` targetSdkVersion
    pub target_sdk: Option<String>,
    /// `application/activity` elements in document order
    pub activities: Vec<Activity>,
}

impl AndroidManifest {
    /// Both SDK versions, when the manifest declares them non-empty
    pub fn sdk_versions(&self) -> Option<(String, String)> {
        match (&self.min_sdk, &self.target_sdk) {
            (Some(min), Some(target)) if !min.is_empty() && !target.is_empty() => {
                Some((min.clone(), target.clone()))
            }
            _ => None,
        }
    }

    /// First activity with a MAIN intent filter
    pub fn main_activity(&self) -> Option<&Activity> {
        self.activities.iter().find(|a| a.is_main())
    }
}

/// Activity component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activity {
    /// Class name (.MainActivity or full package.Class)
    pub name: String,
    pub intent_filters: Vec<IntentFilter>,
}

impl Activity {
    pub fn is_main(&self) -> bool {
        self.intent_filters
            .iter()
            .any(|f| f.actions.iter().any(|a| a == ACTION_MAIN))
    }
}

/// Intent filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentFilter {
    pub actions: Vec<String>,
    pub categories: Vec<String>,
}

/// Activity as seen by the build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub name: String,
    pub is_main: bool,
}

/// Resolved project metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectManifest {
    pub package: String,
    pub min_sdk: String,
    pub target_sdk: String,
    pub activities: Vec<ActivityEntry>,
}

impl ProjectManifest {
    /// Package as a relative directory path, `com/example/app`
    pub fn package_path(&self) -> std::path::PathBuf {
        self.package.split('.').collect()
    }

    pub fn main_activity(&self) -> Option<&str> {
        self.activities
            .iter()
            .find(|a| a.is_main)
            .map(|a| a.name.as_str())
    }
}

/// `package/class` component name understood by `am start -n`
pub fn component_name(package: &str, activity: &str) -> String {
    if activity.starts_with('.') {
        format!("{}/{}{}", package, package, activity)
    } else if activity.contains('.') {
        format!("{}/{}", package, activity)
    } else {
        format!("{}/{}.{}", package, package, activity)
    }
}
