//! Remote package index
//!
//! Google publishes the list of installable SDK packages as an XML document.
//! Only the package path and revision of each `remotePackage` are read.
//! Newer releases of a line are listed first, so the first match is taken
//! as the latest one.

use tracing::{debug, info};

use crate::ToolchainError;

/// Package index endpoint
pub const REPOSITORY_URL: &str = "https://dl.google.com/android/repository/repository2-1.xml";

/// One `remotePackage` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePackage {
    /// Package coordinate, e.g. `build-tools;34.0.0`
    pub path: String,
    pub major: String,
    pub minor: String,
    pub micro: String,
    pub preview: Option<String>,
}

impl RemotePackage {
    pub fn is_preview(&self) -> bool {
        self.preview.is_some()
    }

    /// Version part of the coordinate, keeping a preview suffix such as `-rc3`.
    /// Falls back to `major.minor.micro` for a path without one.
    pub fn version(&self) -> String {
        match self.path.split_once(';') {
            Some((_, version)) if !version.is_empty() => version.to_string(),
            _ => format!("{}.{}.{}", self.major, self.minor, self.micro),
        }
    }
}

/// Parsed package index
#[derive(Debug, Clone, Default)]
pub struct RepositoryIndex {
    packages: Vec<RemotePackage>,
}

impl RepositoryIndex {
    /// Download and parse the index
    pub async fn fetch(url: &str) -> Result<Self, ToolchainError> {
        info!("Fetching SDK package index from {}", url);
        let body = reqwest::get(url)
            .await?
            .error_for_status()?
            .text()
            .await?;
        Self::parse(&body)
    }

    pub fn parse(xml: &str) -> Result<Self, ToolchainError> {
        let doc = roxmltree::Document::parse(xml).map_err(|e| ToolchainError::Index(e.to_string()))?;

        let root = doc.root_element();
        if root.tag_name().name() != "sdk-repository" {
            return Err(ToolchainError::Index(format!(
                "unexpected root element <{}>",
                root.tag_name().name()
            )));
        }

        let packages: Vec<RemotePackage> = root
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "remotePackage")
            .filter_map(|n| {
                let path = n.attribute("path")?.to_string();
                let revision = child(n, "revision")?;
                Some(RemotePackage {
                    path,
                    major: child_text(revision, "major")?,
                    minor: child_text(revision, "minor").unwrap_or_else(|| "0".into()),
                    micro: child_text(revision, "micro").unwrap_or_else(|| "0".into()),
                    preview: child_text(revision, "preview"),
                })
            })
            .collect();

        debug!("Package index lists {} packages", packages.len());
        Ok(Self { packages })
    }

    pub fn packages(&self) -> &[RemotePackage] {
        &self.packages
    }

    /// Latest version of a package family.
    ///
    /// For `build-tools` the major revision must equal `api`; for `ndk` the
    /// first entry of the family wins regardless of `api`.
    pub fn latest_version(&self, family: &str, api: &str, skip_preview: bool) -> Option<String> {
        self.packages
            .iter()
            .filter(|p| !(skip_preview && p.is_preview()))
            .find(|p| p.path.starts_with(family) && (family == "ndk" || p.major == api))
            .map(RemotePackage::version)
    }
}

fn child<'a, 'i>(node: roxmltree::Node<'a, 'i>, name: &str) -> Option<roxmltree::Node<'a, 'i>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn child_text(node: roxmltree::Node, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sdk:sdk-repository xmlns:sdk="http://schemas.android.com/sdk/android/repo/repository2/03">
    <license id="android-sdk-license" type="text">terms</license>
    <remotePackage path="build-tools;34.0.0-rc3">
        <revision><major>34</major><minor>0</minor><micro>0</micro><preview>3</preview></revision>
        <display-name>Android SDK Build-Tools 34-rc3</display-name>
    </remotePackage>
    <remotePackage path="build-tools;34.0.0">
        <revision><major>34</major><minor>0</minor><micro>0</micro></revision>
    </remotePackage>
    <remotePackage path="build-tools;33.0.2">
        <revision><major>33</major><minor>0</minor><micro>2</micro></revision>
    </remotePackage>
    <remotePackage path="build-tools;33.0.1">
        <revision><major>33</major><minor>0</minor><micro>1</micro></revision>
    </remotePackage>
    <remotePackage path="ndk;26.1.10909125">
        <revision><major>26</major><minor>1</minor><micro>10909125</micro></revision>
    </remotePackage>
    <remotePackage path="ndk;25.2.9519653">
        <revision><major>25</major><minor>2</minor><micro>9519653</micro></revision>
    </remotePackage>
</sdk:sdk-repository>"#;

    #[test]
    fn test_parse_index() {
        let index = RepositoryIndex::parse(INDEX).unwrap();
        assert_eq!(index.packages().len(), 6);
        assert!(index.packages()[0].is_preview());
        assert_eq!(index.packages()[2].path, "build-tools;33.0.2");
    }

    #[test]
    fn test_first_matching_major_wins() {
        let index = RepositoryIndex::parse(INDEX).unwrap();
        assert_eq!(index.latest_version("build-tools", "33", true).as_deref(), Some("33.0.2"));
        assert_eq!(index.latest_version("build-tools", "30", true), None);
    }

    #[test]
    fn test_preview_skipping() {
        let index = RepositoryIndex::parse(INDEX).unwrap();
        assert_eq!(index.latest_version("build-tools", "34", true).as_deref(), Some("34.0.0"));
        // the newer preview is listed first and keeps its suffix
        assert_eq!(
            index.latest_version("build-tools", "34", false).as_deref(),
            Some("34.0.0-rc3")
        );
        assert_eq!(index.latest_version("build-tools", "33", false).as_deref(), Some("33.0.2"));
    }

    #[test]
    fn test_version_without_coordinate_suffix() {
        let package = RemotePackage {
            path: "emulator".into(),
            major: "34".into(),
            minor: "1".into(),
            micro: "9".into(),
            preview: None,
        };
        assert_eq!(package.version(), "34.1.9");
    }

    #[test]
    fn test_ndk_ignores_api_level() {
        let index = RepositoryIndex::parse(INDEX).unwrap();
        assert_eq!(index.latest_version("ndk", "", true).as_deref(), Some("26.1.10909125"));
    }

    #[test]
    fn test_wrong_root_element() {
        let err = RepositoryIndex::parse("<addons-list/>").unwrap_err();
        assert!(matches!(err, ToolchainError::Index(_)));
        assert_eq!(err.kind(), droidpack_core::ErrorKind::Parse);
    }

    #[test]
    fn test_malformed_index() {
        assert!(RepositoryIndex::parse("<sdk-repository><remotePackage>").is_err());
    }
}
