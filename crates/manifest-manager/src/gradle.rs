//! build.gradle fallback
//!
//! Line-oriented scan for `minSdk` and `targetSdk`. The second
//! whitespace-separated token of a matching line is taken literally; no
//! Groovy is evaluated.

use std::path::Path;

use crate::ManifestError;

/// SDK values found in a Gradle build file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GradleFile {
    pub min_sdk: Option<String>,
    pub target_sdk: Option<String>,
}

impl GradleFile {
    pub async fn read(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::parse_str(&content))
    }

    pub fn parse_str(content: &str) -> Self {
        let mut gradle = Self::default();
        for line in content.lines().map(str::trim) {
            let Some(value) = second_token(line) else {
                continue;
            };
            if line.starts_with("minSdk") {
                gradle.min_sdk = Some(value);
            } else if line.starts_with("targetSdk") {
                gradle.target_sdk = Some(value);
            }
        }
        gradle
    }

    pub fn sdk_versions(&self) -> Option<(String, String)> {
        match (&self.min_sdk, &self.target_sdk) {
            (Some(min), Some(target)) => Some((min.clone(), target.clone())),
            _ => None,
        }
    }
}

fn second_token(line: &str) -> Option<String> {
    line.split_whitespace().nth(1).map(str::to_string)
}
