//! AndroidManifest.xml Parser
//!
//! Event-driven parse of the elements the pipeline reads. Attributes are
//! matched by local name, so `android:minSdkVersion` and `minSdkVersion`
//! are treated alike.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::manifest::{Activity, AndroidManifest, IntentFilter};
use crate::ManifestError;

/// Manifest parser
pub struct ManifestParser;

impl ManifestParser {
    /// Parse a manifest file from path
    pub async fn parse_file(path: impl AsRef<Path>) -> Result<AndroidManifest, ManifestError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Parsing manifest {:?}", path);
        Self::parse_str(&content)
    }

    /// Parse manifest from string
    pub fn parse_str(xml: &str) -> Result<AndroidManifest, ManifestError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut manifest = AndroidManifest::default();
        let mut open: Vec<String> = Vec::new();
        let mut seen_root = false;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => {
                    Self::visit(&mut manifest, &open, e, &mut seen_root)?;
                    open.push(local_name(e));
                }
                Event::Empty(ref e) => {
                    Self::visit(&mut manifest, &open, e, &mut seen_root)?;
                }
                Event::End(_) => {
                    open.pop();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(ManifestError::InvalidStructure(format!(
                "unclosed <{}> element",
                unclosed
            )));
        }
        if !seen_root {
            return Err(ManifestError::InvalidStructure(
                "missing <manifest> root element".into(),
            ));
        }

        Ok(manifest)
    }

    fn visit(
        manifest: &mut AndroidManifest,
        open: &[String],
        e: &BytesStart,
        seen_root: &mut bool,
    ) -> Result<(), ManifestError> {
        let name = local_name(e);
        let parents: Vec<&str> = open.iter().map(String::as_str).collect();

        match (parents.as_slice(), name.as_str()) {
            ([], "manifest") => {
                *seen_root = true;
                manifest.package = get_attr(e, "package")?;
            }
            ([], other) => {
                return Err(ManifestError::InvalidStructure(format!(
                    "root element is <{}>, expected <manifest>",
                    other
                )));
            }
            (["manifest"], "uses-sdk") => {
                manifest.min_sdk = get_attr(e, "minSdkVersion")?;
                manifest.target_sdk = get_attr(e, "targetSdkVersion")?;
            }
            (["manifest", "application"], "activity") => {
                manifest.activities.push(Activity {
                    name: get_attr(e, "name")?.unwrap_or_default(),
                    intent_filters: Vec::new(),
                });
            }
            (["manifest", "application", "activity"], "intent-filter") => {
                if let Some(activity) = manifest.activities.last_mut() {
                    activity.intent_filters.push(IntentFilter::default());
                }
            }
            (["manifest", "application", "activity", "intent-filter"], "action" | "category") => {
                let value = get_attr(e, "name")?;
                let filter = manifest
                    .activities
                    .last_mut()
                    .and_then(|a| a.intent_filters.last_mut());
                if let (Some(filter), Some(value)) = (filter, value) {
                    if name == "action" {
                        filter.actions.push(value);
                    } else {
                        filter.categories.push(value);
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Attribute value by local name, ignoring any namespace prefix
fn get_attr(e: &BytesStart, name: &str) -> Result<Option<String>, ManifestError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.prefix().map(|p| p.as_ref() == b"xmlns").unwrap_or(false) {
            continue;
        }
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
