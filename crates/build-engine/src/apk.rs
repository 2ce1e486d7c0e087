//! APK inspection
//!
//! Reads back a produced archive to report what ended up inside it.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::BuildError;

/// APK Signature Scheme v2+ block magic
const SIG_BLOCK_MAGIC: &[u8; 16] = b"APK Sig Block 42";

/// End of central directory record signature
const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];

const EOCD_MIN_SIZE: u64 = 22;

/// APK information
#[derive(Debug, Clone)]
pub struct ApkInfo {
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    pub entries: Vec<ApkEntry>,
    pub native_libs: Vec<NativeLib>,
    pub has_dex: bool,
    /// v1 signature files or a v2+ signing block
    pub signed: bool,
}

impl ApkInfo {
    /// ABIs with at least one native library, sorted
    pub fn abis(&self) -> Vec<&str> {
        let mut abis: Vec<&str> = self.native_libs.iter().map(|l| l.abi.as_str()).collect();
        abis.sort_unstable();
        abis.dedup();
        abis
    }
}

/// Native library in APK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeLib {
    pub abi: String,
    pub name: String,
    pub size: u64,
}

/// APK entry information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApkEntry {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
    pub compression: String,
}

impl ApkEntry {
    pub fn compression_ratio(&self) -> f64 {
        if self.size == 0 {
            0.0
        } else {
            1.0 - (self.compressed_size as f64 / self.size as f64)
        }
    }
}

/// APK Analyzer
pub struct ApkAnalyzer;

impl ApkAnalyzer {
    pub fn analyze(path: &Path) -> Result<ApkInfo, BuildError> {
        let size = std::fs::metadata(path)
            .map_err(|e| BuildError::io(path, e))?
            .len();
        let entries = Self::list_files(path)?;

        let native_libs = entries
            .iter()
            .filter_map(|entry| {
                let rest = entry.name.strip_prefix("lib/")?;
                let (abi, name) = rest.split_once('/')?;
                (name.ends_with(".so") && !name.contains('/')).then(|| NativeLib {
                    abi: abi.to_string(),
                    name: name.to_string(),
                    size: entry.size,
                })
            })
            .collect();

        let has_dex = entries.iter().any(|e| e.name == "classes.dex");
        let v1_signed = entries.iter().any(|e| {
            e.name.starts_with("META-INF/")
                && (e.name.ends_with(".RSA") || e.name.ends_with(".DSA") || e.name.ends_with(".EC"))
        });
        let signed = v1_signed || Self::has_v2_signature(path).map_err(|e| BuildError::io(path, e))?;

        Ok(ApkInfo {
            path: path.to_path_buf(),
            size,
            entries,
            native_libs,
            has_dex,
            signed,
        })
    }

    /// Entries in archive order
    pub fn list_files(path: &Path) -> Result<Vec<ApkEntry>, BuildError> {
        let file = File::open(path).map_err(|e| BuildError::io(path, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| BuildError::archive(path, e))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let file = archive
                .by_index_raw(i)
                .map_err(|e| BuildError::archive(path, e))?;
            if file.is_dir() {
                continue;
            }
            entries.push(ApkEntry {
                name: file.name().to_string(),
                size: file.size(),
                compressed_size: file.compressed_size(),
                compression: format!("{:?}", file.compression()),
            });
        }

        Ok(entries)
    }

    /// The v2 signing block sits right before the central directory and
    /// ends with its magic.
    fn has_v2_signature(path: &Path) -> std::io::Result<bool> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < EOCD_MIN_SIZE {
            return Ok(false);
        }

        // EOCD is 22 bytes plus a comment of at most 64 KiB
        let tail_len = len.min(EOCD_MIN_SIZE + u64::from(u16::MAX));
        let mut tail = vec![0u8; tail_len as usize];
        file.seek(SeekFrom::End(-(tail_len as i64)))?;
        file.read_exact(&mut tail)?;

        let Some(eocd) = (0..=tail.len() - EOCD_MIN_SIZE as usize)
            .rev()
            .find(|&i| tail[i..i + 4] == EOCD_SIGNATURE)
        else {
            return Ok(false);
        };

        let mut offset = [0u8; 4];
        offset.copy_from_slice(&tail[eocd + 16..eocd + 20]);
        let cd_offset = u64::from(u32::from_le_bytes(offset));
        if cd_offset < SIG_BLOCK_MAGIC.len() as u64 {
            return Ok(false);
        }

        let mut magic = [0u8; 16];
        file.seek(SeekFrom::Start(cd_offset - SIG_BLOCK_MAGIC.len() as u64))?;
        file.read_exact(&mut magic)?;
        Ok(&magic == SIG_BLOCK_MAGIC)
    }

    /// Human-readable size
    pub fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.2} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.2} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.2} KB", bytes as f64 / KB as f64)
        } else {
            format!("{} bytes", bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    use super::*;

    fn write_apk(path: &Path, names: &[&str]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for name in names {
            writer
                .start_file(
                    *name,
                    FileOptions::default().compression_method(CompressionMethod::Stored),
                )
                .unwrap();
            writer.write_all(b"data").unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_analyze() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("app.apk");
        write_apk(
            &apk,
            &[
                "AndroidManifest.xml",
                "classes.dex",
                "lib/arm64-v8a/libmain.so",
                "lib/x86/libmain.so",
                "lib/x86/libc++_shared.so",
            ],
        );

        let info = ApkAnalyzer::analyze(&apk).unwrap();
        assert_eq!(info.entries.len(), 5);
        assert!(info.has_dex);
        assert!(!info.signed);
        assert_eq!(info.native_libs.len(), 3);
        assert_eq!(info.abis(), ["arm64-v8a", "x86"]);
        assert_eq!(info.entries[1].compression, "Stored");
    }

    #[test]
    fn test_v1_signature_files() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("app.apk");
        write_apk(&apk, &["classes.dex", "META-INF/CERT.SF", "META-INF/CERT.RSA"]);
        assert!(ApkAnalyzer::analyze(&apk).unwrap().signed);
    }

    #[test]
    fn test_not_an_archive() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("app.apk");
        std::fs::write(&apk, b"not a zip").unwrap();
        assert!(matches!(
            ApkAnalyzer::analyze(&apk),
            Err(BuildError::Archive { .. })
        ));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(ApkAnalyzer::format_size(512), "512 bytes");
        assert_eq!(ApkAnalyzer::format_size(2048), "2.00 KB");
        assert_eq!(ApkAnalyzer::format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
