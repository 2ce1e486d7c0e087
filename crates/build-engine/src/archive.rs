//! Archive merge
//!
//! `aapt2 link` produces an APK without code or native libraries. The merge
//! stage splices `classes.dex` and `jniLibs/<abi>/*.so` into it and then runs
//! `zipalign`.
//!
//! The zip crate cannot append to an existing archive in place, so the
//! archive is rewritten: every existing entry is raw-copied (compressed bytes,
//! CRC and headers untouched) into a temporary file next to the original, new
//! entries are deflated after them, and the temporary file is verified and
//! renamed over the original. A crash at any point leaves the original intact.

use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, Timelike};
use droidpack_android_toolchain::Abi;
use droidpack_core::ToolCommand;
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::context::BuildContext;
use crate::{require_artifact, BuildError};

/// In-archive name of the dex file
pub const DEX_ENTRY: &str = "classes.dex";

/// A host file and the path it gets inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub source: PathBuf,
    pub name: String,
}

impl ArchiveEntry {
    pub fn new(source: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
        }
    }
}

/// Add `entries` to the archive at `path`, keeping existing entries byte-identical.
///
/// Fails with [`BuildError::DuplicateEntry`] before writing anything if an
/// entry name is already taken.
pub async fn patch_archive(path: &Path, entries: Vec<ArchiveEntry>) -> Result<(), BuildError> {
    let path = path.to_path_buf();
    let joined = path.clone();
    tokio::task::spawn_blocking(move || patch_archive_blocking(&path, &entries))
        .await
        .map_err(|e| BuildError::io(joined, io::Error::new(io::ErrorKind::Other, e)))?
}

fn patch_archive_blocking(path: &Path, entries: &[ArchiveEntry]) -> Result<(), BuildError> {
    let file = File::open(path).map_err(|e| BuildError::io(path, e))?;
    let mut old = ZipArchive::new(file).map_err(|e| BuildError::archive(path, e))?;
    let existing = old.len();

    let mut names: HashSet<String> = old.file_names().map(str::to_string).collect();
    for entry in entries {
        if !names.insert(entry.name.clone()) {
            return Err(BuildError::DuplicateEntry(entry.name.clone()));
        }
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".droidpack-")
        .suffix(".apk.tmp")
        .tempfile_in(dir)
        .map_err(|e| BuildError::io(dir, e))?;
    let tmp_path = tmp.path().to_path_buf();

    {
        let mut writer = ZipWriter::new(tmp.as_file_mut());

        for i in 0..existing {
            let file = old
                .by_index_raw(i)
                .map_err(|e| BuildError::archive(path, e))?;
            writer
                .raw_copy_file(file)
                .map_err(|e| BuildError::archive(&tmp_path, e))?;
        }

        for entry in entries {
            add_file(&mut writer, entry).map_err(|e| match e {
                AddError::Source(source) => BuildError::io(&entry.source, source),
                AddError::Zip(source) => BuildError::archive(&tmp_path, source),
            })?;
            debug!("Added {} as {}", entry.source.display(), entry.name);
        }

        writer
            .finish()
            .map_err(|e| BuildError::archive(&tmp_path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| BuildError::io(&tmp_path, e))?;

    let expected = existing + entries.len();
    let found = {
        let file = File::open(&tmp_path).map_err(|e| BuildError::io(&tmp_path, e))?;
        ZipArchive::new(file)
            .map_err(|e| BuildError::archive(&tmp_path, e))?
            .len()
    };
    if found != expected {
        return Err(BuildError::ArchiveVerification {
            path: tmp_path,
            expected,
            found,
        });
    }

    drop(old);
    tmp.persist(path).map_err(|e| BuildError::io(path, e.error))?;
    Ok(())
}

enum AddError {
    Source(io::Error),
    Zip(zip::result::ZipError),
}

fn add_file<W: io::Write + io::Seek>(
    writer: &mut ZipWriter<W>,
    entry: &ArchiveEntry,
) -> Result<(), AddError> {
    let mut source = File::open(&entry.source).map_err(AddError::Source)?;
    let metadata = source.metadata().map_err(AddError::Source)?;

    let mut options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(permissions(&metadata));
    if let Ok(modified) = metadata.modified() {
        options = options.last_modified_time(zip_time(modified));
    }
    if metadata.len() >= u64::from(u32::MAX) {
        options = options.large_file(true);
    }

    writer
        .start_file(entry.name.as_str(), options)
        .map_err(AddError::Zip)?;
    io::copy(&mut source, writer).map_err(AddError::Source)?;
    Ok(())
}

#[cfg(unix)]
fn permissions(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permissions(_metadata: &std::fs::Metadata) -> u32 {
    0o644
}

/// DOS timestamps start in 1980; anything unrepresentable falls back to that
fn zip_time(time: SystemTime) -> zip::DateTime {
    let local: DateTime<Local> = time.into();
    u16::try_from(local.year())
        .ok()
        .and_then(|year| {
            zip::DateTime::from_date_and_time(
                year,
                local.month() as u8,
                local.day() as u8,
                local.hour() as u8,
                local.minute() as u8,
                local.second() as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}

/// Merges dex and native libraries into the base APK, then aligns it
pub struct ArchiveMerger<'a> {
    ctx: &'a BuildContext,
}

impl<'a> ArchiveMerger<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self) -> Result<(), BuildError> {
        let out = &self.ctx.output;
        let unaligned = out.unaligned_apk();
        require_artifact(&unaligned).await?;
        require_artifact(&out.classes_dex()).await?;

        let entries = self.collect_entries()?;
        info!("Merging {} entries into {}", entries.len(), unaligned.display());
        patch_archive(&unaligned, entries).await?;

        info!("Aligning APK");
        self.zipalign_command().output().await?;
        require_artifact(&out.aligned_apk()).await?;

        Ok(())
    }

    /// `classes.dex` followed by every `jniLibs/<abi>/*.so` as `lib/<abi>/<file>`
    pub fn collect_entries(&self) -> Result<Vec<ArchiveEntry>, BuildError> {
        let mut entries = vec![ArchiveEntry::new(self.ctx.output.classes_dex(), DEX_ENTRY)];
        entries.extend(native_libs(&self.ctx.project.jni_libs_dir())?);
        Ok(entries)
    }

    pub fn zipalign_command(&self) -> ToolCommand {
        let out = &self.ctx.output;
        ToolCommand::new(&self.ctx.tools.zipalign)
            .arg("-f")
            .arg("4")
            .arg(out.unaligned_apk())
            .arg(out.aligned_apk())
    }
}

/// Native libraries one level below `jni_libs`
pub fn native_libs(jni_libs: &Path) -> Result<Vec<ArchiveEntry>, BuildError> {
    let dir = jni_libs.to_str().ok_or_else(|| {
        BuildError::Config(format!("non UTF-8 path {}", jni_libs.display()))
    })?;
    let pattern = format!("{}/*/*.so", glob::Pattern::escape(dir));

    let paths = glob::glob(&pattern)
        .map_err(|e| BuildError::Config(format!("invalid glob {pattern}: {e}")))?;

    let mut entries = Vec::new();
    let mut unknown = HashSet::new();
    for path in paths {
        let path = path.map_err(|e| {
            let p = e.path().to_path_buf();
            BuildError::io(p, e.into_error())
        })?;
        if !path.is_file() {
            continue;
        }

        let (Some(abi), Some(file)) = (
            path.parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str()),
            path.file_name().and_then(|n| n.to_str()),
        ) else {
            warn!("Skipping native library with non UTF-8 path {}", path.display());
            continue;
        };

        if Abi::from_abi_name(abi).is_none() && unknown.insert(abi.to_string()) {
            warn!("jniLibs/{} does not name a known ABI", abi);
        }
        entries.push(ArchiveEntry::new(&path, format!("lib/{abi}/{file}")));
    }

    if entries.is_empty() {
        warn!("No native libraries found under {}", jni_libs.display());
    }
    Ok(entries)
}
