//! Java compilation and dexing

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use droidpack_core::{host, ToolCommand};
use tracing::info;
use walkdir::WalkDir;

use crate::context::BuildContext;
use crate::{require_artifact, BuildError};

/// Compiles project sources against `android.jar` + `R.jar`, then dexes them
pub struct SourceCompiler<'a> {
    ctx: &'a BuildContext,
}

impl<'a> SourceCompiler<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self) -> Result<(), BuildError> {
        let out = &self.ctx.output;
        require_artifact(&out.r_jar()).await?;

        let src_dir = self.ctx.project.src_dir();
        let sources = find_files(&src_dir, "java").await?;
        if sources.is_empty() {
            return Err(BuildError::Config(format!(
                "no .java sources under {}",
                src_dir.display()
            )));
        }

        info!("Compiling {} Java sources", sources.len());
        self.javac_command(&sources)?.output().await?;

        let classes_dir = out.intermediates().join(self.ctx.manifest.package_path());
        let classes = find_files(&classes_dir, "class").await?;

        info!("Dexing {} classes", classes.len());
        self.d8_command(&classes).output().await?;
        require_artifact(&out.classes_dex()).await?;

        Ok(())
    }

    pub fn javac_command(&self, sources: &[PathBuf]) -> Result<ToolCommand, BuildError> {
        let out = &self.ctx.output;
        let classpath = host::join_classpath(&[self.ctx.tools.android_jar.clone(), out.r_jar()])
            .map_err(|e| BuildError::Config(format!("invalid classpath entry: {e}")))?;

        Ok(ToolCommand::new(&self.ctx.tools.javac)
            .arg("-source")
            .arg(&self.ctx.javac_source)
            .arg("-target")
            .arg(&self.ctx.javac_target)
            .arg("-classpath")
            .arg(classpath)
            .arg("-d")
            .arg(out.intermediates())
            .args(sources))
    }

    pub fn d8_command(&self, classes: &[PathBuf]) -> ToolCommand {
        ToolCommand::new(&self.ctx.tools.d8)
            .arg("--classpath")
            .arg(&self.ctx.tools.android_jar)
            .arg("--min-api")
            .arg(&self.ctx.manifest.min_sdk)
            .arg("--output")
            .arg(self.ctx.output.intermediates())
            .args(classes)
    }
}

/// Regular files under `dir` with the given extension, in walk order
pub async fn find_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, BuildError> {
    let root = dir.to_path_buf();
    let extension = extension.to_string();

    tokio::task::spawn_blocking(move || walk(&root, &extension))
        .await
        .map_err(|e| BuildError::io(dir, io::Error::new(io::ErrorKind::Other, e)))?
}

fn walk(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, BuildError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            BuildError::io(path, io::Error::from(e))
        })?;
        if entry.file_type().is_file() && entry.path().extension() == Some(OsStr::new(extension)) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
