//! Resource compilation
//!
//! `aapt2 compile` → `aapt2 link` → `javac R.java` → `jar R.jar`

use droidpack_core::ToolCommand;
use tracing::{debug, info};

use crate::context::BuildContext;
use crate::{require_artifact, BuildError};

/// Compiles `res/` and the manifest into the base APK and `R.jar`
pub struct ResourceCompiler<'a> {
    ctx: &'a BuildContext,
}

impl<'a> ResourceCompiler<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self { ctx }
    }

    /// Run all four steps in order
    pub async fn run(&self) -> Result<(), BuildError> {
        let out = &self.ctx.output;

        info!("Compiling resources");
        self.compile_command().output().await?;
        require_artifact(&out.compiled_res()).await?;

        info!("Linking resources");
        self.link_command().output().await?;
        require_artifact(&out.unaligned_apk()).await?;
        let r_java = out.r_java(&self.ctx.manifest.package);
        require_artifact(&r_java).await?;

        info!("Compiling R.java");
        let r_classes = out.r_classes();
        tokio::fs::create_dir_all(&r_classes)
            .await
            .map_err(|e| BuildError::io(&r_classes, e))?;
        self.r_java_command().output().await?;

        self.r_jar_command().output().await?;
        require_artifact(&out.r_jar()).await?;

        // R.java would otherwise be picked up again by the source walk
        tokio::fs::remove_file(&r_java)
            .await
            .map_err(|e| BuildError::io(&r_java, e))?;
        debug!("Removed {}", r_java.display());

        Ok(())
    }

    /// `aapt2 compile -o res.zip --dir res`
    pub fn compile_command(&self) -> ToolCommand {
        ToolCommand::new(&self.ctx.tools.aapt2)
            .arg("compile")
            .arg("-o")
            .arg(self.ctx.output.compiled_res())
            .arg("--dir")
            .arg(self.ctx.project.res_dir())
    }

    /// `aapt2 link` producing the base APK, `R.java` and `R.txt`
    pub fn link_command(&self) -> ToolCommand {
        let out = &self.ctx.output;
        ToolCommand::new(&self.ctx.tools.aapt2)
            .arg("link")
            .arg("-o")
            .arg(out.unaligned_apk())
            .arg("--manifest")
            .arg(self.ctx.project.manifest())
            .arg("-I")
            .arg(&self.ctx.tools.android_jar)
            .arg("--java")
            .arg(out.intermediates())
            .arg("--output-text-symbols")
            .arg(out.symbols())
            .arg(out.compiled_res())
    }

    pub fn r_java_command(&self) -> ToolCommand {
        let out = &self.ctx.output;
        ToolCommand::new(&self.ctx.tools.javac)
            .arg("-source")
            .arg(&self.ctx.javac_source)
            .arg("-target")
            .arg(&self.ctx.javac_target)
            .arg("-bootclasspath")
            .arg(&self.ctx.tools.android_jar)
            .arg("-d")
            .arg(out.r_classes())
            .arg(out.r_java(&self.ctx.manifest.package))
    }

    pub fn r_jar_command(&self) -> ToolCommand {
        let out = &self.ctx.output;
        ToolCommand::new(&self.ctx.tools.jar)
            .arg("--create")
            .arg("--file")
            .arg(out.r_jar())
            .arg("-C")
            .arg(out.r_classes())
            .arg(".")
    }
}
