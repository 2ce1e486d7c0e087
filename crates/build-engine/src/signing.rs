//! Keystore lookup and APK signing

use std::path::{Path, PathBuf};

use droidpack_core::{host, ToolCommand};
use tracing::info;

use crate::config::DEBUG_KEYSTORE_PASSWORD;
use crate::context::BuildContext;
use crate::{require_artifact, BuildError};

/// Alias of the key in the debug keystore
pub const DEBUG_KEY_ALIAS: &str = "androiddebugkey";

/// Distinguished name of the debug certificate
pub const DEBUG_DNAME: &str = "CN=Android Debug,O=Android,C=US";

/// Finds `~/.android/debug.keystore`, generating it with `keytool` if absent
#[derive(Debug, Clone)]
pub struct KeystoreProvider {
    keytool: PathBuf,
    path: PathBuf,
}

impl KeystoreProvider {
    /// Provider for the per-user debug keystore
    pub fn debug(keytool: impl Into<PathBuf>) -> Result<Self, BuildError> {
        let path = Self::debug_keystore_path().ok_or_else(|| {
            BuildError::Config("cannot determine the home directory for debug.keystore".into())
        })?;
        Ok(Self::with_path(keytool, path))
    }

    /// Provider for a keystore at an arbitrary location
    pub fn with_path(keytool: impl Into<PathBuf>, path: impl Into<PathBuf>) -> Self {
        Self {
            keytool: keytool.into(),
            path: path.into(),
        }
    }

    pub fn debug_keystore_path() -> Option<PathBuf> {
        host::home_dir().map(|home| home.join(".android").join("debug.keystore"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Existing keystore path, or the freshly generated one
    pub async fn find_or_generate(&self) -> Result<PathBuf, BuildError> {
        if tokio::fs::metadata(&self.path).await.is_ok() {
            info!("Using keystore {}", self.path.display());
            return Ok(self.path.clone());
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BuildError::io(parent, e))?;
        }

        info!("Generating debug keystore {}", self.path.display());
        self.generate_command().output().await?;
        require_artifact(&self.path).await?;

        Ok(self.path.clone())
    }

    pub fn generate_command(&self) -> ToolCommand {
        ToolCommand::new(&self.keytool)
            .arg("-genkeypair")
            .arg("-v")
            .arg("-keystore")
            .arg(&self.path)
            .args(["-storepass", DEBUG_KEYSTORE_PASSWORD])
            .args(["-alias", DEBUG_KEY_ALIAS])
            .args(["-keypass", DEBUG_KEYSTORE_PASSWORD])
            .args(["-keyalg", "RSA", "-keysize", "2048", "-validity", "10000"])
            .args(["-dname", DEBUG_DNAME])
    }
}

/// Signs the aligned APK into the final output path
pub struct Signer<'a> {
    ctx: &'a BuildContext,
}

impl<'a> Signer<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self) -> Result<PathBuf, BuildError> {
        let out = &self.ctx.output;
        require_artifact(&out.aligned_apk()).await?;

        info!("Signing with {}", self.ctx.signing.keystore.display());
        self.sign_command().output().await?;

        let apk = out.final_apk();
        require_artifact(&apk).await?;
        Ok(apk)
    }

    pub fn sign_command(&self) -> ToolCommand {
        let out = &self.ctx.output;
        ToolCommand::new(&self.ctx.tools.apksigner)
            .arg("sign")
            .arg("--ks")
            .arg(&self.ctx.signing.keystore)
            .arg("--ks-pass")
            .arg(self.ctx.signing.password.to_string())
            .arg("--min-sdk-version")
            .arg(&self.ctx.manifest.min_sdk)
            .arg("--out")
            .arg(out.final_apk())
            .arg(out.aligned_apk())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeystorePassword;
    use crate::resources::tests::context;

    fn args(cmd: &ToolCommand) -> Vec<String> {
        cmd.get_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_sign_command() {
        let mut ctx = context();
        ctx.signing.password = KeystorePassword::Env("KS_PASS".into());

        assert_eq!(
            args(&Signer::new(&ctx).sign_command()),
            [
                "sign",
                "--ks",
                "/home/dev/.android/debug.keystore",
                "--ks-pass",
                "env:KS_PASS",
                "--min-sdk-version",
                "21",
                "--out",
                "target/android/app.apk",
                "target/android/intermediates/aligned.apk"
            ]
        );
    }

    #[test]
    fn test_generate_command() {
        let provider = KeystoreProvider::with_path("/jdk/bin/keytool", "/home/dev/.android/debug.keystore");
        let args = args(&provider.generate_command());
        assert_eq!(args[0], "-genkeypair");
        let alias = args.iter().position(|a| a == "-alias").unwrap();
        assert_eq!(args[alias + 1], "androiddebugkey");
        assert_eq!(args.last().unwrap(), "CN=Android Debug,O=Android,C=US");
    }

    #[tokio::test]
    async fn test_existing_keystore_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let keystore = dir.path().join("debug.keystore");
        std::fs::write(&keystore, b"jks").unwrap();

        // keytool does not exist, so generation would fail
        let provider = KeystoreProvider::with_path(dir.path().join("keytool"), &keystore);
        assert_eq!(provider.find_or_generate().await.unwrap(), keystore);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generate_creates_parent_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let keytool = dir.path().join("keytool");
        // writes the file named after -keystore
        std::fs::write(
            &keytool,
            "#!/bin/sh\nwhile [ \"$1\" != \"-keystore\" ]; do shift; done\necho jks > \"$2\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&keytool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let keystore = dir.path().join("home/.android/debug.keystore");
        let provider = KeystoreProvider::with_path(&keytool, &keystore);
        assert_eq!(provider.find_or_generate().await.unwrap(), keystore);
        assert!(keystore.is_file());
    }
}
