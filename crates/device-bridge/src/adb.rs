//! ADB (Android Debug Bridge) Client

use std::path::{Path, PathBuf};

use droidpack_core::{ToolCommand, ToolError};
use tracing::info;

use crate::AdbError;

/// ADB Client
#[derive(Debug, Clone)]
pub struct AdbClient {
    adb: PathBuf,
    serial: Option<String>,
}

impl AdbClient {
    /// Client for the `adb` binary at `adb`, usually `<sdk>/platform-tools/adb`
    pub fn new(adb: impl Into<PathBuf>) -> Self {
        Self {
            adb: adb.into(),
            serial: None,
        }
    }

    /// Target one device when several are connected
    pub fn with_serial(mut self, serial: Option<String>) -> Self {
        self.serial = serial;
        self
    }

    pub fn adb(&self) -> &Path {
        &self.adb
    }

    fn command(&self) -> ToolCommand {
        let cmd = ToolCommand::new(&self.adb);
        match &self.serial {
            Some(serial) => cmd.arg("-s").arg(serial),
            None => cmd,
        }
    }

    /// `adb install -r <apk>`
    pub async fn install(&self, apk: &Path) -> Result<(), AdbError> {
        info!("Installing {}", apk.display());
        self.command()
            .arg("install")
            .arg("-r")
            .arg(apk)
            .status()
            .await?;
        Ok(())
    }

    /// `adb shell am start -W -n <component>`, waiting for the launch
    pub async fn start_activity(&self, component: &str) -> Result<(), AdbError> {
        info!("Starting {}", component);
        self.command()
            .args(["shell", "am", "start", "-W", "-n", component])
            .status()
            .await?;
        Ok(())
    }

    /// First pid reported by `adb shell pidof <package>`
    pub async fn pidof(&self, package: &str) -> Result<String, AdbError> {
        let output = match self.command().args(["shell", "pidof", package]).output().await {
            Ok(output) => output.stdout,
            // pidof exits non-zero without output when nothing matches
            Err(ToolError::Failed { output, .. }) if output.trim().is_empty() => String::new(),
            Err(e) => return Err(e.into()),
        };

        parse_pid(&output).ok_or_else(|| AdbError::ProcessNotFound(package.to_string()))
    }

    /// Stream `adb logcat --pid <pid>` to the console until it exits
    pub async fn logcat(&self, pid: &str) -> Result<(), AdbError> {
        self.command()
            .args(["logcat", "--pid", pid])
            .status()
            .await?;
        Ok(())
    }
}

fn parse_pid(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .next()
        .filter(|pid| pid.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}
