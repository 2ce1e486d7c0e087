//! Device Bridge
//!
//! Installs a built APK on a connected device or emulator, launches its main
//! activity and follows the app's log output.

pub mod adb;

pub use adb::AdbClient;

use droidpack_core::{ErrorKind, ToolError};

/// ADB errors
#[derive(Debug, thiserror::Error)]
pub enum AdbError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("{0} is not running on the device")]
    ProcessNotFound(String),
}

impl AdbError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ToolExecution
    }
}
