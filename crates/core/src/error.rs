//! Error types for droidpack
//!
//! Every crate in the workspace keeps its own error enum and maps it onto
//! [`ErrorKind`] so callers can tell configuration problems from tool
//! failures without matching on crate-specific variants.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Broad failure category shared by all droidpack errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or invalid environment, license state or toolchain home
    Configuration,
    /// An SDK component could not be found or installed
    Resolution,
    /// Manifest, build file or package index is malformed or incomplete
    Parse,
    /// An external process exited unsuccessfully
    ToolExecution,
    /// Filesystem or archive I/O failed
    Filesystem,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Resolution => "resolution error",
            ErrorKind::Parse => "parse error",
            ErrorKind::ToolExecution => "tool execution error",
            ErrorKind::Filesystem => "filesystem error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of an external tool invocation
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unable to start {tool} ({}): {source}", .program.display())]
    Spawn {
        tool: String,
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed with {status}\ncommand: {command}\n{output}")]
    Failed {
        tool: String,
        command: String,
        status: ExitStatus,
        /// Captured stdout followed by stderr
        output: String,
    },
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ToolExecution
    }

    /// Name of the tool that failed
    pub fn tool(&self) -> &str {
        match self {
            ToolError::Spawn { tool, .. } | ToolError::Failed { tool, .. } => tool,
        }
    }

    /// Combined output of the failed process, empty when it never started
    pub fn output(&self) -> &str {
        match self {
            ToolError::Spawn { .. } => "",
            ToolError::Failed { output, .. } => output,
        }
    }
}

/// Errors loading the per-user configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}
