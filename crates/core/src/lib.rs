//! droidpack core - shared types
//!
//! Error taxonomy, the subprocess runner used by every pipeline stage,
//! host-specific naming helpers and the per-user configuration file.

pub mod config;
pub mod error;
pub mod host;
pub mod process;

pub use config::{AndroidDefaults, UserConfig};
pub use error::{ConfigError, ErrorKind, ToolError};
pub use process::{ToolCommand, ToolOutput};

/// droidpack version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "droidpack";
