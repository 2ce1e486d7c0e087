//! External tool invocation
//!
//! Every stage of the pipeline shells out to a JDK or Android SDK binary.
//! [`ToolCommand`] runs one to completion, logs the command line and turns a
//! non-zero exit into a [`ToolError`] that carries everything the process
//! printed.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::ToolError;

/// Captured output of a successful tool run
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        combine(&self.stdout, &self.stderr)
    }
}

fn combine(stdout: &str, stderr: &str) -> String {
    match (stdout.trim_end().is_empty(), stderr.trim_end().is_empty()) {
        (true, _) => stderr.to_string(),
        (false, true) => stdout.to_string(),
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr),
    }
}

/// A single external tool invocation
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Short tool name used in logs and errors, e.g. `aapt2`
    pub fn name(&self) -> String {
        self.program
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }

    /// The full command line as it would be typed in a shell
    pub fn command_line(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push('"');
                line.push_str(&arg);
                line.push('"');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run to completion, capturing stdout and stderr
    pub async fn output(&self) -> Result<ToolOutput, ToolError> {
        debug!("{}", self.command_line());

        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| self.spawn_error(source))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ToolError::Failed {
                tool: self.name(),
                command: self.command_line(),
                status: output.status,
                output: combine(&stdout, &stderr),
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }

    /// Run to completion with stdout and stderr attached to the console
    pub async fn status(&self) -> Result<(), ToolError> {
        debug!("{}", self.command_line());

        let status = self
            .command()
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| self.spawn_error(source))?;

        if !status.success() {
            return Err(ToolError::Failed {
                tool: self.name(),
                command: self.command_line(),
                status,
                output: String::new(),
            });
        }

        Ok(())
    }

    fn spawn_error(&self, source: std::io::Error) -> ToolError {
        ToolError::Spawn {
            tool: self.name(),
            program: self.program.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_spaces() {
        let cmd = ToolCommand::new("keytool")
            .args(["-dname", "CN=Android Debug,O=Android,C=US"])
            .arg("-v");
        assert_eq!(
            cmd.command_line(),
            "keytool -dname \"CN=Android Debug,O=Android,C=US\" -v"
        );
    }

    #[test]
    fn test_name_strips_extension() {
        assert_eq!(ToolCommand::new("/sdk/build-tools/33.0.2/d8.bat").name(), "d8");
        assert_eq!(ToolCommand::new("aapt2").name(), "aapt2");
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine("out\n", "err\n"), "out\nerr\n");
        assert_eq!(combine("", "err"), "err");
        assert_eq!(combine("out", ""), "out");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_tool_carries_combined_output() {
        let err = ToolCommand::new("/bin/sh")
            .args(["-c", "echo to-stdout; echo to-stderr 1>&2; exit 3"])
            .output()
            .await
            .unwrap_err();

        match &err {
            ToolError::Failed { tool, status, output, .. } => {
                assert_eq!(tool, "sh");
                assert_eq!(status.code(), Some(3));
                assert!(output.contains("to-stdout"));
                assert!(output.contains("to-stderr"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("to-stderr"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_tool_output() {
        let out = ToolCommand::new("/bin/sh")
            .args(["-c", "echo hello"])
            .output()
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = ToolCommand::new("/definitely/not/here/aapt2")
            .output()
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
        assert_eq!(err.tool(), "aapt2");
    }
}
