//! Host platform helpers

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Executable file name of an SDK or JDK tool on the current host.
///
/// The SDK ships `d8`, `apksigner` and `sdkmanager` as batch wrappers on
/// Windows, everything else as native executables.
pub fn exe_name(tool: &str) -> String {
    exe_name_for(tool, cfg!(windows))
}

fn exe_name_for(tool: &str, windows: bool) -> String {
    if !windows {
        return tool.to_string();
    }
    match tool {
        "d8" | "apksigner" | "sdkmanager" => format!("{}.bat", tool),
        _ => format!("{}.exe", tool),
    }
}

/// Current user's home directory
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Joins classpath entries with the host's path list separator
pub fn join_classpath<P: AsRef<Path>>(
    entries: &[P],
) -> Result<OsString, std::env::JoinPathsError> {
    std::env::join_paths(entries.iter().map(|p| p.as_ref()))
}

/// NDK prebuilt toolchain directory name for the current host
pub fn ndk_host_tag() -> &'static str {
    if cfg!(windows) {
        "windows-x86_64"
    } else if cfg!(target_os = "macos") {
        "darwin-x86_64"
    } else {
        "linux-x86_64"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exe_names_on_windows() {
        assert_eq!(exe_name_for("aapt2", true), "aapt2.exe");
        assert_eq!(exe_name_for("d8", true), "d8.bat");
        assert_eq!(exe_name_for("apksigner", true), "apksigner.bat");
        assert_eq!(exe_name_for("sdkmanager", true), "sdkmanager.bat");
        assert_eq!(exe_name_for("keytool", true), "keytool.exe");
    }

    #[test]
    fn test_exe_names_elsewhere() {
        assert_eq!(exe_name_for("d8", false), "d8");
        assert_eq!(exe_name_for("zipalign", false), "zipalign");
    }

    #[test]
    fn test_join_classpath() {
        let cp = join_classpath(&["a/android.jar", "b/R.jar"]).unwrap();
        let sep = if cfg!(windows) { ";" } else { ":" };
        assert_eq!(cp, OsString::from(format!("a/android.jar{}b/R.jar", sep)));
    }
}
