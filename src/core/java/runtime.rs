// ─── Java Runtime Discovery ───
// Locates a Java binary and reads its major version. The result is advisory:
// a mismatch with the descriptor's hint is logged, never enforced.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::java_exe;

/// Majors tried under `/usr/lib/jvm`, newest first.
const JVM_DIR_MAJORS: [u32; 8] = [25, 24, 23, 22, 21, 17, 11, 8];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaInstallation {
    pub path: PathBuf,
    pub version: String,
    pub major: u32,
}

/// Candidate binaries in lookup order: `JAVA_HOME`, then the distro JVM
/// directory (the hinted major first), then the distro default.
pub fn candidate_paths(java_home: Option<&Path>, hint_major: Option<u32>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = java_home {
        candidates.push(home.join("bin").join(java_exe()));
    }

    if cfg!(unix) {
        let jvm_root = Path::new("/usr/lib/jvm");
        let mut majors: Vec<u32> = hint_major.into_iter().collect();
        majors.extend(JVM_DIR_MAJORS.iter().copied().filter(|m| Some(*m) != hint_major));
        for major in majors {
            candidates.push(
                jvm_root
                    .join(format!("java-{major}-openjdk"))
                    .join("bin")
                    .join(java_exe()),
            );
        }
        candidates.push(jvm_root.join("default").join("bin").join(java_exe()));
    }

    candidates
}

/// Search a `PATH`-style variable for the Java executable.
pub fn find_in_path(path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .map(|dir| dir.join(java_exe()))
        .find(|candidate| candidate.is_file())
}

/// Locate a Java binary from the environment of this process.
pub fn find_java_binary(hint_major: Option<u32>) -> LauncherResult<PathBuf> {
    let java_home = std::env::var_os("JAVA_HOME").map(PathBuf::from);
    if let Some(found) = candidate_paths(java_home.as_deref(), hint_major)
        .into_iter()
        .find(|p| p.is_file())
    {
        debug!("Found Java at {:?}", found);
        return Ok(found);
    }

    std::env::var_os("PATH")
        .and_then(|path| find_in_path(&path))
        .ok_or(LauncherError::JavaNotFound)
}

/// Run `java -version` and parse the reported version.
pub async fn inspect_java(path: &Path) -> Option<JavaInstallation> {
    let output = tokio::process::Command::new(path)
        .arg("-version")
        .output()
        .await
        .ok()?;

    // `-version` prints to stderr on most vendors
    let version_output = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    debug!(
        "Probing {:?}: {}",
        path,
        version_output.lines().next().unwrap_or("")
    );

    let version = parse_version_string(&version_output)?;
    Some(JavaInstallation {
        path: path.to_path_buf(),
        major: parse_major_version(&version),
        version,
    })
}

/// First quoted token, e.g. `17.0.9` from `openjdk version "17.0.9" 2023-10-17`.
fn parse_version_string(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let start = line.find('"')?;
        let end = line[start + 1..].find('"')?;
        Some(line[start + 1..start + 1 + end].to_string())
    })
}

/// `1.8.0_392` → 8, `17.0.9` → 17, `21` → 21.
pub fn parse_major_version(version: &str) -> u32 {
    let first_part = version.split(['.', '-', '+', '_']).next().unwrap_or("0");
    let major: u32 = first_part.parse().unwrap_or(0);

    if major == 1 {
        version
            .split('.')
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(major)
    } else {
        major
    }
}
