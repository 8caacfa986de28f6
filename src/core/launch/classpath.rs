// ─── Classpath Builder ───
// Orders the runtime classpath from a fetched dependency set.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::deps::DependencySet;
use crate::core::platform::classpath_separator;
use crate::core::version::VersionDescriptor;

/// Main archive first, then libraries in descriptor order.
///
/// Libraries still missing after the fetch phase are skipped; the skip is
/// only logged at `warn` when `debug` is set.
pub fn build_classpath(
    descriptor: &VersionDescriptor,
    set: &DependencySet,
    debug: bool,
) -> Vec<PathBuf> {
    let mut entries = Vec::with_capacity(descriptor.libraries.len() + 1);
    let mut seen = HashSet::new();

    if let Some(main) = set.main_archive() {
        let path = set.absolute_path(main);
        seen.insert(path.clone());
        entries.push(path);
    }

    for lib in &descriptor.libraries {
        let target = Path::new("libraries").join(&lib.target_path);
        match set.get(&target) {
            Some(artifact) if artifact.is_present() => {
                let path = set.absolute_path(artifact);
                if seen.insert(path.clone()) {
                    entries.push(path);
                }
            }
            _ if debug => warn!("Classpath entry missing, skipped: {}", lib.logical_name),
            _ => debug!("Classpath entry missing, skipped: {}", lib.logical_name),
        }
    }

    entries
}

pub fn join_classpath(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|p| path_str(p))
        .collect::<Vec<_>>()
        .join(classpath_separator())
}

/// Path as passed on the command line; Windows extended-length prefixes are
/// stripped because Java rejects them on the classpath.
pub fn path_str(path: &Path) -> String {
    let text = path.to_string_lossy().to_string();
    match text.strip_prefix(r"\\?\") {
        Some(stripped) if cfg!(target_os = "windows") => stripped.to_string(),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::{parse_descriptor, LibraryRef};

    fn descriptor_with(libs: &[&str]) -> VersionDescriptor {
        let mut d = parse_descriptor("1.20.1", r#"{"id": "1.20.1"}"#).unwrap();
        d.libraries = libs
            .iter()
            .map(|path| LibraryRef {
                logical_name: path.to_string(),
                target_path: PathBuf::from(path),
                source_url: format!("https://x/{path}"),
                platform_classifier: None,
                sha1: None,
                size: None,
            })
            .collect();
        d
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"jar").unwrap();
    }

    #[test]
    fn main_archive_first_then_present_libraries_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "versions/1.20.1/1.20.1.jar");
        touch(root, "libraries/z/z.jar");
        touch(root, "libraries/a/a.jar");

        let d = descriptor_with(&["z/z.jar", "missing/m.jar", "a/a.jar", "z/z.jar"]);
        let set = DependencySet::build(&d, root);
        let cp = build_classpath(&d, &set, false);

        assert_eq!(
            cp,
            vec![
                root.join("versions/1.20.1/1.20.1.jar"),
                root.join("libraries/z/z.jar"),
                root.join("libraries/a/a.jar"),
            ]
        );
        assert_eq!(build_classpath(&d, &set, true), cp);
    }

    #[test]
    fn join_uses_platform_separator() {
        let joined = join_classpath(&[PathBuf::from("a.jar"), PathBuf::from("b.jar")]);
        assert_eq!(joined, format!("a.jar{}b.jar", classpath_separator()));
    }
}
