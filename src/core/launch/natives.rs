// ─── Native Extractor ───
// Unpacks platform shared libraries from native-classified archives into one
// flat directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::downloader::staging;
use crate::core::error::{LauncherError, LauncherResult};

const NATIVE_SUFFIXES: [&str; 4] = [".so", ".dll", ".dylib", ".jnilib"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionFailure {
    pub archive: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub output_dir: PathBuf,
    /// File names written, in extraction order (may repeat across archives).
    pub extracted: Vec<String>,
    pub failures: Vec<ExtractionFailure>,
}

fn is_native_entry(name: &str) -> bool {
    !name.starts_with("META-INF/") && NATIVE_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Extract one archive. Directory structure inside the archive is dropped;
/// a same-named file already in `output_dir` is overwritten.
pub fn extract_archive(archive_path: &Path, output_dir: &Path) -> LauncherResult<Vec<String>> {
    let failed = |reason: String| LauncherError::ExtractionFailed {
        archive: archive_path.to_path_buf(),
        reason,
    };

    let file = std::fs::File::open(archive_path).map_err(|e| failed(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| failed(e.to_string()))?;
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| failed(e.to_string()))?;
        if entry.is_dir() || !is_native_entry(entry.name()) {
            continue;
        }
        let Some(file_name) = Path::new(entry.name())
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
        else {
            continue;
        };

        // declared sizes are untrusted; stream instead of pre-allocating
        let dest = output_dir.join(&file_name);
        staging::copy_atomic_blocking(&mut entry, &dest)
            .map_err(|e| failed(format!("{file_name}: {e}")))?;
        debug!("Extracted native: {}", file_name);
        extracted.push(file_name);
    }

    Ok(extracted)
}

/// Extract every archive into `output_dir`. A broken archive is recorded in
/// the report and does not stop the others; only failing to create the
/// output directory is an error.
pub async fn extract_natives(
    archives: &[PathBuf],
    output_dir: &Path,
) -> LauncherResult<ExtractionReport> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| LauncherError::io(output_dir, e))?;

    let mut report = ExtractionReport {
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    };

    for archive in archives {
        let archive_path = archive.clone();
        let dest_dir = output_dir.to_path_buf();
        let outcome = tokio::task::spawn_blocking(move || extract_archive(&archive_path, &dest_dir))
            .await
            .map_err(|e| format!("Task join error: {}", e))
            .and_then(|result| result.map_err(|e| e.to_string()));

        match outcome {
            Ok(names) => report.extracted.extend(names),
            Err(reason) => {
                warn!("Cannot extract natives from {:?}: {}", archive, reason);
                report.failures.push(ExtractionFailure {
                    archive: archive.clone(),
                    reason,
                });
            }
        }
    }

    info!(
        "Extracted {} native files from {} archives into {:?}",
        report.extracted.len(),
        archives.len(),
        output_dir
    );
    Ok(report)
}
