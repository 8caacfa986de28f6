// ─── Staged writes ───
// Files land next to their destination under a unique name and are renamed
// into place, so a reader never observes a partially written artifact.

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};

/// Unique sibling path used while `dest` is being written.
pub fn staging_path(dest: &Path) -> PathBuf {
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "artifact".to_string());
    dest.with_file_name(format!(".{}.{}.part", file_name, Uuid::new_v4().simple()))
}

/// Create the parent directory of `dest` if needed.
pub async fn ensure_parent(dest: &Path) -> LauncherResult<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    Ok(())
}

/// Rename a finished staging file over `dest`. Concurrent writers of the same
/// target converge on whichever rename lands last.
pub async fn commit(staged: &Path, dest: &Path) -> LauncherResult<()> {
    if let Err(e) = tokio::fs::rename(staged, dest).await {
        discard(staged).await;
        return Err(LauncherError::io(dest, e));
    }
    Ok(())
}

fn log_discard_error(staged: &Path, e: std::io::Error) {
    if e.kind() != std::io::ErrorKind::NotFound {
        debug!("Could not remove staging file {:?}: {}", staged, e);
    }
}

/// Best-effort removal of an abandoned staging file.
pub async fn discard(staged: &Path) {
    if let Err(e) = tokio::fs::remove_file(staged).await {
        log_discard_error(staged, e);
    }
}

/// Blocking counterpart of [`discard`].
pub fn discard_blocking(staged: &Path) {
    if let Err(e) = std::fs::remove_file(staged) {
        log_discard_error(staged, e);
    }
}

/// Write `bytes` to `dest` through a staging file.
pub async fn write_atomic(dest: &Path, bytes: &[u8]) -> LauncherResult<()> {
    ensure_parent(dest).await?;
    let staged = staging_path(dest);
    if let Err(e) = tokio::fs::write(&staged, bytes).await {
        discard(&staged).await;
        return Err(LauncherError::io(&staged, e));
    }
    commit(&staged, dest).await
}

/// Stream `reader` into `dest` through a staging file, for use on blocking
/// threads. Returns the number of bytes written. The staging file is removed
/// on any failure.
pub fn copy_atomic_blocking(reader: &mut impl Read, dest: &Path) -> LauncherResult<u64> {
    let staged = staging_path(dest);
    let written = std::fs::File::create(&staged)
        .and_then(|mut file| std::io::copy(reader, &mut file));
    let written = match written {
        Ok(n) => n,
        Err(e) => {
            discard_blocking(&staged);
            return Err(LauncherError::io(&staged, e));
        }
    };
    if let Err(e) = std::fs::rename(&staged, dest) {
        discard_blocking(&staged);
        return Err(LauncherError::io(dest, e));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_path_is_a_hidden_sibling() {
        let dest = Path::new("/store/libraries/a/b/lib-1.0.jar");
        let staged = staging_path(&dest);
        assert_eq!(staged.parent(), dest.parent());
        let name = staged.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(".lib-1.0.jar."));
        assert!(name.ends_with(".part"));
        assert_ne!(staging_path(&dest), staged);
    }

    #[tokio::test]
    async fn write_atomic_creates_parents_and_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("file.json");

        write_atomic(&dest, b"first").await.unwrap();
        write_atomic(&dest, b"second").await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"second");
        let leftovers: Vec<_> = std::fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    fn part_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".part"))
            .collect()
    }

    struct FailingReader {
        remaining: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.remaining == 0 {
                return Err(std::io::Error::other("truncated entry"));
            }
            let n = buf.len().min(self.remaining);
            buf[..n].fill(b'x');
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn copy_atomic_blocking_streams_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("libglfw.so");

        let written = copy_atomic_blocking(&mut &b"glfw"[..], &dest).unwrap();

        assert_eq!(written, 4);
        assert_eq!(std::fs::read(&dest).unwrap(), b"glfw");
        assert!(part_files(dir.path()).is_empty());
    }

    #[test]
    fn failed_copy_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("libglfw.so");

        let err = copy_atomic_blocking(&mut FailingReader { remaining: 10_000 }, &dest);

        assert!(err.is_err());
        assert!(!dest.exists());
        assert!(part_files(dir.path()).is_empty());
    }

    #[test]
    fn failed_rename_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory cannot be replaced by a file
        let dest = dir.path().join("occupied");
        std::fs::create_dir(&dest).unwrap();
        std::fs::write(dest.join("keep"), b"x").unwrap();

        assert!(copy_atomic_blocking(&mut &b"data"[..], &dest).is_err());
        assert!(part_files(dir.path()).is_empty());
    }
}
