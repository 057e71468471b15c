//! Atomic I/O operations with file locking

use crate::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Sidecar `.<name>.lock` next to `path`. It is never renamed, so every
/// writer locks the same inode.
fn lock_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.lock"))
}

/// Write content atomically to a file with locking.
///
/// The content goes to a uniquely named temp file in the target's
/// directory, which is synced and then renamed over the target. Writers
/// through this function hold an exclusive lock on the sidecar lock file
/// for the whole sequence, so they are serialized. The target itself is
/// never created empty: a failed write leaves it as it was.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let lock_path = lock_path(path);
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| Error::io(&lock_path, e))?;
    lock_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    // Same directory as the target so the rename stays on one filesystem
    let mut temp_file = NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_file.path(), e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| Error::io(temp_file.path(), e))?;

    // A failed persist drops the temp file, which deletes it
    temp_file
        .persist(path)
        .map_err(|e| Error::io(path, e.error))?;

    tracing::trace!(path = %path.display(), bytes = content.len(), "atomic write complete");
    // Lock released when lock_file is dropped
    Ok(())
}

/// Write text content to a file atomically.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Read the full text of a file under a shared lock.
///
/// Bytes that are not valid UTF-8 are decoded as ISO-8859-1, the legacy
/// encoding of properties files, so this never fails on encoding.
pub fn read_text(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    file.lock_shared().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    // Read through the locked handle to avoid a TOCTOU race
    let mut bytes = Vec::new();
    (&file)
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(path, e))?;

    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(path = %path.display(), "not UTF-8, decoding as ISO-8859-1");
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    })
}
