//! Filesystem helpers: crash-safe writes, JSON artifacts, recursive copy.
//!
//! Every committed file is written through [`atomic_write`]: bytes go to a
//! hidden sibling temp file, are synced, then renamed over the target and the
//! directory entry is synced. A crash at any point leaves either the old file
//! or the new one, never a mix.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::StorageError;

/// Atomically replace `path` with `bytes`.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let temp_path = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    sync_dir(parent)?;

    debug!(path = ?path, bytes = bytes.len(), "Committed file");
    Ok(())
}

/// Flush a directory's entries so a rename inside it survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), StorageError> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

/// Directories cannot be opened as files here; the rename is left to the OS.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), StorageError> {
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &bytes)
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Recursively copy the contents of `src` into `dst`, creating `dst` as needed
/// and overwriting files that already exist. Returns the number of files copied.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<usize, StorageError> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| StorageError::InvalidPath(entry.path().display().to_string()))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    debug!(src = ?src, dst = ?dst, files = copied, "Copied directory");
    Ok(copied)
}
