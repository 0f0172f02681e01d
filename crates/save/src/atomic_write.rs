//! Atomic file write using the write-rename pattern.
//!
//! Writes data to a temporary sibling file, calls `sync_all()` so the bytes
//! reach persistent storage, then renames over the final path. A crash
//! mid-write leaves the previous save file intact.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically writes `data` to `path`.
///
/// 1. Write to a `.tmp` sibling
/// 2. `sync_all()` to flush to disk
/// 3. `rename` over the final path (atomic on POSIX)
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut tmp_path = PathBuf::from(path);
    tmp_path.as_mut_os_string().push(".tmp");

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
