//! Small filesystem helpers shared by both stores.

use crate::error::Result;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Writes data atomically using temp file + rename.
///
/// The parent directory is created if missing. A leftover `.tmp` sibling
/// from an interrupted write is simply overwritten.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");

    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;
    sync_parent(path);

    Ok(())
}

/// Writes a file that must not exist yet.
///
/// Fails with `AlreadyExists` instead of replacing another file. A failed
/// write removes the partially written file.
pub(crate) fn write_new(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    if let Err(e) = file.write_all(data).and_then(|()| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(e.into());
    }
    sync_parent(path);

    Ok(())
}

/// fsyncs the parent directory so a rename survives a crash (Unix only).
pub(crate) fn sync_parent(path: &Path) {
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent() {
            match File::open(parent) {
                Ok(dir_file) => {
                    if let Err(e) = dir_file.sync_all() {
                        warn!("Failed to fsync {}: {}", parent.display(), e);
                    }
                }
                Err(e) => warn!("Failed to open {} for fsync: {}", parent.display(), e),
            }
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}
