//! Vault file IO primitives.
//!
//! The goals of this module are:
//! - Restrictive permissions (0600 files, 0700 directories).
//! - Crash-safe writes via the write-temp, fsync, atomic-rename pattern.
//! - File handles scoped to a single call, closed on every exit path.
//!
//! Payloads are opaque here; callers own encryption.

use crate::vault::codec::{BlockReader, BlockWriter, CodecError};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Error)]
pub enum VaultIoError {
    #[error("io error")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("path has no parent directory")]
    NoParentDir,
}

impl VaultIoError {
    pub fn is_not_found(&self) -> bool {
        match self {
            VaultIoError::Io(err) | VaultIoError::Codec(CodecError::Io(err)) => {
                err.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

/// Read every block stored in `path`.
pub fn read_blocks(path: &Path) -> Result<Vec<Vec<u8>>, VaultIoError> {
    Ok(BlockReader::open(path)?.read_all()?)
}

/// Replace `path` with a file holding exactly `blocks`.
pub fn write_blocks_atomic(path: &Path, blocks: &[&[u8]]) -> Result<(), VaultIoError> {
    let dir = path.parent().ok_or(VaultIoError::NoParentDir)?;
    let tmp = stage_blocks(path, blocks)?;
    let _persisted = tmp.persist(path).map_err(io::Error::from)?;
    fsync_dir(dir)?;
    Ok(())
}

/// Replace several files as one unit.
///
/// Every replacement is written and synced next to its target before any
/// target changes, so a failure while writing leaves all targets as they
/// were. If a rename fails after earlier ones landed, those targets get
/// their previous contents back.
pub fn write_files_atomic(files: &[(&Path, &[&[u8]])]) -> Result<(), VaultIoError> {
    let mut staged = Vec::with_capacity(files.len());
    for &(path, blocks) in files {
        let previous = match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };
        staged.push((path, stage_blocks(path, blocks)?, previous));
    }

    let mut replaced = Vec::with_capacity(staged.len());
    for (path, tmp, previous) in staged {
        if let Err(err) = tmp.persist(path) {
            restore(&replaced);
            return Err(io::Error::from(err).into());
        }
        replaced.push((path, previous));
    }

    for (path, _) in &replaced {
        fsync_dir(path.parent().ok_or(VaultIoError::NoParentDir)?)?;
    }
    Ok(())
}

/// Put back the contents `write_files_atomic` replaced; targets that did
/// not exist before are removed.
fn restore(replaced: &[(&Path, Option<Vec<u8>>)]) {
    for (path, previous) in replaced.iter().rev() {
        let result = match previous {
            Some(bytes) => stage(path, |file| Ok(file.write_all(bytes)?))
                .and_then(|tmp| Ok(tmp.persist(path).map_err(io::Error::from)?))
                .map(drop),
            None => fs::remove_file(path).map_err(VaultIoError::from),
        };
        match result {
            Ok(()) => tracing::debug!(path = %path.display(), "restored file after failed replace"),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "couldn't restore file after failed replace")
            }
        }
    }
}

fn stage_blocks(path: &Path, blocks: &[&[u8]]) -> Result<NamedTempFile, VaultIoError> {
    stage(path, |file| {
        let mut writer = BlockWriter::new(file);
        for block in blocks {
            writer.write_block(block)?;
        }
        writer.flush()?;
        Ok(())
    })
}

/// Write a synced, owner-only temp file in the directory of `path`.
fn stage(
    path: &Path,
    contents: impl FnOnce(&mut File) -> Result<(), VaultIoError>,
) -> Result<NamedTempFile, VaultIoError> {
    let dir = path.parent().ok_or(VaultIoError::NoParentDir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    contents(tmp.as_file_mut())?;
    tmp.as_file_mut().sync_all()?;

    #[cfg(unix)]
    tmp.as_file()
        .set_permissions(fs::Permissions::from_mode(0o600))?;

    Ok(tmp)
}

/// Create `dir` (not its parents) with owner-only permissions.
///
/// `AlreadyExists` is returned unchanged so callers can tell it apart.
pub fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir(dir)?;
    #[cfg(unix)]
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

pub fn ensure_root(root: &Path) -> io::Result<()> {
    fs::create_dir_all(root)
}

/// Remove a file or a whole directory tree.
pub fn remove_path(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// List the regular, non-hidden files of `dir`.
///
/// Hidden names are skipped: entry names never start with `.`, while
/// interrupted atomic writes can leave `.tmp*` files behind.
pub fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            tracing::warn!(path = %entry.path().display(), "skipping hidden file in entry directory");
            continue;
        }
        if !entry.file_type()?.is_file() {
            tracing::warn!(path = %entry.path().display(), "skipping non-file in entry directory");
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

fn fsync_dir(dir: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        let file = File::open(dir)?;
        file.sync_all()?;
    }
    #[cfg(not(unix))]
    let _ = dir;
    Ok(())
}
