//! Scoped backup of a source file under trial.

use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Copies a file aside on creation and puts it back when dropped.
///
/// Whatever happens to the file while the guard lives (a patch applied, a
/// build that fails halfway, an early return), the original content is
/// restored and the backup copy removed.
#[derive(Debug)]
pub struct SourceBackup {
    original: PathBuf,
    backup: PathBuf,
    restored: bool,
}

impl SourceBackup {
    /// Copy `file` to `.<name>.tourniquet-orig` next to it.
    pub fn take(file: &Path) -> io::Result<Self> {
        let backup = backup_path(file)?;
        std::fs::copy(file, &backup)?;
        Ok(Self {
            original: file.to_path_buf(),
            backup,
            restored: false,
        })
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Put the original back now and drop the backup copy.
    pub fn restore(mut self) -> io::Result<()> {
        self.restore_in_place()
    }

    fn restore_in_place(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        std::fs::copy(&self.backup, &self.original)?;
        std::fs::remove_file(&self.backup)?;
        self.restored = true;
        Ok(())
    }
}

impl Drop for SourceBackup {
    fn drop(&mut self) {
        if let Err(e) = self.restore_in_place() {
            warn!(
                file = %self.original.display(),
                backup = %self.backup.display(),
                error = %e,
                "failed to restore source file"
            );
        }
    }
}

fn backup_path(file: &Path) -> io::Result<PathBuf> {
    let name = file.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", file.display()),
        )
    })?;
    let mut backup_name = std::ffi::OsString::from(".");
    backup_name.push(name);
    backup_name.push(".tourniquet-orig");
    Ok(file.with_file_name(backup_name))
}
