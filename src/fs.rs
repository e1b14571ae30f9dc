//! File system primitives: crash-safe replace and timestamped backups.
//!
//! Every managed file is rewritten as a whole through [`write_atomic`], so
//! an observer sees either the previous complete content or the new one.

use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{Error, Result};

/// Mode for every file this crate writes (secrets live in them).
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Mode for directories created on demand.
pub const PRIVATE_DIR_MODE: u32 = 0o700;

/// Timestamp format embedded in backup file names.
const BACKUP_STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Upper bound on `-N` suffixes tried for one timestamp.
const MAX_BACKUP_ATTEMPTS: usize = 100;

/// Read a UTF-8 file, mapping "does not exist" to `None`.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| Error::malformed(path, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::read(path, e)),
    }
}

/// Replace `path` with `contents` via a hidden temp file in the same
/// directory, fsync, then rename.
///
/// On failure the destination is left exactly as it was and the temp file
/// is removed.
pub fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    write_atomic_with(path, contents, mode, |from, to| fs::rename(from, to))
}

fn write_atomic_with<R>(path: &Path, contents: &[u8], mode: u32, rename: R) -> Result<()>
where
    R: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let file_name = path.file_name().ok_or_else(|| {
        Error::write(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    let dir = parent_dir(path);
    create_private_dir(dir).map_err(|e| Error::write(dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name.to_string_lossy()))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| Error::write(path, e))?;

    tmp.write_all(contents).map_err(|e| Error::write(path, e))?;
    set_mode(tmp.path(), mode).map_err(|e| Error::write(path, e))?;
    tmp.as_file().sync_all().map_err(|e| Error::write(path, e))?;

    // Dropping the guard deletes the temp file if the rename fails.
    let tmp_path = tmp.into_temp_path();
    if let Err(e) = rename(&*tmp_path, path) {
        let _ = tmp_path.close();
        return Err(Error::write(path, e));
    }
    let _ = tmp_path.keep();

    tracing::debug!(path = %path.display(), bytes = contents.len(), "Replaced file");
    Ok(())
}

/// Copy `path` to `<name>.<YYYYMMDD-HHMMSS>.bak` beside it.
///
/// An existing backup is never overwritten. When the name is taken, a
/// counter is appended: `<name>.<stamp>-1.bak`, `<name>.<stamp>-2.bak`.
///
/// Returns `Ok(None)` when `path` does not exist. Any other failure is a
/// [`Error::WriteFailure`] and must abort the caller's write.
pub fn backup_file(path: &Path) -> Result<Option<PathBuf>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::write(path, e)),
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = Local::now().format(BACKUP_STAMP_FORMAT).to_string();
    let dir = parent_dir(path);

    for attempt in 0..MAX_BACKUP_ATTEMPTS {
        let backup = if attempt == 0 {
            dir.join(format!("{file_name}.{stamp}.bak"))
        } else {
            dir.join(format!("{file_name}.{stamp}-{attempt}.bak"))
        };
        match write_private(&backup, &bytes) {
            Ok(()) => {
                tracing::info!(
                    original = %path.display(),
                    backup = %backup.display(),
                    "Backed up file"
                );
                return Ok(Some(backup));
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(Error::write(&backup, e)),
        }
    }

    Err(Error::write(
        path,
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "no free backup name for this timestamp",
        ),
    ))
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(PRIVATE_FILE_MODE);
    }
    let mut file = options.open(path)?;
    if let Err(e) = file.write_all(contents).and_then(|()| file.sync_all()) {
        let _ = fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

pub(crate) fn create_private_dir(dir: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(PRIVATE_DIR_MODE);
    }
    builder.create(dir)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
