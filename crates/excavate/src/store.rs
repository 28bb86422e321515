use crate::archive_name::ArchiveName;
use crate::error::ExcavateError;
use crate::report::Reporter;
use flate2::{Compression, write::GzEncoder};
use fs4::fs_std::FileExt;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const LOCK_FILE_NAME: &str = ".excavate.lock";

/// Exclusive hold on a save directory; released on drop.
pub struct SaveDirLock {
    file: fs::File,
}

impl Drop for SaveDirLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

pub fn lock_save_dir(save_dir: &Path) -> Result<SaveDirLock, ExcavateError> {
    fs::create_dir_all(save_dir).map_err(|source| ExcavateError::CreateSaveDir {
        path: save_dir.to_path_buf(),
        source,
    })?;
    let lock_path = save_dir.join(LOCK_FILE_NAME);
    let file = fs::OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|source| ExcavateError::LockFile {
            path: lock_path.clone(),
            source,
        })?;
    file.try_lock_exclusive()
        .map_err(|e| ExcavateError::SaveDirLocked {
            path: lock_path.clone(),
            message: e.to_string(),
        })?;
    Ok(SaveDirLock { file })
}

/// Name an artifact gets inside the tarball: relative to the work dir, with
/// no root, prefix or trailing separator.
pub fn archive_entry_name(work_dir: &Path, artifact: &Path) -> PathBuf {
    let rel = artifact.strip_prefix(work_dir).unwrap_or(artifact);
    rel.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

#[cfg(unix)]
fn make_world_readable(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn make_world_readable(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

fn write_archive(
    artifacts: &[PathBuf],
    work_dir: &Path,
    save_dir: &Path,
    archive_path: &Path,
    reporter: &mut Reporter,
) -> Result<(), ExcavateError> {
    let write_err = |source: std::io::Error| ExcavateError::WriteArchive {
        path: archive_path.to_path_buf(),
        source,
    };

    // Stream into a scratch file so an aborted run never leaves a truncated
    // archive under a name the pruner would trust.
    let tmp = tempfile::Builder::new()
        .prefix(".excavate-")
        .suffix(".partial")
        .tempfile_in(save_dir)
        .map_err(write_err)?;

    let mut tar = tar::Builder::new(GzEncoder::new(tmp, Compression::default()));
    tar.follow_symlinks(false);

    for artifact in artifacts {
        let entry = archive_entry_name(work_dir, artifact);
        if entry.as_os_str().is_empty() {
            tracing::warn!(artifact = %artifact.display(), "skipping artifact with empty entry name");
            continue;
        }
        reporter.log(entry.display());
        let meta = fs::symlink_metadata(artifact).map_err(write_err)?;
        if meta.is_dir() {
            tar.append_dir_all(&entry, artifact).map_err(write_err)?;
        } else {
            tar.append_path_with_name(artifact, &entry)
                .map_err(write_err)?;
        }
    }

    let encoder = tar.into_inner().map_err(write_err)?;
    let tmp = encoder.finish().map_err(write_err)?;
    make_world_readable(tmp.as_file()).map_err(write_err)?;
    tmp.persist(archive_path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Packs `artifacts` into `<save_dir>/<name>` and returns that path. In dry-run
/// mode the entry names and target path are reported but nothing is written.
pub fn store_artifacts(
    artifacts: &[PathBuf],
    work_dir: &Path,
    save_dir: &Path,
    name: &ArchiveName,
    dry_run: bool,
    reporter: &mut Reporter,
) -> Result<PathBuf, ExcavateError> {
    let archive_path = save_dir.join(name.file_name());
    reporter.debug(format!("Generated archive name: {name}"));

    if !dry_run {
        fs::create_dir_all(save_dir).map_err(|source| ExcavateError::CreateSaveDir {
            path: save_dir.to_path_buf(),
            source,
        })?;
    }

    reporter.header("Building archive...");
    if dry_run {
        for artifact in artifacts {
            reporter.log(archive_entry_name(work_dir, artifact).display());
        }
    } else {
        write_archive(artifacts, work_dir, save_dir, &archive_path, reporter)?;
    }
    reporter.header("Archive built.");
    reporter.log(archive_path.display());
    tracing::debug!(path = %archive_path.display(), dry_run, "archive stored");
    Ok(archive_path)
}
