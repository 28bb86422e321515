use std::path::PathBuf;
use std::process::ExitStatus;

#[derive(Debug, thiserror::Error)]
pub enum ExcavateError {
    #[error("failed to run git {args:?} in {dir}: {source}")]
    GitSpawn {
        dir: PathBuf,
        args: Vec<String>,
        source: std::io::Error,
    },
    #[error("git {args:?} returned non-zero exit status ({status}): {output}")]
    GitFailed {
        args: Vec<String>,
        status: ExitStatus,
        output: String,
    },
    #[error("failed to create save directory: {path}: {source}")]
    CreateSaveDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write archive: {path}: {source}")]
    WriteArchive {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to delete archive: {path}: {source}")]
    RemoveArchive {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read save directory: {path}: {source}")]
    ReadSaveDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid archive pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("failed to open lock file: {path}: {source}")]
    LockFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("save directory is locked by another excavate run: {path} ({message})")]
    SaveDirLocked { path: PathBuf, message: String },
}

impl ExcavateError {
    pub fn code(&self) -> &'static str {
        match self {
            ExcavateError::GitSpawn { .. } => "git.spawn_failed",
            ExcavateError::GitFailed { .. } => "git.failed",
            ExcavateError::CreateSaveDir { .. } => "store.create_dir_failed",
            ExcavateError::WriteArchive { .. } => "store.write_failed",
            ExcavateError::RemoveArchive { .. } => "prune.remove_failed",
            ExcavateError::ReadSaveDir { .. } => "prune.read_dir_failed",
            ExcavateError::InvalidPattern { .. } => "prune.invalid_pattern",
            ExcavateError::LockFile { .. } => "store.lock_open_failed",
            ExcavateError::SaveDirLocked { .. } => "store.locked",
        }
    }
}
