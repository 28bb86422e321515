use crate::error::ExcavateError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

// Without quotePath=false git C-quotes any path with non-ASCII bytes.
const UNTRACKED_ARGS: &[&str] = &["-c", "core.quotePath=false", "clean", "-ndx"];
const REFS_ARGS: &[&str] = &["for-each-ref", "--format=%(objectname) %(*objectname)"];
const MIN_OBJECT_ID_LEN: usize = 7;

/// Thin wrapper over the `git` binary for one working directory.
#[derive(Debug, Clone)]
pub struct Git {
    work_dir: PathBuf,
}

impl Git {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn run(&self, args: &[&str]) -> Result<String, ExcavateError> {
        let owned_args = || args.iter().map(|a| a.to_string()).collect::<Vec<_>>();
        tracing::debug!(dir = %self.work_dir.display(), ?args, "running git");
        let out = Command::new("git")
            .current_dir(&self.work_dir)
            .args(args)
            .output()
            .map_err(|source| ExcavateError::GitSpawn {
                dir: self.work_dir.clone(),
                args: owned_args(),
                source,
            })?;
        if !out.status.success() {
            let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
            output.push_str(&String::from_utf8_lossy(&out.stderr));
            tracing::debug!(status = %out.status, ?args, "git failed");
            return Err(ExcavateError::GitFailed {
                args: owned_args(),
                status: out.status,
                output: output.trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }

    /// Dry-run listing of every untracked and ignored path.
    pub fn untracked_listing(&self) -> Result<String, ExcavateError> {
        self.run(UNTRACKED_ARGS)
    }

    /// One line per ref: the object it names and, for annotated tags, the
    /// commit it peels to.
    pub fn ref_listing(&self) -> Result<String, ExcavateError> {
        self.run(REFS_ARGS)
    }

    pub fn ref_tips(&self) -> Result<BTreeSet<String>, ExcavateError> {
        Ok(parse_ref_tips(&self.ref_listing()?))
    }
}

fn is_object_id(token: &str) -> bool {
    token.len() >= MIN_OBJECT_ID_LEN && token.chars().all(|c| c.is_ascii_hexdigit())
}

/// Collects object ids from `git for-each-ref` output, custom or default format.
pub fn parse_ref_tips(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .flat_map(|line| line.split_whitespace())
        .filter(|token| is_object_id(token))
        .map(str::to_ascii_lowercase)
        .collect()
}
