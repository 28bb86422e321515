//! Archive cache eviction.
//!
//! Two passes over the save directory, both driven purely by file names:
//!
//! 1. For every distinct ref tip, keep the `keep_per_commit` archives with the
//!    highest build ids and evict the rest.
//! 2. Evict every remaining archive whose embedded commit is not a ref tip.
//!
//! The archive produced by the current run is never evicted. Lookups are
//! scoped to the current project so a shared save directory does not get
//! pruned across projects.

use crate::archive_name::{
    ArchiveName, build_id_of, lookup_pattern, parse_archive_file_name, short_ref,
};
use crate::error::ExcavateError;
use crate::report::Reporter;
use glob::Pattern;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrunePolicy {
    pub keep_per_commit: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// More than `keep_per_commit` newer archives exist for the same commit.
    OverRetention,
    /// The embedded commit is no longer (or never was) a ref tip.
    NotARefTip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eviction {
    pub path: PathBuf,
    pub reason: EvictionReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub evicted: Vec<Eviction>,
    pub kept: Vec<PathBuf>,
}

/// Sorted file names in `save_dir` matching `pattern`. A missing directory is
/// an empty cache. `assume_present` is listed when it matches the pattern even
/// if it is not on disk; dry runs use it for the archive they did not write.
fn list_archives(
    save_dir: &Path,
    pattern: &str,
    assume_present: Option<&str>,
) -> Result<Vec<String>, ExcavateError> {
    let matcher = Pattern::new(pattern).map_err(|e| ExcavateError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.msg.to_string(),
    })?;
    let read_err = |source: std::io::Error| ExcavateError::ReadSaveDir {
        path: save_dir.to_path_buf(),
        source,
    };

    let mut names = vec![];
    if let Some(name) = assume_present
        && matcher.matches(name)
    {
        names.push(name.to_string());
    }

    let entries = match fs::read_dir(save_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(read_err(e)),
    };

    for entry in entries {
        let entry = entry.map_err(read_err)?;
        if entry.file_type().map_err(read_err)?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if matcher.matches(&name) {
            names.push(name);
        }
    }
    names.sort();
    names.dedup();
    Ok(names)
}

struct Pruner<'a> {
    save_dir: &'a Path,
    policy: PrunePolicy,
    outcome: PruneOutcome,
    evicted_names: HashSet<String>,
}

impl Pruner<'_> {
    fn evict(
        &mut self,
        name: &str,
        reason: EvictionReason,
        reporter: &mut Reporter,
    ) -> Result<(), ExcavateError> {
        let path = self.save_dir.join(name);
        reporter.log(format!("Deleting {}", path.display()));
        tracing::info!(path = %path.display(), ?reason, dry_run = self.policy.dry_run, "evicting archive");
        if !self.policy.dry_run {
            fs::remove_file(&path).map_err(|source| ExcavateError::RemoveArchive {
                path: path.clone(),
                source,
            })?;
        }
        self.evicted_names.insert(name.to_string());
        self.outcome.evicted.push(Eviction { path, reason });
        Ok(())
    }
}

pub fn prune_cache(
    save_dir: &Path,
    ref_tips: &BTreeSet<String>,
    current: &ArchiveName,
    policy: PrunePolicy,
    reporter: &mut Reporter,
) -> Result<PruneOutcome, ExcavateError> {
    reporter.header("Cleaning out the archive cache...");

    let current_name = current.file_name();
    reporter.debug(format!(
        "Current archive: {} (commit {})",
        save_dir.join(&current_name).display(),
        current.short_ref()
    ));
    // A real run prunes after the current archive is written; a dry run has to
    // count it as present to reach the same decisions.
    let assume_present = policy.dry_run.then_some(current_name.as_str());

    // Tips sharing a short ref map to the same archives; visit each once.
    let tip_refs: BTreeSet<&str> = ref_tips.iter().map(|tip| short_ref(tip)).collect();

    let mut pruner = Pruner {
        save_dir,
        policy,
        outcome: PruneOutcome::default(),
        evicted_names: HashSet::new(),
    };

    for &tip in &tip_refs {
        reporter.debug(format!("Latest commit: {tip}"));

        // The glob can also hit a ref name that happens to contain the short
        // ref; the parsed commit field is authoritative.
        let mut archives: Vec<String> = list_archives(
            save_dir,
            &lookup_pattern(Some(current.project()), Some(tip)),
            assume_present,
        )?
        .into_iter()
        .filter(|name| parse_archive_file_name(name).is_none_or(|parsed| parsed.commit == tip))
        .collect();
        archives.sort_by_key(|name| Reverse(build_id_of(name)));

        for name in archives.iter().skip(policy.keep_per_commit) {
            if *name != current_name {
                pruner.evict(name, EvictionReason::OverRetention, reporter)?;
            }
        }
    }

    let all_archives = list_archives(
        save_dir,
        &lookup_pattern(Some(current.project()), None),
        assume_present,
    )?;
    for name in all_archives {
        if pruner.evicted_names.contains(&name) {
            continue;
        }
        let path = save_dir.join(&name);
        reporter.debug(format!("Archive: {}", path.display()));

        let commit = parse_archive_file_name(&name).map(|parsed| parsed.commit);
        reporter.debug(format!("Commit: {}", commit.as_deref().unwrap_or("")));

        let at_tip = commit
            .as_deref()
            .is_some_and(|commit| tip_refs.contains(commit));
        if name == current_name || at_tip {
            pruner.outcome.kept.push(path);
        } else {
            pruner.evict(&name, EvictionReason::NotARefTip, reporter)?;
        }
    }

    reporter.header("Archive cache cleaned.");
    Ok(pruner.outcome)
}

#[cfg(test)]
mod tests;
