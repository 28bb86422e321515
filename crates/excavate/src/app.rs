use crate::discover::discover_artifacts;
use crate::error::ExcavateError;
use crate::git::Git;
use crate::metadata::BuildMetadata;
use crate::prune::{PruneOutcome, PrunePolicy, prune_cache};
use crate::report::Reporter;
use crate::store::{lock_save_dir, store_artifacts};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const SAVE_DIR_SUFFIX: &str = "_saved";
pub const DEFAULT_CACHE_SIZE: usize = 3;

#[derive(Debug, Clone)]
pub struct Options {
    pub work_dir: PathBuf,
    pub save_dir: PathBuf,
    pub keep_per_commit: usize,
    pub dry_run: bool,
    pub metadata: BuildMetadata,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub archive: PathBuf,
    pub artifacts: Vec<PathBuf>,
    pub prune: PruneOutcome,
}

/// `<work_dir>_saved`, ignoring any trailing separator on the work dir.
pub fn default_save_dir(work_dir: &Path) -> PathBuf {
    let mut raw: OsString = work_dir.components().collect::<PathBuf>().into_os_string();
    raw.push(SAVE_DIR_SUFFIX);
    PathBuf::from(raw)
}

pub fn run(options: &Options, reporter: &mut Reporter) -> Result<RunSummary, ExcavateError> {
    if options.dry_run {
        reporter.banner("Executing dry run...");
    }

    let git = Git::new(&options.work_dir);
    let name = options.metadata.archive_name();

    let artifacts = discover_artifacts(&git, reporter)?;

    let _lock = if options.dry_run {
        None
    } else {
        Some(lock_save_dir(&options.save_dir)?)
    };

    let archive = store_artifacts(
        &artifacts,
        &options.work_dir,
        &options.save_dir,
        &name,
        options.dry_run,
        reporter,
    )?;

    let tips = git.ref_tips()?;
    let prune = prune_cache(
        &options.save_dir,
        &tips,
        &name,
        PrunePolicy {
            keep_per_commit: options.keep_per_commit,
            dry_run: options.dry_run,
        },
        reporter,
    )?;

    if options.dry_run {
        reporter.banner("Dry run complete.");
    }

    Ok(RunSummary {
        archive,
        artifacts,
        prune,
    })
}
