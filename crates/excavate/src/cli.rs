use clap::Parser;
use excavate::app::{DEFAULT_CACHE_SIZE, Options, default_save_dir};
use excavate::metadata::{BuildMetadata, MetadataOverrides};
use excavate::report::{NORMAL, QUIET};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "excavate",
    version,
    about = "Excavates build artifacts from a project and stores them in compressed tarballs.",
    after_help = "Archive name fields default to the CI environment:\n  CI_PROJECT_DIR (basename), CI_BUILD_REF_NAME|CI_COMMIT_REF_NAME,\n  CI_BUILD_REF|CI_COMMIT_SHA, CI_BUILD_ID|CI_JOB_ID\nDiagnostic tracing: EXCAVATE_LOG=<filter> (e.g. debug)."
)]
pub(crate) struct Cli {
    /// Suppress output, ignoring verbosity level
    #[arg(short, long)]
    quiet: bool,

    /// Output verbosity level
    #[arg(
        short,
        long,
        default_value_t = NORMAL,
        value_parser = clap::value_parser!(u8).range(0..=2)
    )]
    verbosity: u8,

    /// Git working directory in which to perform excavation [default: current directory]
    #[arg(short = 'g', long = "git-directory")]
    git_directory: Option<PathBuf>,

    /// Directory in which to store excavated build artifacts [default: <git directory>_saved]
    #[arg(short = 's', long = "save-directory")]
    save_directory: Option<PathBuf>,

    /// Number of most recent builds per git ref for which to keep artifacts
    #[arg(short = 'c', long = "save-cache-size", default_value_t = DEFAULT_CACHE_SIZE)]
    save_cache_size: usize,

    /// Don't do anything, just print what would be done
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Project name used in the archive name
    #[arg(long)]
    project: Option<String>,

    /// Ref (branch or tag) name used in the archive name
    #[arg(long = "ref-name")]
    ref_name: Option<String>,

    /// Commit hash used in the archive name (truncated to 8 characters)
    #[arg(long = "ref")]
    ref_hash: Option<String>,

    /// Numeric build identifier used in the archive name
    #[arg(long = "build-id")]
    build_id: Option<String>,
}

impl Cli {
    pub(crate) fn verbosity(&self) -> u8 {
        if self.quiet { QUIET } else { self.verbosity }
    }

    pub(crate) fn into_options(self) -> std::io::Result<Options> {
        let work_dir = match self.git_directory {
            Some(dir) => std::path::absolute(dir)?,
            None => std::env::current_dir()?,
        };
        let save_dir = self
            .save_directory
            .unwrap_or_else(|| default_save_dir(&work_dir));
        let metadata = BuildMetadata::from_env(MetadataOverrides {
            project: self.project,
            ref_name: self.ref_name,
            ref_hash: self.ref_hash,
            build_id: self.build_id,
        });
        Ok(Options {
            work_dir,
            save_dir,
            keep_per_commit: self.save_cache_size,
            dry_run: self.dry_run,
            metadata,
        })
    }
}
