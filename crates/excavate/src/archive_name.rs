//! Archive file names are the only record the cache keeps:
//! `{project}_{ref_name}_{short_ref}_{build_id}.tar.gz`.
//!
//! Formatting, glob lookup patterns and parsing all live here so the cache
//! pruner never has to know the layout.

use glob::Pattern;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

pub const UNKNOWN: &str = "<unknown>";
pub const SHORT_REF_LEN: usize = 8;
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

fn archive_file_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^.*_(?P<commit>[^_]+)_(?P<id>\d+)\.tar\.gz$").expect("static regex is valid")
    })
}

/// First eight characters of a commit hash; shorter input passes through.
pub fn short_ref(full: &str) -> &str {
    match full.char_indices().nth(SHORT_REF_LEN) {
        Some((idx, _)) => &full[..idx],
        None => full,
    }
}

// Branch names such as `feature/x` must not turn into subdirectories.
fn sanitize_field(raw: &str) -> String {
    raw.replace(['/', '\\'], "-")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    project: String,
    ref_name: String,
    short_ref: String,
    build_id: String,
}

impl ArchiveName {
    pub fn new(project: &str, ref_name: &str, ref_hash: &str, build_id: &str) -> Self {
        Self {
            project: sanitize_field(project),
            ref_name: sanitize_field(ref_name),
            short_ref: short_ref(ref_hash).to_string(),
            build_id: build_id.to_string(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn short_ref(&self) -> &str {
        &self.short_ref
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}{ARCHIVE_SUFFIX}",
            self.project, self.ref_name, self.short_ref, self.build_id
        )
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Glob over archive file names. `None` matches any value for that field;
/// literal values are escaped so names containing `[` or `*` stay literal.
pub fn lookup_pattern(project: Option<&str>, commit: Option<&str>) -> String {
    let project = project
        .map(|p| Pattern::escape(&sanitize_field(p)))
        .unwrap_or_else(|| "*".to_string());
    let commit = commit
        .map(|c| Pattern::escape(short_ref(c)))
        .unwrap_or_else(|| "*".to_string());
    format!("{project}_*_{commit}_*{ARCHIVE_SUFFIX}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArchive {
    pub commit: String,
    pub build_id: u64,
}

pub fn parse_archive_file_name(file_name: &str) -> Option<ParsedArchive> {
    let caps = archive_file_regex().captures(file_name)?;
    Some(ParsedArchive {
        commit: caps["commit"].to_string(),
        build_id: caps["id"].parse().unwrap_or(0),
    })
}

/// Build id embedded in a file name, 0 when missing or unparseable.
pub fn build_id_of(file_name: &str) -> u64 {
    parse_archive_file_name(file_name)
        .map(|p| p.build_id)
        .unwrap_or(0)
}
