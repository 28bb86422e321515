use crate::archive_name::{ArchiveName, UNKNOWN};
use std::path::Path;

const PROJECT_DIR_VARS: &[&str] = &["CI_PROJECT_DIR"];
const REF_NAME_VARS: &[&str] = &["CI_BUILD_REF_NAME", "CI_COMMIT_REF_NAME"];
const REF_HASH_VARS: &[&str] = &["CI_BUILD_REF", "CI_COMMIT_SHA"];
const BUILD_ID_VARS: &[&str] = &["CI_BUILD_ID", "CI_JOB_ID"];

/// Explicit values that win over the CI environment.
#[derive(Debug, Clone, Default)]
pub struct MetadataOverrides {
    pub project: Option<String>,
    pub ref_name: Option<String>,
    pub ref_hash: Option<String>,
    pub build_id: Option<String>,
}

/// The four fields an archive name is built from, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    pub project: String,
    pub ref_name: String,
    pub ref_hash: String,
    pub build_id: String,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

fn first_var(lookup: &dyn Fn(&str) -> Option<String>, vars: &[&str]) -> Option<String> {
    vars.iter().find_map(|name| non_empty(lookup(name)))
}

fn project_from_dir(dir: &str) -> Option<String> {
    let trimmed = dir.trim_end_matches(['/', '\\']);
    Path::new(trimmed)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
}

impl BuildMetadata {
    pub fn from_env(overrides: MetadataOverrides) -> Self {
        Self::resolve(overrides, &|name| std::env::var(name).ok())
    }

    pub fn resolve(overrides: MetadataOverrides, lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let project = non_empty(overrides.project)
            .or_else(|| first_var(lookup, PROJECT_DIR_VARS).and_then(|d| project_from_dir(&d)))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let ref_name = non_empty(overrides.ref_name)
            .or_else(|| first_var(lookup, REF_NAME_VARS))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let ref_hash = non_empty(overrides.ref_hash)
            .or_else(|| first_var(lookup, REF_HASH_VARS))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let build_id = non_empty(overrides.build_id)
            .or_else(|| first_var(lookup, BUILD_ID_VARS))
            .unwrap_or_else(|| UNKNOWN.to_string());
        Self {
            project,
            ref_name,
            ref_hash,
            build_id,
        }
    }

    pub fn archive_name(&self) -> ArchiveName {
        ArchiveName::new(&self.project, &self.ref_name, &self.ref_hash, &self.build_id)
    }
}
