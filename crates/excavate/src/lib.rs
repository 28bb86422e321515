//! Collects untracked build artifacts from a git working directory into a
//! gzip tarball and keeps the tarball cache pruned per ref.

pub mod app;
pub mod archive_name;
pub mod discover;
pub mod error;
pub mod git;
pub mod metadata;
pub mod prune;
pub mod report;
pub mod store;

pub use error::ExcavateError;
