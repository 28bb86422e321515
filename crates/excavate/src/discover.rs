use crate::error::ExcavateError;
use crate::git::Git;
use crate::report::Reporter;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn would_remove_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*would\s+remove\s+(?P<path>.+?)\s*$").expect("static regex is valid")
    })
}

/// Decodes a C-style quoted path (`"dir/r\303\251sum\303\251.pdf"`) as git
/// prints it when `core.quotePath` is on. Anything else is returned as is.
fn unquote_path(raw: &str) -> PathBuf {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return PathBuf::from(raw);
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut rest = inner.as_bytes();
    while let Some((&b, tail)) = rest.split_first() {
        rest = tail;
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        let Some((&esc, tail)) = rest.split_first() else {
            bytes.push(b'\\');
            break;
        };
        rest = tail;
        match esc {
            b'a' => bytes.push(0x07),
            b'b' => bytes.push(0x08),
            b't' => bytes.push(b'\t'),
            b'n' => bytes.push(b'\n'),
            b'v' => bytes.push(0x0b),
            b'f' => bytes.push(0x0c),
            b'r' => bytes.push(b'\r'),
            b'0'..=b'7' => {
                let mut value = u32::from(esc - b'0');
                for _ in 0..2 {
                    match rest.split_first() {
                        Some((&d @ b'0'..=b'7', tail)) => {
                            value = value * 8 + u32::from(d - b'0');
                            rest = tail;
                        }
                        _ => break,
                    }
                }
                bytes.push((value & 0xff) as u8);
            }
            other => bytes.push(other),
        }
    }
    path_from_bytes(bytes)
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// Absolute artifact paths from `git clean -n` output, in first-seen order.
pub fn parse_untracked(work_dir: &Path, output: &str) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut artifacts = Vec::new();
    for caps in would_remove_regex().captures_iter(output) {
        let path = work_dir.join(unquote_path(&caps["path"]));
        if seen.insert(path.clone()) {
            artifacts.push(path);
        }
    }
    artifacts
}

pub fn discover_artifacts(git: &Git, reporter: &mut Reporter) -> Result<Vec<PathBuf>, ExcavateError> {
    let output = git.untracked_listing()?;

    reporter.header("Discovering artifacts...");
    let artifacts = parse_untracked(git.work_dir(), &output);
    for artifact in &artifacts {
        reporter.log(artifact.display());
    }
    tracing::debug!(count = artifacts.len(), "artifacts discovered");
    Ok(artifacts)
}
