use super::{EvictionReason, PrunePolicy, prune_cache};
use crate::archive_name::ArchiveName;
use crate::report::Reporter;
use crate::store::store_artifacts;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const TIP_A: &str = "abcdef1200000000000000000000000000000000";
const TIP_B: &str = "1234567800000000000000000000000000000000";
const STALE: &str = "deadbeef00000000000000000000000000000000";

fn touch(dir: &Path, name: &str) {
    fs::create_dir_all(dir).expect("mkdir save dir");
    fs::write(dir.join(name), b"").expect("write archive");
}

fn tips(hashes: &[&str]) -> BTreeSet<String> {
    hashes.iter().map(|h| h.to_string()).collect()
}

fn remaining(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .expect("read save dir")
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect()
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn policy(keep_per_commit: usize) -> PrunePolicy {
    PrunePolicy {
        keep_per_commit,
        dry_run: false,
    }
}

#[test]
fn keeps_highest_build_ids_per_commit() {
    let dir = tempdir().expect("temp dir");
    let save = dir.path();
    for id in [3, 10, 7, 1, 5] {
        touch(save, &format!("proj_main_abcdef12_{id}.tar.gz"));
    }
    let current = ArchiveName::new("proj", "main", TIP_A, "10");

    let outcome = prune_cache(save, &tips(&[TIP_A]), &current, policy(2), &mut Reporter::silent())
        .expect("prune ok");

    assert_eq!(
        remaining(save),
        names(&["proj_main_abcdef12_10.tar.gz", "proj_main_abcdef12_7.tar.gz"])
    );
    assert_eq!(outcome.evicted.len(), 3);
    assert!(
        outcome
            .evicted
            .iter()
            .all(|e| e.reason == EvictionReason::OverRetention)
    );
    assert_eq!(outcome.kept.len(), 2);
}

#[test]
fn current_archive_survives_even_when_oldest() {
    let dir = tempdir().expect("temp dir");
    let save = dir.path();
    for id in [1, 4, 5, 6] {
        touch(save, &format!("proj_main_abcdef12_{id}.tar.gz"));
    }
    let current = ArchiveName::new("proj", "main", TIP_A, "1");

    prune_cache(save, &tips(&[TIP_A]), &current, policy(2), &mut Reporter::silent())
        .expect("prune ok");

    assert_eq!(
        remaining(save),
        names(&[
            "proj_main_abcdef12_1.tar.gz",
            "proj_main_abcdef12_5.tar.gz",
            "proj_main_abcdef12_6.tar.gz",
        ])
    );
}

#[test]
fn retention_is_counted_per_commit_not_per_ref_name() {
    let dir = tempdir().expect("temp dir");
    let save = dir.path();
    touch(save, "proj_main_abcdef12_1.tar.gz");
    touch(save, "proj_release_abcdef12_2.tar.gz");
    touch(save, "proj_dev_12345678_3.tar.gz");
    touch(save, "proj_dev_12345678_4.tar.gz");
    let current = ArchiveName::new("proj", "dev", TIP_B, "4");

    prune_cache(
        save,
        &tips(&[TIP_A, TIP_B]),
        &current,
        policy(1),
        &mut Reporter::silent(),
    )
    .expect("prune ok");

    assert_eq!(
        remaining(save),
        names(&["proj_release_abcdef12_2.tar.gz", "proj_dev_12345678_4.tar.gz"])
    );
}

#[test]
fn orphan_sweep_removes_archives_of_vanished_refs() {
    let dir = tempdir().expect("temp dir");
    let save = dir.path();
    touch(save, "proj_main_abcdef12_8.tar.gz");
    touch(save, "proj_old_deadbeef_2.tar.gz");
    touch(save, "proj_old_deadbeef_3.tar.gz");
    let current = ArchiveName::new("proj", "main", TIP_A, "8");

    let outcome = prune_cache(save, &tips(&[TIP_A]), &current, policy(3), &mut Reporter::silent())
        .expect("prune ok");

    assert_eq!(remaining(save), names(&["proj_main_abcdef12_8.tar.gz"]));
    assert_eq!(outcome.evicted.len(), 2);
    assert!(
        outcome
            .evicted
            .iter()
            .all(|e| e.reason == EvictionReason::NotARefTip)
    );
}

#[test]
fn current_archive_is_kept_even_when_its_commit_is_not_a_tip() {
    let dir = tempdir().expect("temp dir");
    let save = dir.path();
    touch(save, "proj_detached_deadbeef_9.tar.gz");
    let current = ArchiveName::new("proj", "detached", STALE, "9");

    let outcome = prune_cache(save, &tips(&[TIP_A]), &current, policy(3), &mut Reporter::silent())
        .expect("prune ok");

    assert!(outcome.evicted.is_empty());
    assert_eq!(remaining(save), names(&["proj_detached_deadbeef_9.tar.gz"]));
}

#[test]
fn unparseable_build_ids_sort_last_and_fall_to_the_sweep() {
    let dir = tempdir().expect("temp dir");
    let save = dir.path();
    touch(save, "proj_main_abcdef12_<unknown>.tar.gz");
    touch(save, "proj_main_abcdef12_2.tar.gz");
    touch(save, "proj_main_abcdef12_3.tar.gz");
    let current = ArchiveName::new("proj", "main", TIP_A, "3");

    let outcome = prune_cache(save, &tips(&[TIP_A]), &current, policy(2), &mut Reporter::silent())
        .expect("prune ok");

    assert_eq!(
        remaining(save),
        names(&["proj_main_abcdef12_2.tar.gz", "proj_main_abcdef12_3.tar.gz"])
    );
    assert_eq!(outcome.evicted.len(), 1);
    assert_eq!(outcome.evicted[0].reason, EvictionReason::OverRetention);

    // With room to spare, the id-less archive survives pass one but has no
    // parseable commit, so the sweep takes it.
    touch(save, "proj_main_abcdef12_<unknown>.tar.gz");
    let outcome = prune_cache(save, &tips(&[TIP_A]), &current, policy(5), &mut Reporter::silent())
        .expect("prune ok");
    assert_eq!(outcome.evicted.len(), 1);
    assert_eq!(outcome.evicted[0].reason, EvictionReason::NotARefTip);
}

#[test]
fn other_projects_and_foreign_files_are_left_alone() {
    let dir = tempdir().expect("temp dir");
    let save = dir.path();
    touch(save, "proj_main_abcdef12_1.tar.gz");
    touch(save, "proj_main_abcdef12_2.tar.gz");
    touch(save, "other_main_abcdef12_1.tar.gz");
    touch(save, "other_gone_deadbeef_1.tar.gz");
    touch(save, ".excavate.lock");
    touch(save, "notes.txt");
    let current = ArchiveName::new("proj", "main", TIP_A, "2");

    prune_cache(save, &tips(&[TIP_A]), &current, policy(1), &mut Reporter::silent())
        .expect("prune ok");

    assert_eq!(
        remaining(save),
        names(&[
            "proj_main_abcdef12_2.tar.gz",
            "other_main_abcdef12_1.tar.gz",
            "other_gone_deadbeef_1.tar.gz",
            ".excavate.lock",
            "notes.txt",
        ])
    );
}

#[test]
fn zero_retention_keeps_only_the_current_archive() {
    let dir = tempdir().expect("temp dir");
    let save = dir.path();
    for id in [1, 2, 3] {
        touch(save, &format!("proj_main_abcdef12_{id}.tar.gz"));
    }
    let current = ArchiveName::new("proj", "main", TIP_A, "2");

    prune_cache(save, &tips(&[TIP_A]), &current, policy(0), &mut Reporter::silent())
        .expect("prune ok");

    assert_eq!(remaining(save), names(&["proj_main_abcdef12_2.tar.gz"]));
}

#[test]
fn tips_sharing_a_short_ref_are_processed_once() {
    let dir = tempdir().expect("temp dir");
    let save = dir.path();
    for id in [1, 2, 3] {
        touch(save, &format!("proj_main_abcdef12_{id}.tar.gz"));
    }
    let current = ArchiveName::new("proj", "main", TIP_A, "3");
    let twin = "abcdef12ffffffffffffffffffffffffffffffff";

    let outcome = prune_cache(
        save,
        &tips(&[TIP_A, twin]),
        &current,
        policy(2),
        &mut Reporter::silent(),
    )
    .expect("prune ok");

    assert_eq!(outcome.evicted.len(), 1);
    assert_eq!(remaining(save).len(), 2);
}

#[test]
fn dry_run_reports_the_same_decisions_without_deleting() {
    let dir = tempdir().expect("temp dir");
    let save = dir.path();
    for id in [1, 2, 3, 4] {
        touch(save, &format!("proj_main_abcdef12_{id}.tar.gz"));
    }
    touch(save, "proj_old_deadbeef_5.tar.gz");
    let current = ArchiveName::new("proj", "main", TIP_A, "4");
    let before = remaining(save);

    let dry = prune_cache(
        save,
        &tips(&[TIP_A]),
        &current,
        PrunePolicy {
            keep_per_commit: 2,
            dry_run: true,
        },
        &mut Reporter::silent(),
    )
    .expect("dry run ok");
    assert_eq!(remaining(save), before, "dry run must not delete");

    let real = prune_cache(save, &tips(&[TIP_A]), &current, policy(2), &mut Reporter::silent())
        .expect("prune ok");

    assert_eq!(dry.evicted, real.evicted);
    assert_eq!(dry.kept, real.kept);
    assert_eq!(real.evicted.len(), 3);
}

#[test]
fn missing_save_dir_is_an_empty_cache() {
    let dir = tempdir().expect("temp dir");
    let save = dir.path().join("never-created");
    let current = ArchiveName::new("proj", "main", TIP_A, "1");

    let outcome = prune_cache(&save, &tips(&[TIP_A]), &current, policy(3), &mut Reporter::silent())
        .expect("prune ok");

    assert!(outcome.evicted.is_empty());
    assert!(outcome.kept.is_empty());
    assert!(!save.exists());
}

#[test]
fn dry_run_counts_the_unwritten_current_archive() {
    let dir = tempdir().expect("temp dir");
    let work = dir.path().join("repo");
    let save = dir.path().join("repo_saved");
    fs::create_dir_all(&work).expect("mkdir work");
    fs::write(work.join("out.bin"), b"bin").expect("write artifact");
    for id in [1, 2, 3] {
        touch(&save, &format!("proj_main_abcdef12_{id}.tar.gz"));
    }
    let artifacts = vec![work.join("out.bin")];
    let current = ArchiveName::new("proj", "main", TIP_A, "4");

    let cycle = |dry_run: bool| {
        let mut reporter = Reporter::silent();
        store_artifacts(&artifacts, &work, &save, &current, dry_run, &mut reporter)
            .expect("store ok");
        prune_cache(
            &save,
            &tips(&[TIP_A]),
            &current,
            PrunePolicy {
                keep_per_commit: 3,
                dry_run,
            },
            &mut reporter,
        )
        .expect("prune ok")
    };

    let dry = cycle(true);
    assert!(!save.join(current.file_name()).exists());
    assert_eq!(remaining(&save).len(), 3, "dry run must not delete");

    let real = cycle(false);
    assert_eq!(dry, real);
    assert_eq!(real.evicted.len(), 1);
    assert_eq!(real.evicted[0].path, save.join("proj_main_abcdef12_1.tar.gz"));
    assert_eq!(
        remaining(&save),
        names(&[
            "proj_main_abcdef12_2.tar.gz",
            "proj_main_abcdef12_3.tar.gz",
            "proj_main_abcdef12_4.tar.gz",
        ])
    );
}
