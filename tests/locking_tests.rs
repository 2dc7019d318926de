use assert_cmd::Command;
use fs2::FileExt;
use predicates::prelude::*;
use serial_test::serial;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::{Child, Stdio};
use tempfile::tempdir;

fn set_up_command(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("daybook").unwrap();
    cmd.env_clear()
        .env("HOME", data_dir)
        .env("DAYBOOK_DIR", data_dir)
        .env("DAYBOOK_EMBED_PROVIDER", "none");
    cmd
}

/// A guard that kills and reaps a child process if the test bails out early
struct ChildProcessGuard {
    child: Option<Child>,
}

impl ChildProcessGuard {
    fn wait_for_success(mut self) -> bool {
        let mut child = self.child.take().unwrap();
        child.wait().map(|status| status.success()).unwrap_or(false)
    }
}

impl Drop for ChildProcessGuard {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Ok(None) = child.try_wait() {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

#[test]
#[serial]
fn test_add_fails_while_table_is_locked() {
    let dir = tempdir().unwrap();
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(dir.path().join("diary.lock"))
        .unwrap();
    lock_file.try_lock_exclusive().unwrap();

    set_up_command(dir.path())
        .env("DAYBOOK_LOCK_TIMEOUT_MS", "200")
        .args(["add", "Blocked"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("being modified by another process"));

    assert!(!dir.path().join("diary.jsonl").exists());

    lock_file.unlock().unwrap();

    set_up_command(dir.path())
        .env("DAYBOOK_LOCK_TIMEOUT_MS", "200")
        .args(["add", "Unblocked"])
        .assert()
        .success();
}

#[test]
#[serial]
fn test_reads_do_not_need_the_lock() {
    let dir = tempdir().unwrap();
    set_up_command(dir.path()).args(["add", "Hello"]).assert().success();

    let lock_file = OpenOptions::new()
        .write(true)
        .open(dir.path().join("diary.lock"))
        .unwrap();
    lock_file.try_lock_exclusive().unwrap();

    set_up_command(dir.path())
        .env("DAYBOOK_LOCK_TIMEOUT_MS", "200")
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Number of entries: 1"));

    lock_file.unlock().unwrap();
}

#[test]
#[serial]
fn test_concurrent_adds_lose_nothing() {
    let dir = tempdir().unwrap();
    let binary = assert_cmd::cargo::cargo_bin("daybook");

    let children: Vec<ChildProcessGuard> = (0..6)
        .map(|i| {
            let child = std::process::Command::new(&binary)
                .env_clear()
                .env("HOME", dir.path())
                .env("DAYBOOK_DIR", dir.path())
                .env("DAYBOOK_EMBED_PROVIDER", "none")
                .args(["add", &format!("fragment-{}", i)])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .unwrap();
            ChildProcessGuard { child: Some(child) }
        })
        .collect();

    for guard in children {
        assert!(guard.wait_for_success());
    }

    let table = fs::read_to_string(dir.path().join("diary.jsonl")).unwrap();
    assert_eq!(table.lines().count(), 1);
    for i in 0..6 {
        assert!(table.contains(&format!("fragment-{}", i)));
    }
}
