//! Lock registry against the real lock file and process table

#![cfg(unix)]

mod common;

use std::process::{Child, Command};

use common::{TestFixtures, TestHelpers};
use supervisor::{FileLockStore, LockRegistry, ProcessIdentity, SysinfoInspector};

fn registry(dir: &std::path::Path) -> LockRegistry<FileLockStore, SysinfoInspector> {
    LockRegistry::new(
        FileLockStore::new(TestHelpers::lock_path(dir)),
        SysinfoInspector::new(),
        ProcessIdentity::CommandContains(TestFixtures::MARKER.to_string()),
    )
}

fn spawn_fake_server() -> Child {
    Command::new("sh")
        .args(["-c", ": fake-server; sleep 5; exit 0"])
        .spawn()
        .unwrap()
}

#[tokio::test]
async fn test_lock_of_live_matching_process_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = spawn_fake_server();
    TestHelpers::write_lock(dir.path(), &server.id().to_string());

    let checked = registry(dir.path()).check().await;
    server.kill().unwrap();
    server.wait().unwrap();

    assert_eq!(checked.unwrap(), Some(server.id()));
    assert_eq!(TestHelpers::read_lock(dir.path()), Some(server.id().to_string()));
}

#[tokio::test]
async fn test_lock_of_live_foreign_process_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let mut other = Command::new("sleep").arg("30").spawn().unwrap();
    TestHelpers::write_lock(dir.path(), &other.id().to_string());

    let checked = registry(dir.path()).check().await;
    other.kill().unwrap();
    other.wait().unwrap();

    assert_eq!(checked.unwrap(), None);
    assert_eq!(TestHelpers::read_lock(dir.path()), None);
}

#[tokio::test]
async fn test_lock_of_dead_process_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    TestHelpers::write_lock(dir.path(), &TestHelpers::dead_pid().to_string());

    assert_eq!(registry(dir.path()).check().await.unwrap(), None);
    assert_eq!(TestHelpers::read_lock(dir.path()), None);
}

#[tokio::test]
async fn test_create_after_check_records_pid() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path());

    assert_eq!(registry.check().await.unwrap(), None);
    registry.create(4242).await.unwrap();
    assert_eq!(registry.recorded_pid().await.unwrap(), Some(4242));
    assert!(registry.create(4343).await.is_err());

    registry.delete().await.unwrap();
    assert_eq!(TestHelpers::read_lock(dir.path()), None);
}
