//! Test helpers for launching fake servers

use std::path::{Path, PathBuf};
use std::time::Duration;

use supervisor::{LaunchConfig, ProcessIdentity, Supervisor, SupervisorState};

use super::fixtures::TestFixtures;

pub struct TestHelpers;

impl TestHelpers {
    /// Launch configuration running `script` under `sh` inside `dir`
    pub fn config(dir: &Path, script: &str) -> LaunchConfig {
        LaunchConfig::new("sh")
            .with_args(["-c", script])
            .with_working_dir(dir)
            .with_identity(ProcessIdentity::CommandContains(TestFixtures::MARKER.to_string()))
            .with_startup_timeout(Some(Duration::from_secs(10)))
            .with_stop_timeout(Some(Duration::from_secs(10)))
    }

    pub fn lock_path(dir: &Path) -> PathBuf {
        dir.join("lock.pid")
    }

    /// Lock file contents, if any
    pub fn read_lock(dir: &Path) -> Option<String> {
        std::fs::read_to_string(Self::lock_path(dir)).ok()
    }

    pub fn write_lock(dir: &Path, contents: &str) {
        std::fs::write(Self::lock_path(dir), contents).unwrap();
    }

    /// PID of a process that has exited and been reaped
    pub fn dead_pid() -> u32 {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        pid
    }

    /// Poll `status()` until it reports OFF or the deadline passes
    pub async fn wait_until_off(server: &mut Supervisor) -> SupervisorState {
        for _ in 0..100 {
            let state = server.status();
            if state == SupervisorState::Off {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        server.status()
    }

    /// Poll until `path` has at least `lines` lines
    pub async fn wait_for_lines(path: &Path, lines: usize) -> Vec<String> {
        for _ in 0..100 {
            if let Ok(contents) = std::fs::read_to_string(path) {
                let found: Vec<String> = contents.lines().map(str::to_string).collect();
                if found.len() >= lines {
                    return found;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        std::fs::read_to_string(path)
            .map(|contents| contents.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
