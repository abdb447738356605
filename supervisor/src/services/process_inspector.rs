//! OS process table access via sysinfo

use std::sync::{Mutex, PoisonError};
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, System, UpdateKind};

use crate::traits::{ProcessInspector, ProcessSnapshot};

/// Process inspector backed by the host's process table
pub struct SysinfoInspector {
    system: Mutex<System>,
}

impl SysinfoInspector {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessInspector for SysinfoInspector {
    fn snapshot(&self, pid: u32) -> Option<ProcessSnapshot> {
        let pid = Pid::from_u32(pid);
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);

        // Only refresh the one PID we care about; a full scan is expensive.
        // The command line is not part of the default refresh.
        let refresh = ProcessRefreshKind::new()
            .with_cmd(UpdateKind::Always)
            .with_exe(UpdateKind::Always);
        if !system.refresh_process_specifics(pid, refresh) {
            return None;
        }
        let process = system.process(pid)?;

        Some(ProcessSnapshot {
            pid: pid.as_u32(),
            name: process.name().to_string(),
            cmd: process.cmd().to_vec(),
            exe: process.exe().map(|exe| exe.to_path_buf()),
            zombie: matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_of_current_process() {
        let inspector = SysinfoInspector::new();
        let snapshot = inspector.snapshot(std::process::id()).expect("current process is visible");

        assert_eq!(snapshot.pid, std::process::id());
        assert!(!snapshot.zombie);
        assert!(!snapshot.name.is_empty());
        assert!(!snapshot.cmd.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_snapshot_carries_command_line() {
        let mut child = std::process::Command::new("sh")
            .args(["-c", ": fake-server; sleep 5; exit 0"])
            .spawn()
            .unwrap();

        let inspector = SysinfoInspector::new();
        let snapshot = inspector.snapshot(child.id());
        child.kill().unwrap();
        child.wait().unwrap();

        let snapshot = snapshot.expect("child is visible");
        assert_eq!(snapshot.cmd.first().map(String::as_str), Some("sh"));
        assert!(snapshot.command_line().contains("fake-server"), "cmd = {:?}", snapshot.cmd);
    }

    #[cfg(unix)]
    #[test]
    fn test_snapshot_of_reaped_process() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        let inspector = SysinfoInspector::new();
        assert!(inspector.snapshot(pid).is_none());
    }
}
