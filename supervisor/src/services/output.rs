//! Helpers for the server's output streams
//!
//! Standard output belongs to the launcher until the server is ready and is
//! then handed to the caller untouched. Standard error is never scanned, so
//! it is drained in the background to keep the server from blocking on a
//! full pipe.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::task::JoinHandle;

use shared::{supervisor_debug, supervisor_error, Component};

/// Buffered standard output of the server, positioned after the ready line
pub type ServerOutput = BufReader<ChildStdout>;

/// Consume the server's standard error, logging each line at debug level
pub fn spawn_stderr_drain(stderr: ChildStderr, pid: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Err(e) => {
                    supervisor_error!(Component::Supervisor, "Reading stderr of PID {} failed: {}", pid, e);
                    break;
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    supervisor_debug!(Component::Supervisor, "[{} stderr] {}", pid, line.trim_end());
                }
            }
        }
    })
}

/// Read the next output line, decoding invalid UTF-8 lossily
///
/// # Returns
/// `None` at end of stream
pub async fn next_line(output: &mut ServerOutput) -> std::io::Result<Option<String>> {
    let mut buf = Vec::new();
    if output.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf).trim_end_matches(['\r', '\n']).to_string()))
}
