//! Readiness detection over the server's startup output

use regex::Regex;

use crate::error::{SupervisorError, SupervisorResult};

/// Line printed by the server once startup completed, e.g. `Done (12.345s)!`
pub const DEFAULT_READY_PATTERN: &str = r"Done \(.*\)!";

/// Matches decoded output lines against the readiness pattern
#[derive(Debug, Clone)]
pub struct ReadinessMatcher {
    regex: Regex,
}

impl ReadinessMatcher {
    pub fn new(pattern: &str) -> SupervisorResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| SupervisorError::config(format!("invalid ready pattern {pattern:?}: {e}")))?;
        Ok(Self { regex })
    }

    /// Whether the line signals a completed startup
    ///
    /// The text between the parentheses is not validated.
    pub fn is_ready(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

impl Default for ReadinessMatcher {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_READY_PATTERN).expect("default ready pattern is valid"),
        }
    }
}

/// Running state of one startup scan
#[derive(Debug)]
pub struct StartupScan<'a> {
    matcher: &'a ReadinessMatcher,
    last_line: String,
    lines_seen: usize,
}

impl<'a> StartupScan<'a> {
    pub fn new(matcher: &'a ReadinessMatcher) -> Self {
        Self {
            matcher,
            last_line: String::new(),
            lines_seen: 0,
        }
    }

    /// Feed one raw output line (with or without its terminator)
    ///
    /// Bytes that are not valid UTF-8 are replaced, so garbled output is
    /// treated as ordinary non-matching text.
    pub fn observe(&mut self, raw: &[u8]) -> bool {
        self.lines_seen += 1;
        let text = String::from_utf8_lossy(raw);
        let line = text.trim();
        if line.is_empty() {
            return false;
        }
        self.last_line = line.to_string();
        self.matcher.is_ready(line)
    }

    /// Last non-empty line observed, trimmed
    pub fn last_line(&self) -> &str {
        &self.last_line
    }

    pub fn lines_seen(&self) -> usize {
        self.lines_seen
    }

    pub fn into_last_line(self) -> String {
        self.last_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_done_line() {
        let matcher = ReadinessMatcher::default();
        assert!(matcher.is_ready("Done (12.345s)! For help, type \"help\""));
        assert!(matcher.is_ready("[12:00:01] [Server thread/INFO]: Done (3.2s)!"));
        assert!(matcher.is_ready("Done ()!"));
    }

    #[test]
    fn test_rejects_partial_wording() {
        let matcher = ReadinessMatcher::default();
        assert!(!matcher.is_ready("Done!"));
        assert!(!matcher.is_ready("Done (12.345s)"));
        assert!(!matcher.is_ready("Preparing spawn area: 83%"));
        assert!(!matcher.is_ready(""));
    }

    #[test]
    fn test_invalid_custom_pattern() {
        let err = ReadinessMatcher::new("Done (").unwrap_err();
        assert!(matches!(err, SupervisorError::ConfigurationError { .. }));
    }

    #[test]
    fn test_custom_pattern() {
        let matcher = ReadinessMatcher::new(r"^listening on \d+$").unwrap();
        assert!(matcher.is_ready("listening on 25565"));
        assert!(!matcher.is_ready("Done (1s)!"));
        assert_eq!(matcher.pattern(), r"^listening on \d+$");
    }

    #[test]
    fn test_scan_matches_on_third_line() {
        let matcher = ReadinessMatcher::default();
        let mut scan = StartupScan::new(&matcher);
        assert!(!scan.observe(b"Starting minecraft server version 1.12.2\n"));
        assert!(!scan.observe(b"Preparing level \"world\"\n"));
        assert!(scan.observe(b"Done (12.345s)! For help, type \"help\"\n"));
        assert_eq!(scan.lines_seen(), 3);
    }

    #[test]
    fn test_scan_keeps_last_non_empty_line() {
        let matcher = ReadinessMatcher::default();
        let mut scan = StartupScan::new(&matcher);
        scan.observe(b"  Loading libraries  \n");
        scan.observe(b"\n");
        scan.observe(b"   \r\n");
        assert_eq!(scan.last_line(), "Loading libraries");
        assert_eq!(scan.into_last_line(), "Loading libraries");
    }

    #[test]
    fn test_scan_tolerates_invalid_utf8() {
        let matcher = ReadinessMatcher::default();
        let mut scan = StartupScan::new(&matcher);
        assert!(!scan.observe(&[0xff, 0xfe, b'x', b'\n']));
        assert!(scan.last_line().ends_with('x'));
        assert!(scan.observe(b"\xffDone (1.0s)!\n"));
    }
}
