//! Fake server scripts and standard test values

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Appears in every fake server's command line; used as its identity
    pub const MARKER: &'static str = "fake-server";

    pub const READY_LINE: &'static str = "Done (12.345s)! For help, type \"help\"";

    /// Prints two startup lines, the ready line on line 3, then two more
    /// lines. Logs every command to `commands.log`; exits on `stop`
    /// (status 0) or `crash` (status 3).
    pub const READY_SERVER: &'static str = r#": fake-server
echo "Starting minecraft server version 1.12.2"
echo "Preparing level \"world\""
echo "Done (12.345s)! For help, type \"help\""
echo "after ready 1"
echo "after ready 2"
while IFS= read -r line; do
  echo "$line" >> commands.log
  case "$line" in
    stop) echo "Stopping the server"; exit 0 ;;
    crash) exit 3 ;;
  esac
done
"#;

    /// Like `READY_SERVER`, but leaves `spawned.marker` behind when started
    pub const MARKING_SERVER: &'static str = r#": fake-server
touch spawned.marker
echo "Done (0.1s)!"
while IFS= read -r line; do
  [ "$line" = stop ] && exit 0
done
"#;

    /// Two non-matching lines, then end of output
    pub const FAILING_SERVER: &'static str = r#": fake-server
echo "Loading libraries, please wait..."
echo "Failed to load eula.txt"
exit 1
"#;

    /// Exits at once without printing anything
    pub const SILENT_SERVER: &'static str = ": fake-server; exit 0";

    /// Prints one line and then never becomes ready
    pub const HANGING_SERVER: &'static str = r#": fake-server
echo "Loading"
exec sleep 30
"#;

    /// Emits invalid UTF-8 before the ready line
    pub const GARBLED_SERVER: &'static str = r#": fake-server
printf '\377\376 garbled\n'
printf 'Done (0.5s)!\n'
while IFS= read -r line; do
  [ "$line" = stop ] && exit 0
done
"#;

    /// Becomes ready but ignores the stop command
    pub const STUBBORN_SERVER: &'static str = r#": fake-server
echo "Done (0.2s)!"
while IFS= read -r line; do
  :
done
"#;
}
