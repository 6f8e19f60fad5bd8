//! Stable exit codes for the `issue-runner` binary.

/// The agent ran to completion (or the comment was posted).
pub const OK: i32 = 0;
/// Missing environment, bad flags, unreadable config, or an empty title/body.
pub const INVALID: i32 = 1;
/// The agent runtime (or GitHub) failed to start or failed mid-run.
pub const FAILED: i32 = 2;
/// `--timeout-secs` elapsed before the agent finished.
pub const TIMED_OUT: i32 = 3;
