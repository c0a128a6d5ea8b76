//! Stable exit codes for gamemaster CLI commands.

/// Command succeeded (session ended normally or every batch prompt answered).
pub const OK: i32 = 0;
/// Command failed due to invalid config, unreadable input, or other errors.
pub const INVALID: i32 = 1;
/// `gamemaster batch` had at least one failed prompt.
pub const BATCH_FAILED: i32 = 2;
