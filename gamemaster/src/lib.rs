//! Turn-based tutoring sessions with an LLM gamemaster.
//!
//! A human describes actions, an external model CLI answers as the
//! gamemaster, and every utterance lands in an append-only transcript. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (messages, session state, turn phases).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, process execution, prompt
//!   rendering, transcript export). Isolated behind traits for tests.
//!
//! Orchestration modules ([`play`], [`batch`]) coordinate core logic with I/O to
//! implement CLI commands.

pub mod batch;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod play;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
