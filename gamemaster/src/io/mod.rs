//! I/O helpers for gamemaster commands.

pub mod config;
pub mod invoker;
pub mod llm;
pub mod process;
pub mod prompt;
pub mod transcript_store;
