//! Transcript export to a pretty-printed JSON record list.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::core::message::MessageRecord;
use crate::io::config::write_atomic;

/// Destination for a finished session's transcript.
pub trait TranscriptSink {
    /// Persist `records` and return where they were written.
    fn export(&mut self, records: &[MessageRecord]) -> Result<PathBuf>;
}

/// Writes the transcript as a JSON array to a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TranscriptSink for JsonFileSink {
    fn export(&mut self, records: &[MessageRecord]) -> Result<PathBuf> {
        write_transcript(&self.path, records)?;
        info!(path = %self.path.display(), messages = records.len(), "transcript exported");
        Ok(self.path.clone())
    }
}

/// Serialize `records` to pretty-printed JSON with trailing newline.
pub fn write_transcript(path: &Path, records: &[MessageRecord]) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(records).context("serialize transcript")?;
    payload.push('\n');
    write_atomic(path, &payload).with_context(|| format!("write transcript {}", path.display()))
}

pub fn load_transcript(path: &Path) -> Result<Vec<MessageRecord>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}
