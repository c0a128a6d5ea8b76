//! Test-only helpers: scripted model backends and in-memory transcript sinks.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::core::message::MessageRecord;
use crate::io::llm::{Invoker, LlmError};
use crate::io::transcript_store::TranscriptSink;

/// Invoker that answers from a script instead of spawning a process.
///
/// Resolution order for each prompt: per-prompt delay, per-prompt failure,
/// the next queued response, then the fallback (echo or "script exhausted").
#[derive(Default)]
pub struct ScriptedInvoker {
    queue: Mutex<VecDeque<Result<String, LlmError>>>,
    failures: HashMap<String, LlmError>,
    delays: HashMap<String, Duration>,
    echo: bool,
    prompts: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every unscripted prompt with `echo: <prompt>`.
    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    pub fn reply(self, output: &str) -> Self {
        self.push(Ok(output.to_string()))
    }

    pub fn fail(self, error: LlmError) -> Self {
        self.push(Err(error))
    }

    pub fn fail_for(mut self, prompt: &str, error: LlmError) -> Self {
        self.failures.insert(prompt.to_string(), error);
        self
    }

    pub fn delay_for(mut self, prompt: &str, delay: Duration) -> Self {
        self.delays.insert(prompt.to_string(), delay);
        self
    }

    /// Prompts in the order they were received.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Prompts in the order their invocations finished.
    pub fn completed(&self) -> Vec<String> {
        lock(&self.completed).clone()
    }

    fn push(self, entry: Result<String, LlmError>) -> Self {
        lock(&self.queue).push_back(entry);
        self
    }
}

impl Invoker for ScriptedInvoker {
    fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        lock(&self.prompts).push(prompt.to_string());
        if let Some(delay) = self.delays.get(prompt) {
            thread::sleep(*delay);
        }

        let result = if let Some(error) = self.failures.get(prompt) {
            Err(error.clone())
        } else if let Some(entry) = lock(&self.queue).pop_front() {
            entry
        } else if self.echo {
            Ok(format!("echo: {prompt}"))
        } else {
            Err(LlmError::invocation("script exhausted"))
        };

        lock(&self.completed).push(prompt.to_string());
        result
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sink that keeps exported transcripts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub exports: Vec<Vec<MessageRecord>>,
    pub fail: bool,
}

impl MemorySink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl TranscriptSink for MemorySink {
    fn export(&mut self, records: &[MessageRecord]) -> Result<PathBuf> {
        if self.fail {
            return Err(anyhow!("disk full"));
        }
        self.exports.push(records.to_vec());
        Ok(Path::new("memory://transcript.json").to_path_buf())
    }
}
