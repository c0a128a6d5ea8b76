//! Orchestration for `gamemaster batch`: fan a set of prompt files out to the model.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::io::llm::{Invoker, LlmClient, LlmError};

/// One prompt file and the model's answer to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub prompt: PathBuf,
    pub response: String,
}

/// Read every prompt file, in argument order.
pub fn read_prompts(paths: &[PathBuf]) -> Result<Vec<String>> {
    paths
        .iter()
        .map(|path| {
            fs::read_to_string(path).with_context(|| format!("read prompt {}", path.display()))
        })
        .collect()
}

/// Run `prompts` through the client and pair each response with its source file.
pub fn run_batch<I: Invoker + Sync>(
    client: &LlmClient<I>,
    paths: &[PathBuf],
    prompts: &[String],
) -> Result<Vec<BatchEntry>, LlmError> {
    let responses = client.batch(prompts)?;
    Ok(paths
        .iter()
        .zip(responses)
        .map(|(path, response)| BatchEntry {
            prompt: path.to_path_buf(),
            response,
        })
        .collect())
}

/// Render entries as the pretty-printed JSON the CLI prints.
pub fn render_entries(entries: &[BatchEntry]) -> Result<String> {
    serde_json::to_string_pretty(entries).context("serialize batch results")
}
