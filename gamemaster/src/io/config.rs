//! Gamemaster configuration stored in `gamemaster.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::session::Scenario;

pub const DEFAULT_CONFIG_PATH: &str = "gamemaster.toml";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Gamemaster configuration (TOML).
///
/// Missing fields default to values that run the friction lab against the
/// locally installed `gemini` CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GamemasterConfig {
    /// Model identifier passed to the CLI with `-m`.
    pub model: String,

    /// Credential handed to the CLI through its environment. Unset leaves the
    /// CLI's own login in effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Program and leading arguments of the invocation tool.
    pub command: Vec<String>,

    /// Kill the invocation after this many seconds. Unset waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_timeout_secs: Option<u64>,

    /// Keep at most this many bytes of the tool's stdout/stderr.
    pub output_limit_bytes: usize,

    /// Worker threads for batch calls. Unset uses available parallelism.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_workers: Option<usize>,

    /// Where the transcript is written when the session ends.
    pub transcript_path: PathBuf,

    pub scenario: Scenario,
}

impl Default for GamemasterConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            command: vec!["gemini".to_string()],
            invocation_timeout_secs: None,
            output_limit_bytes: 1_000_000,
            batch_workers: None,
            transcript_path: PathBuf::from("transcript.json"),
            scenario: Scenario::default(),
        }
    }
}

impl GamemasterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(anyhow!("command must be a non-empty array"));
        }
        if self.invocation_timeout_secs == Some(0) {
            return Err(anyhow!("invocation_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.batch_workers == Some(0) {
            return Err(anyhow!("batch_workers must be > 0"));
        }
        if self.transcript_path.as_os_str().is_empty() {
            return Err(anyhow!("transcript_path must be non-empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `GamemasterConfig::default()`.
pub fn load_config(path: &Path) -> Result<GamemasterConfig> {
    if !path.exists() {
        let cfg = GamemasterConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GamemasterConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &GamemasterConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Write `contents` next to `path` and rename it into place.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
