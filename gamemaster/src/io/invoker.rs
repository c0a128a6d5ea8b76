//! Invocation backend that shells out to the `gemini` CLI.

use std::io::ErrorKind;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::io::config::GamemasterConfig;
use crate::io::llm::{Invoker, LlmError};
use crate::io::process::run_command;

/// Environment variable the CLI reads its credential from.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Runs `<command...> -m <model> -p <prompt>` and returns stdout.
#[derive(Debug, Clone)]
pub struct GeminiInvoker {
    command: Vec<String>,
    model: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
}

impl GeminiInvoker {
    pub fn from_config(cfg: &GamemasterConfig) -> Self {
        Self {
            command: cfg.command.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.invocation_timeout_secs.map(Duration::from_secs),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }

    fn build_command(&self, prompt: &str) -> Result<(String, Command), LlmError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| LlmError::invocation("invocation command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg("-m")
            .arg(&self.model)
            .arg("-p")
            .arg(prompt);
        if let Some(key) = &self.api_key {
            cmd.env(API_KEY_ENV, key);
        }
        Ok((program.clone(), cmd))
    }
}

impl Invoker for GeminiInvoker {
    #[instrument(skip_all, fields(model = %self.model, prompt_bytes = prompt.len()))]
    fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        let (program, cmd) = self.build_command(prompt)?;

        let output = run_command(cmd, self.timeout, self.output_limit_bytes).map_err(|err| {
            let not_found = err
                .chain()
                .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
                .any(|io_err| io_err.kind() == ErrorKind::NotFound);
            if not_found {
                LlmError::InvocationNotFound {
                    command: program.clone(),
                }
            } else {
                LlmError::invocation(format!("{err:#}"))
            }
        })?;

        if output.timed_out {
            return Err(LlmError::invocation(format!(
                "{program} timed out after {:?}",
                self.timeout.unwrap_or_default()
            )));
        }
        if !output.status.success() {
            let stderr = output.stderr_lossy();
            let stderr = stderr.trim();
            warn!(exit_code = ?output.status.code(), "model CLI failed");
            let detail = if stderr.is_empty() {
                format!("{program} exited with status {:?}", output.status.code())
            } else {
                stderr.to_string()
            };
            return Err(LlmError::invocation(detail));
        }
        if output.stdout_truncated > 0 {
            return Err(LlmError::invocation(format!(
                "{program} output exceeded {} bytes",
                self.output_limit_bytes
            )));
        }

        debug!(stdout_bytes = output.stdout.len(), "model CLI completed");
        Ok(output.stdout_lossy().trim().to_string())
    }
}
