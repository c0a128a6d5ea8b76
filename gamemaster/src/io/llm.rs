//! LLM client: single calls and order-preserving parallel batches.
//!
//! The [`Invoker`] trait is the seam between the session and the external
//! model tool. [`LlmClient`] adds output trimming and the bounded worker pool
//! used by [`LlmClient::batch`]. Tests plug in scripted invokers that never
//! spawn processes.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Failure of a model invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    /// The external tool is not installed or not on `PATH`.
    #[error("the '{command}' command was not found; ensure it is installed and in your PATH")]
    InvocationNotFound { command: String },
    /// The external tool ran but reported failure. `detail` is its diagnostic output.
    #[error("error executing model CLI: {detail}")]
    InvocationError { detail: String },
    /// At least one prompt of a batch failed.
    #[error(transparent)]
    Batch(#[from] BatchFailure),
}

impl LlmError {
    pub fn invocation(detail: impl Into<String>) -> Self {
        LlmError::InvocationError {
            detail: detail.into(),
        }
    }
}

/// One failed prompt inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptFailure {
    /// Position of the prompt in the batch input.
    pub index: usize,
    pub error: LlmError,
}

/// Every failure of a batch call, sorted by prompt index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub total: usize,
    pub failures: Vec<PromptFailure>,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} batch prompts failed",
            self.failures.len(),
            self.total
        )?;
        for failure in &self.failures {
            write!(f, "\n- [{}] {}", failure.index, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchFailure {}

/// Abstraction over model invocation backends.
pub trait Invoker {
    /// Send `prompt` to the model and return its raw textual output.
    fn invoke(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Client over one invocation backend. The backend (and with it the model and
/// credentials) is fixed at construction.
pub struct LlmClient<I> {
    invoker: I,
    workers: Option<NonZeroUsize>,
}

impl<I: Invoker> LlmClient<I> {
    pub fn new(invoker: I) -> Self {
        Self {
            invoker,
            workers: None,
        }
    }

    /// Cap the batch pool at `workers` threads. `0` falls back to available parallelism.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = NonZeroUsize::new(workers);
        self
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Run one prompt and return the trimmed output.
    pub fn run(&self, prompt: &str) -> Result<String, LlmError> {
        let output = self.invoker.invoke(prompt)?;
        Ok(output.trim().to_string())
    }

    /// Run every prompt on a bounded worker pool and return the outputs in input order.
    ///
    /// All prompts are attempted. If any fail, the whole call fails with
    /// [`LlmError::Batch`] listing every failure by prompt index; no partial
    /// results are returned. The pool is torn down before returning.
    #[instrument(skip_all, fields(prompts = prompts.len()))]
    pub fn batch<S>(&self, prompts: &[S]) -> Result<Vec<String>, LlmError>
    where
        I: Sync,
        S: AsRef<str> + Sync,
    {
        if prompts.is_empty() {
            return Ok(Vec::new());
        }
        let workers = self.pool_size(prompts.len());
        debug!(workers, "starting batch");

        let next = AtomicUsize::new(0);
        let finished: Vec<(usize, Result<String, LlmError>)> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let next = &next;
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            let Some(prompt) = prompts.get(index) else {
                                break;
                            };
                            done.push((index, self.run(prompt.as_ref())));
                        }
                        debug!(worker, completed = done.len(), "batch worker finished");
                        done
                    })
                })
                .collect();

            handles
                .into_iter()
                .filter_map(|handle| match handle.join() {
                    Ok(done) => Some(done),
                    Err(_) => {
                        warn!("batch worker panicked");
                        None
                    }
                })
                .flatten()
                .collect()
        });

        let mut slots: Vec<Option<Result<String, LlmError>>> =
            (0..prompts.len()).map(|_| None).collect();
        for (index, result) in finished {
            slots[index] = Some(result);
        }

        let mut responses = Vec::with_capacity(prompts.len());
        let mut failures = Vec::new();
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(response)) => responses.push(response),
                Some(Err(error)) => failures.push(PromptFailure { index, error }),
                None => failures.push(PromptFailure {
                    index,
                    error: LlmError::invocation("batch worker panicked before reporting a result"),
                }),
            }
        }

        if !failures.is_empty() {
            warn!(failed = failures.len(), total = prompts.len(), "batch failed");
            return Err(BatchFailure {
                total: prompts.len(),
                failures,
            }
            .into());
        }
        Ok(responses)
    }

    fn pool_size(&self, prompts: usize) -> usize {
        let workers = self.workers.map(NonZeroUsize::get).unwrap_or_else(|| {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        });
        workers.min(prompts).max(1)
    }
}
