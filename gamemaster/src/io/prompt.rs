//! Gamemaster prompt builder.
//!
//! Each turn's prompt embeds the whole session: problem, environment facts,
//! capability flags, the transcript as JSON records, and the latest utterance.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::debug;

use crate::core::session::SessionState;

const GAMEMASTER_TEMPLATE: &str = include_str!("prompts/gamemaster.md");

#[derive(Debug, Clone, Serialize)]
struct FactContext {
    name: String,
    value: String,
}

#[derive(Debug, Clone, Serialize)]
struct CapabilityContext {
    name: String,
    available: bool,
}

/// Template engine wrapper around minijinja.
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl PromptBuilder {
    pub fn new() -> Result<Self> {
        Self::from_template(GAMEMASTER_TEMPLATE)
    }

    /// Use `source` instead of the bundled gamemaster template.
    pub fn from_template(source: &'static str) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("gamemaster", source)
            .context("load gamemaster template")?;
        Ok(Self { env })
    }

    /// Render the prompt for the gamemaster's reply to `latest`.
    pub fn build(&self, state: &SessionState, latest: &str) -> Result<String> {
        let environment: Vec<FactContext> = state
            .environment()
            .iter()
            .map(|(name, value)| FactContext {
                name: name.clone(),
                value: value.to_string(),
            })
            .collect();
        let capabilities: Vec<CapabilityContext> = state
            .capabilities()
            .iter()
            .map(|(name, available)| CapabilityContext {
                name: name.clone(),
                available: *available,
            })
            .collect();
        let transcript = serde_json::to_string(&state.transcript().to_records())
            .context("serialize transcript for prompt")?;

        let template = self.env.get_template("gamemaster")?;
        let rendered = template
            .render(context! {
                problem => state.problem().trim(),
                environment => environment,
                capabilities => capabilities,
                transcript => transcript,
                latest => latest.trim(),
            })
            .context("render gamemaster prompt")?;
        debug!(bytes = rendered.len(), "rendered gamemaster prompt");
        Ok(rendered)
    }
}
