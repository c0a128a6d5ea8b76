//! Session state: the fixed scenario plus the growing transcript.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::message::{Message, Transcript};

const DEFAULT_PROBLEM: &str = "You are in a physics lab. In front of you is a wooden block resting on \
an adjustable inclined plane. Your goal is to determine the coefficient of static friction between \
the block and the plane. You have a mass scale and an inclinometer at your disposal.";

/// A named environment value, numeric or textual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fact {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fact::Integer(value) => write!(f, "{value}"),
            Fact::Float(value) => write!(f, "{value}"),
            Fact::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Fact {
    fn from(value: i64) -> Self {
        Fact::Integer(value)
    }
}

impl From<f64> for Fact {
    fn from(value: f64) -> Self {
        Fact::Float(value)
    }
}

impl From<&str> for Fact {
    fn from(value: &str) -> Self {
        Fact::Text(value.to_string())
    }
}

/// The fixed part of a session: what the human is solving, what the world
/// looks like, and which instruments they may use.
///
/// Maps are ordered by name so prompts render deterministically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub problem: String,
    pub environment: BTreeMap<String, Fact>,
    pub capabilities: BTreeMap<String, bool>,
}

impl Default for Scenario {
    fn default() -> Self {
        let environment = BTreeMap::from([
            ("mass".to_string(), Fact::from(10)),
            ("incline_angle".to_string(), Fact::from(30)),
            ("coeff_static_friction".to_string(), Fact::from(0.6)),
            ("gravity".to_string(), Fact::from(9.81)),
        ]);
        let capabilities = BTreeMap::from([
            ("mass_scale".to_string(), true),
            ("inclinometer".to_string(), true),
            ("force_sensor".to_string(), false),
        ]);
        Self {
            problem: DEFAULT_PROBLEM.to_string(),
            environment,
            capabilities,
        }
    }
}

/// State for one play session.
///
/// The scenario is read-only once constructed; the transcript only grows,
/// and only through [`SessionState::add_message`].
#[derive(Debug, Clone)]
pub struct SessionState {
    scenario: Scenario,
    transcript: Transcript,
}

impl SessionState {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            transcript: Transcript::new(),
        }
    }

    pub fn problem(&self) -> &str {
        &self.scenario.problem
    }

    pub fn environment(&self) -> &BTreeMap<String, Fact> {
        &self.scenario.environment
    }

    pub fn capabilities(&self) -> &BTreeMap<String, bool> {
        &self.scenario.capabilities
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn add_message(&mut self, message: Message) {
        self.transcript.push(message);
    }
}
