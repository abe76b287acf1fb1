//! Session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{MAX_TEMPERATURE, MIN_TEMPERATURE, SessionConfig};

/// Who authored a turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Tag name used in the prompt template
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Sampling temperature, always within [0.1, 1.0]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
#[serde(try_from = "f32", into = "f32")]
pub struct Temperature(f32);

impl Temperature {
    /// Clamp `value` into range; non-finite input yields `None`
    pub fn new(value: f32) -> Option<Self> {
        if value.is_finite() {
            Some(Self(value.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)))
        } else {
            None
        }
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl Default for Temperature {
    fn default() -> Self {
        Self(0.4)
    }
}

impl TryFrom<f32> for Temperature {
    type Error = String;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Temperature::new(value).ok_or_else(|| format!("invalid temperature: {}", value))
    }
}

impl From<Temperature> for f32 {
    fn from(t: Temperature) -> Self {
        t.0
    }
}

/// The mutable state of one conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub id: String,
    history: Vec<Turn>,
    persona: String,
    temperature: Temperature,
    /// Session creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session
    pub fn new(persona: impl Into<String>, temperature: f32) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), persona, temperature)
    }

    /// Create an empty session with a caller-chosen id
    pub fn with_id(id: impl Into<String>, persona: impl Into<String>, temperature: f32) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            history: Vec::new(),
            persona: persona.into(),
            temperature: Temperature::new(temperature).unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a session from configured defaults
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.persona.clone(), config.temperature)
    }

    /// Full history, oldest first
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// The trailing `n` turns (fewer if history is shorter)
    pub fn last_turns(&self, n: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    pub fn turn_count(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Append a turn to the history
    pub fn push_turn(&mut self, turn: Turn) {
        self.history.push(turn);
        self.updated_at = Utc::now();
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn set_persona(&mut self, persona: impl Into<String>) {
        self.persona = persona.into();
        self.updated_at = Utc::now();
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.value()
    }

    /// Set the temperature, clamped into range. Non-finite values are ignored.
    pub fn set_temperature(&mut self, value: f32) {
        if let Some(temperature) = Temperature::new(value) {
            self.temperature = temperature;
            self.updated_at = Utc::now();
        }
    }
}
