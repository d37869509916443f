//! Session document envelope and load-time validation.
//!
//! The top level and `session` are closed objects: unknown keys fail the load.
//! Events are open (see the crate docs). Validation beyond shape is a pure
//! predicate over the decoded value: times must be finite, non-negative and
//! non-decreasing across the sequence.

use crate::Event;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Document format version. Only `"0.1"` exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Version {
    #[default]
    #[serde(rename = "0.1")]
    V0_1,
}

/// Identification / environment metadata. Passed through untouched by replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionMeta {
    pub id: String,
    pub user_agent: String,
    pub lang: String,
    /// Device class: `desktop`, `mobile`, `tablet` or a capture-defined value.
    pub device: String,
    /// Capture source identifier.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    pub version: Version,
    pub session: SessionMeta,
    pub initial_text: String,
    pub events: Vec<Event>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event {index}: time {time} is not a finite number")]
    NonFiniteTime { index: usize, time: f64 },
    #[error("event {index}: time {time} is negative")]
    NegativeTime { index: usize, time: f64 },
    #[error("event {index}: time {time} precedes previous event time {previous}")]
    UnorderedEvents {
        index: usize,
        time: f64,
        previous: f64,
    },
}

impl Document {
    pub fn new(session: SessionMeta, initial_text: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            version: Version::V0_1,
            session,
            initial_text: initial_text.into(),
            events,
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let doc: Document = serde_json::from_str(json)?;
        doc.validate()?;
        tracing::debug!(
            target: "events.load",
            events = doc.events.len(),
            duration_ms = doc.duration(),
            initial_len = doc.initial_text.len(),
            "document_parsed"
        );
        Ok(doc)
    }

    /// Check the timeline invariants. Does not mutate.
    pub fn validate(&self) -> Result<(), LoadError> {
        validate_timeline(&self.events)
    }

    /// Time of the last event, or 0 when empty.
    pub fn duration(&self) -> f64 {
        self.events.last().map(|e| e.time).unwrap_or(0.0)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Times finite, non-negative, non-decreasing.
pub fn validate_timeline(events: &[Event]) -> Result<(), LoadError> {
    let mut previous = 0.0_f64;
    for (index, event) in events.iter().enumerate() {
        let time = event.time;
        if !time.is_finite() {
            return Err(LoadError::NonFiniteTime { index, time });
        }
        if time < 0.0 {
            return Err(LoadError::NegativeTime { index, time });
        }
        if time < previous {
            return Err(LoadError::UnorderedEvents {
                index,
                time,
                previous,
            });
        }
        previous = time;
    }
    Ok(())
}
