//! Interaction event model for captured editing sessions.
//!
//! A session document holds the initial field text and an ordered list of
//! timestamped events. Each event shares a small common envelope (`time`,
//! `pos`, `modifiers`, `meta`) and a kind-specific payload keyed by the JSON
//! `type` discriminant.
//!
//! Compatibility contract:
//! - Unknown `type` values decode into `EventKind::Unrecognized` instead of
//!   failing the document; replay ignores them.
//! - Unknown event-level keys are accepted and kept in `Event::extra` so a
//!   document survives a decode/encode cycle unchanged.
//! - Known fields with the wrong JSON type are rejected.
//! - `null` for an optional field is treated as absent.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

pub mod document;
pub use document::{Document, LoadError, SessionMeta, Version, validate_timeline};

/// One timestamped interaction record.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Milliseconds since the session-relative zero.
    pub time: f64,
    /// Caret offset (UTF-16 code units) observed when the event fired.
    pub pos: Option<f64>,
    pub modifiers: Option<Modifiers>,
    pub meta: Option<Map<String, Value>>,
    pub kind: EventKind,
    /// Event-level keys this model does not know about, preserved verbatim.
    pub extra: Map<String, Value>,
}

/// Kind-specific payload. One variant per `type` value plus a fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    KeyDown(KeyData),
    KeyUp(KeyData),
    BeforeInput(InputData),
    Input(InputData),
    CompositionStart(CompositionData),
    CompositionUpdate(CompositionData),
    CompositionEnd(CompositionData),
    SelectionChange(SelectionData),
    Focus,
    Blur,
    Custom(CustomData),
    /// A `type` this version does not understand; its fields stay in `Event::extra`.
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyData {
    /// Logical key name (`"a"`, `"Backspace"`).
    pub key: String,
    /// Physical key code (`"KeyA"`).
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputData {
    /// Semantic edit verb (`insertText`, `deleteContentBackward`, ...).
    pub input_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Full-field text snapshot at event time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompositionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<CompositionSegment>>,
}

/// One IME sub-clause as rendered by the input method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositionSegment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionData {
    pub anchor: SelectionPoint,
    pub focus: SelectionPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionPoint {
    pub index: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,
}

impl SelectionPoint {
    pub fn at(index: f64) -> Self {
        Self {
            index,
            affinity: None,
        }
    }
}

/// Tie-break hint for a caret adjacent to a line or grapheme boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Affinity {
    Forward,
    Backward,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
}

/// Named modifier flags. Known flags get fields; extension flags land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, bool>,
}

impl Modifiers {
    /// Whether the named flag was reported as held.
    pub fn is_active(&self, name: &str) -> bool {
        let known = match name {
            "shift" => self.shift,
            "ctrl" => self.ctrl,
            "alt" => self.alt,
            "meta" => self.meta,
            other => self.extra.get(other).copied(),
        };
        known.unwrap_or(false)
    }
}

/// Shape failure of a single event object.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event must be a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    Missing(&'static str),
    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("invalid `{kind}` payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EventKind {
    /// The JSON `type` discriminant.
    pub fn name(&self) -> &str {
        match self {
            EventKind::KeyDown(_) => "keydown",
            EventKind::KeyUp(_) => "keyup",
            EventKind::BeforeInput(_) => "beforeinput",
            EventKind::Input(_) => "input",
            EventKind::CompositionStart(_) => "compositionstart",
            EventKind::CompositionUpdate(_) => "compositionupdate",
            EventKind::CompositionEnd(_) => "compositionend",
            EventKind::SelectionChange(_) => "selectionchange",
            EventKind::Focus => "focus",
            EventKind::Blur => "blur",
            EventKind::Custom(_) => "custom",
            EventKind::Unrecognized(name) => name,
        }
    }

    fn payload_value(&self) -> Option<Value> {
        let value = match self {
            EventKind::KeyDown(d) | EventKind::KeyUp(d) => serde_json::to_value(d),
            EventKind::BeforeInput(d) | EventKind::Input(d) => serde_json::to_value(d),
            EventKind::CompositionStart(d)
            | EventKind::CompositionUpdate(d)
            | EventKind::CompositionEnd(d) => serde_json::to_value(d),
            EventKind::SelectionChange(d) => serde_json::to_value(d),
            EventKind::Custom(d) => serde_json::to_value(d),
            EventKind::Focus | EventKind::Blur | EventKind::Unrecognized(_) => return None,
        };
        value.ok()
    }
}

const KEY_FIELDS: &[&str] = &["key", "code"];
const INPUT_FIELDS: &[&str] = &["inputType", "data", "text"];
const COMPOSITION_FIELDS: &[&str] = &["data", "segments"];
const SELECTION_FIELDS: &[&str] = &["anchor", "focus"];
const CUSTOM_FIELDS: &[&str] = &["label", "payload"];

impl Event {
    pub fn new(time: f64, kind: EventKind) -> Self {
        Self {
            time,
            pos: None,
            modifiers: None,
            meta: None,
            kind,
            extra: Map::new(),
        }
    }

    pub fn with_pos(mut self, pos: f64) -> Self {
        self.pos = Some(pos);
        self
    }

    /// `input` event with an optional `data` payload.
    pub fn input(time: f64, input_type: &str, data: Option<&str>) -> Self {
        Self::new(
            time,
            EventKind::Input(InputData {
                input_type: input_type.to_string(),
                data: data.map(str::to_string),
                text: None,
            }),
        )
    }

    /// `beforeinput` event with an optional `data` payload.
    pub fn before_input(time: f64, input_type: &str, data: Option<&str>) -> Self {
        Self::new(
            time,
            EventKind::BeforeInput(InputData {
                input_type: input_type.to_string(),
                data: data.map(str::to_string),
                text: None,
            }),
        )
    }

    /// `selectionchange` event from raw anchor/focus indices.
    pub fn selection(time: f64, anchor: f64, focus: f64) -> Self {
        Self::new(
            time,
            EventKind::SelectionChange(SelectionData {
                anchor: SelectionPoint::at(anchor),
                focus: SelectionPoint::at(focus),
            }),
        )
    }

    /// Composition event; `phase` picks start/update/end.
    pub fn composition(time: f64, phase: CompositionPhase, data: Option<&str>) -> Self {
        let payload = CompositionData {
            data: data.map(str::to_string),
            segments: None,
        };
        let kind = match phase {
            CompositionPhase::Start => EventKind::CompositionStart(payload),
            CompositionPhase::Update => EventKind::CompositionUpdate(payload),
            CompositionPhase::End => EventKind::CompositionEnd(payload),
        };
        Self::new(time, kind)
    }

    /// Decode one event object. See the crate docs for the compatibility rules.
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        let Value::Object(mut map) = value else {
            return Err(EventError::NotAnObject);
        };
        let time = take_number(&mut map, "time")?.ok_or(EventError::Missing("time"))?;
        let type_name = match map.remove("type") {
            Some(Value::String(s)) => s,
            Some(_) => {
                return Err(EventError::WrongType {
                    field: "type",
                    expected: "a string",
                });
            }
            None => return Err(EventError::Missing("type")),
        };
        let pos = take_number(&mut map, "pos")?;
        let modifiers = match take_non_null(&mut map, "modifiers") {
            Some(v) => Some(serde_json::from_value(v).map_err(|_| EventError::WrongType {
                field: "modifiers",
                expected: "an object of booleans",
            })?),
            None => None,
        };
        let meta = match take_non_null(&mut map, "meta") {
            Some(Value::Object(m)) => Some(m),
            Some(_) => {
                return Err(EventError::WrongType {
                    field: "meta",
                    expected: "an object",
                });
            }
            None => None,
        };

        let kind = match type_name.as_str() {
            "keydown" => EventKind::KeyDown(take_payload(&mut map, &type_name, KEY_FIELDS)?),
            "keyup" => EventKind::KeyUp(take_payload(&mut map, &type_name, KEY_FIELDS)?),
            "beforeinput" => {
                EventKind::BeforeInput(take_payload(&mut map, &type_name, INPUT_FIELDS)?)
            }
            "input" => EventKind::Input(take_payload(&mut map, &type_name, INPUT_FIELDS)?),
            "compositionstart" => EventKind::CompositionStart(take_payload(
                &mut map,
                &type_name,
                COMPOSITION_FIELDS,
            )?),
            "compositionupdate" => EventKind::CompositionUpdate(take_payload(
                &mut map,
                &type_name,
                COMPOSITION_FIELDS,
            )?),
            "compositionend" => EventKind::CompositionEnd(take_payload(
                &mut map,
                &type_name,
                COMPOSITION_FIELDS,
            )?),
            "selectionchange" => {
                EventKind::SelectionChange(take_payload(&mut map, &type_name, SELECTION_FIELDS)?)
            }
            "focus" => EventKind::Focus,
            "blur" => EventKind::Blur,
            "custom" => EventKind::Custom(take_payload(&mut map, &type_name, CUSTOM_FIELDS)?),
            _ => {
                tracing::trace!(target: "events.load", kind = type_name.as_str(), "unrecognized_event_type");
                EventKind::Unrecognized(type_name)
            }
        };

        Ok(Self {
            time,
            pos,
            modifiers,
            meta,
            kind,
            extra: map,
        })
    }

    /// Encode back into the document's JSON object shape.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("time".into(), number(self.time));
        map.insert("type".into(), Value::String(self.kind.name().to_string()));
        if let Some(pos) = self.pos {
            map.insert("pos".into(), number(pos));
        }
        if let Some(modifiers) = &self.modifiers
            && let Ok(v) = serde_json::to_value(modifiers)
        {
            map.insert("modifiers".into(), v);
        }
        if let Some(meta) = &self.meta {
            map.insert("meta".into(), Value::Object(meta.clone()));
        }
        if let Some(Value::Object(payload)) = self.kind.payload_value() {
            map.extend(payload);
        }
        for (k, v) in &self.extra {
            map.entry(k.clone()).or_insert_with(|| v.clone());
        }
        Value::Object(map)
    }
}

/// Which phase of an IME composition an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionPhase {
    Start,
    Update,
    End,
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Event::from_value(value).map_err(de::Error::custom)
    }
}

fn take_non_null(map: &mut Map<String, Value>, field: &str) -> Option<Value> {
    match map.remove(field) {
        Some(Value::Null) | None => None,
        Some(v) => Some(v),
    }
}

fn take_number(map: &mut Map<String, Value>, field: &'static str) -> Result<Option<f64>, EventError> {
    match take_non_null(map, field) {
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(_) => Err(EventError::WrongType {
            field,
            expected: "a number",
        }),
        None => Ok(None),
    }
}

fn take_payload<T: serde::de::DeserializeOwned>(
    map: &mut Map<String, Value>,
    kind: &str,
    fields: &[&str],
) -> Result<T, EventError> {
    let mut payload = Map::new();
    for field in fields {
        if let Some(v) = map.remove(*field) {
            payload.insert((*field).to_string(), v);
        }
    }
    serde_json::from_value(Value::Object(payload)).map_err(|source| EventError::Payload {
        kind: kind.to_string(),
        source,
    })
}

/// Integral values are written without a fractional part to keep documents stable.
fn number(x: f64) -> Value {
    if x.fract() == 0.0 && x.abs() < 9_007_199_254_740_992.0 {
        Value::from(x as i64)
    } else {
        Number::from_f64(x).map(Value::Number).unwrap_or(Value::Null)
    }
}
