// src/stream/normalize.rs

//! Event classification and field extraction.
//!
//! Classification is a fixed, ordered table of [`Rule`]s; the first rule
//! whose predicate matches decides the [`EventKind`]. Field extraction is
//! independent of classification, but a [`NormalizedEvent`] only carries the
//! fields relevant to its kind (the session token is always carried).

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::stream::walk::find_string;

const TYPE_KEY: &str = "type";
const SESSION_KEYS: [&str; 4] = ["session_id", "sessionId", "session", "sessionID"];
const DELTA_KEY: &str = "delta";
const DELTA_TEXT_KEY: &str = "text";
const RESULT_KEYS: [&str; 5] = ["result_text", "resultText", "result", "text", "output"];
const RESULT_SUB_KEYS: [&str; 3] = ["text", "result_text", "output"];
const API_KEY_SOURCE_KEY: &str = "apiKeySource";
const PERMISSION_MODE_KEY: &str = "permissionMode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Init,
    Delta,
    Result,
    Error,
    Unknown,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Init => "init",
            EventKind::Delta => "delta",
            EventKind::Result => "result",
            EventKind::Error => "error",
            EventKind::Unknown => "unknown",
        }
    }
}

/// One classification rule: if `matches` holds, the event is `kind`.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&Value) -> bool,
    pub kind: EventKind,
}

/// Classification rules, evaluated in order; the first match wins.
pub static RULES: [Rule; 8] = [
    Rule {
        name: "type_tag_init",
        matches: type_tag_has_init,
        kind: EventKind::Init,
    },
    Rule {
        name: "type_tag_result",
        matches: type_tag_has_result,
        kind: EventKind::Result,
    },
    Rule {
        name: "type_tag_error",
        matches: type_tag_has_error,
        kind: EventKind::Error,
    },
    Rule {
        name: "type_tag_delta",
        matches: type_tag_has_delta,
        kind: EventKind::Delta,
    },
    Rule {
        name: "init_fields",
        matches: has_init_fields,
        kind: EventKind::Init,
    },
    Rule {
        name: "result_with_usage",
        matches: has_result_with_usage,
        kind: EventKind::Result,
    },
    Rule {
        name: "text_delta",
        matches: has_text_delta,
        kind: EventKind::Delta,
    },
    Rule {
        name: "error_fields",
        matches: has_error_fields,
        kind: EventKind::Error,
    },
];

/// Look up a rule by name.
pub fn rule(name: &str) -> Option<&'static Rule> {
    RULES.iter().find(|r| r.name == name)
}

pub fn classify(obj: &Value) -> EventKind {
    RULES
        .iter()
        .find(|r| (r.matches)(obj))
        .map(|r| r.kind)
        .unwrap_or(EventKind::Unknown)
}

fn type_tag(obj: &Value) -> Option<String> {
    obj.get(TYPE_KEY)
        .and_then(Value::as_str)
        .map(str::to_lowercase)
}

fn type_tag_has_init(obj: &Value) -> bool {
    type_tag(obj).is_some_and(|t| t.contains("init"))
}

fn type_tag_has_result(obj: &Value) -> bool {
    type_tag(obj).is_some_and(|t| t.contains("result"))
}

fn type_tag_has_error(obj: &Value) -> bool {
    type_tag(obj).is_some_and(|t| t.contains("error"))
}

fn type_tag_has_delta(obj: &Value) -> bool {
    type_tag(obj).is_some_and(|t| t.contains("delta") || t.contains("assistant"))
}

fn is_non_null(obj: &Value, key: &str) -> bool {
    obj.get(key).is_some_and(|v| !v.is_null())
}

fn has_init_fields(obj: &Value) -> bool {
    extract_api_key_source(obj).is_some() || is_non_null(obj, PERMISSION_MODE_KEY)
}

fn has_result_with_usage(obj: &Value) -> bool {
    extract_result_text(obj).is_some() && (obj.get("usage").is_some() || obj.get("cost").is_some())
}

fn has_text_delta(obj: &Value) -> bool {
    extract_text_delta(obj).is_some()
}

fn has_error_fields(obj: &Value) -> bool {
    is_non_null(obj, "error") || (is_non_null(obj, "message") && is_non_null(obj, "code"))
}

fn non_empty_str(v: &Value) -> Option<&str> {
    v.as_str().filter(|s| !s.is_empty())
}

/// Session token anywhere in the record (depth-first, first hit wins).
pub fn extract_session_id(obj: &Value) -> Option<&str> {
    find_string(obj, &SESSION_KEYS)
}

/// `{"delta": "..."}` or `{"delta": {"text": "..."}}`; no deeper search.
pub fn extract_text_delta(obj: &Value) -> Option<&str> {
    match obj.get(DELTA_KEY)? {
        Value::String(s) if !s.is_empty() => Some(s.as_str()),
        Value::Object(inner) => inner.get(DELTA_TEXT_KEY).and_then(non_empty_str),
        _ => None,
    }
}

/// First top-level result-like field, looking one level into objects.
pub fn extract_result_text(obj: &Value) -> Option<&str> {
    RESULT_KEYS.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.as_str()),
        Value::Object(inner) => RESULT_SUB_KEYS
            .iter()
            .find_map(|sub| inner.get(*sub).and_then(non_empty_str)),
        _ => None,
    })
}

pub fn extract_api_key_source(obj: &Value) -> Option<&str> {
    find_string(obj, &[API_KEY_SOURCE_KEY])
}

fn string_list(obj: &Value, key: &str) -> Option<Vec<String>> {
    let items = obj.get(key)?.as_array()?;
    items
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Top-level `tools` array, if every element is a string.
pub fn extract_tools(obj: &Value) -> Option<Vec<String>> {
    string_list(obj, "tools")
}

/// Top-level `skills` array, if every element is a string.
pub fn extract_skills(obj: &Value) -> Option<Vec<String>> {
    string_list(obj, "skills")
}

/// A classified record plus the fields relevant to its kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub kind: EventKind,
    pub session_id: Option<String>,
    pub text_delta: Option<String>,
    pub result_text: Option<String>,
    pub api_key_source: Option<String>,
    pub raw: Value,
}

pub fn normalize_event(obj: Map<String, Value>) -> NormalizedEvent {
    let raw = Value::Object(obj);
    let kind = classify(&raw);
    let owned = |s: Option<&str>| s.map(str::to_string);

    NormalizedEvent {
        kind,
        session_id: owned(extract_session_id(&raw)),
        text_delta: (kind == EventKind::Delta)
            .then(|| owned(extract_text_delta(&raw)))
            .flatten(),
        result_text: (kind == EventKind::Result)
            .then(|| owned(extract_result_text(&raw)))
            .flatten(),
        api_key_source: (kind == EventKind::Init)
            .then(|| owned(extract_api_key_source(&raw)))
            .flatten(),
        raw,
    }
}

impl NormalizedEvent {
    /// The record written to `events_norm.ndjson`.
    pub fn log_record(&self) -> Value {
        json!({
            "kind": self.kind,
            "session_id": self.session_id,
            "text_delta": self.text_delta,
            "result_text": self.result_text,
            "api_key_source": self.api_key_source,
        })
    }
}

/// The `events_norm.ndjson` marker for a line that did not decode.
pub fn parse_error_record(raw: &str, reason: &str) -> Value {
    json!({
        "kind": "parse_error",
        "error": reason,
        "raw": raw,
    })
}
