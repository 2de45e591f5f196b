use serde_json::{Map, Value};
use time::OffsetDateTime;

use super::repo_types::AnalysisResult;

/// Keys owned by the service; a model body can never override them.
const RESERVED_KEYS: [&str; 2] = ["id", "timestamp"];

/// Outcome of reading the model's text reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Parsed(Map<String, Value>),
    Unparseable { reason: String },
}

impl Normalized {
    /// Attaches `id` and `timestamp`. An unparseable reply degrades to a
    /// record with an empty body.
    pub fn into_result(self, id: String, timestamp: OffsetDateTime) -> AnalysisResult {
        let mut body = match self {
            Normalized::Parsed(map) => map,
            Normalized::Unparseable { .. } => Map::new(),
        };
        for key in RESERVED_KEYS {
            body.remove(key);
        }
        AnalysisResult {
            id,
            timestamp,
            body,
        }
    }
}

pub fn normalize(raw: &str) -> Normalized {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Normalized::Parsed(map),
        Ok(other) => Normalized::Unparseable {
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        },
        Err(e) => Normalized::Unparseable {
            reason: e.to_string(),
        },
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
