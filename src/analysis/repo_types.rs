use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Structured nutrition record produced per photographed meal.
///
/// `body` is the model's JSON object forwarded verbatim (`foodItem`,
/// `nutrition`, `dailyGoals`, `recommendations`, `analysis`); only `id` and
/// `timestamp` are generated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl AnalysisResult {
    pub fn to_value(&self) -> Value {
        let mut out = self.body.clone();
        out.insert("id".into(), Value::String(self.id.clone()));
        out.insert("timestamp".into(), Value::String(self.timestamp_rfc3339()));
        Value::Object(out)
    }

    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default()
    }
}
