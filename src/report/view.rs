use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::repo_types::AnalysisResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortionView {
    pub size: Option<f64>,
    pub unit: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodIdentification {
    pub name: String,
    /// 0–100 scale, shown as-is.
    pub confidence_percent: f64,
    pub portion: PortionView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub label: String,
    pub unit: String,
    pub current: f64,
    pub target: Option<f64>,
    /// `None` when the target is missing, zero or negative.
    pub percent: Option<f64>,
    /// Gauge fill, clamped to [0, 100].
    pub bar_percent: f64,
}

impl GoalProgress {
    pub fn new(label: &str, unit: &str, current: f64, target: Option<f64>) -> Self {
        let percent = target
            .filter(|t| t.is_finite() && *t > 0.0)
            .map(|t| current * 100.0 / t)
            .filter(|p| p.is_finite());
        Self {
            label: label.to_string(),
            unit: unit.to_string(),
            current,
            target,
            percent,
            bar_percent: percent.map(|p| p.clamp(0.0, 100.0)).unwrap_or(0.0),
        }
    }
}

/// Everything the report page shows for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub id: Option<String>,
    pub timestamp: Option<String>,
    pub food: FoodIdentification,
    pub nutrition: Vec<Metric>,
    pub goals: Vec<GoalProgress>,
    pub recommendations: Vec<String>,
    pub analysis: String,
}

impl ReportView {
    pub fn from_result(result: &AnalysisResult) -> Self {
        Self::from_value(&result.to_value())
    }

    /// Never fails: anything missing or of the wrong shape renders as a
    /// blank or zero field.
    pub fn from_value(v: &Value) -> Self {
        let food = &v["foodItem"];
        let portion = &food["portion"];
        let nutrition = &v["nutrition"];
        let goals = &v["dailyGoals"];

        let metric = |key: &str, label: &str, unit: &str| Metric {
            label: label.to_string(),
            value: number(&nutrition[key]).unwrap_or(0.0),
            unit: unit.to_string(),
        };
        let goal = |key: &str, label: &str, unit: &str| {
            GoalProgress::new(
                label,
                unit,
                number(&goals[key]["current"]).unwrap_or(0.0),
                number(&goals[key]["target"]),
            )
        };

        Self {
            id: text(&v["id"]).or_else(|| text(&v["analysisId"])),
            timestamp: text(&v["timestamp"]),
            food: FoodIdentification {
                name: text(&food["name"])
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| "Unknown Food".to_string()),
                confidence_percent: number(&food["confidence"]).unwrap_or(0.0),
                portion: PortionView {
                    size: number(&portion["size"]),
                    unit: text(&portion["unit"]).unwrap_or_default(),
                    description: text(&portion["description"]).unwrap_or_default(),
                },
            },
            nutrition: vec![
                metric("calories", "Calories", "kcal"),
                metric("protein", "Protein", "g"),
                metric("carbs", "Carbs", "g"),
                metric("fat", "Fat", "g"),
            ],
            goals: vec![
                goal("calories", "Calories", "kcal"),
                goal("protein", "Protein", "g"),
            ],
            recommendations: v["recommendations"]
                .as_array()
                .map(|items| items.iter().filter_map(text).collect())
                .unwrap_or_default(),
            analysis: text(&v["analysis"]).unwrap_or_default(),
        }
    }
}

fn text(v: &Value) -> Option<String> {
    v.as_str().map(str::to_string)
}

/// Accepts a JSON number or a string starting with one ("150", "95 kcal").
fn number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            let end = s
                .char_indices()
                .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (c == '-' && i == 0)))
                .map(|(i, _)| i)
                .unwrap_or(s.len());
            s[..end].parse::<f64>().ok()
        }
        _ => None,
    };
    n.filter(|n| n.is_finite())
}
