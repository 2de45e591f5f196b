use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, instrument, warn};

use super::view::ReportView;
use crate::analysis::services::find_analysis;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub status: Option<String>,
    pub id: Option<String>,
    /// Whole result as URL-encoded JSON.
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ReportPage {
    Analyzing,
    Ready { report: ReportView },
    Unavailable { message: String },
}

impl ReportPage {
    fn unavailable(message: &str) -> Self {
        ReportPage::Unavailable {
            message: message.to_string(),
        }
    }

    /// Inline transport: the query value is already URL-decoded by the
    /// extractor, so this only parses JSON.
    pub fn from_inline(data: &str) -> Self {
        match serde_json::from_str::<Value>(data) {
            Ok(v) if v.is_object() => ReportPage::Ready {
                report: ReportView::from_value(&v),
            },
            Ok(_) | Err(_) => {
                warn!("inline analysis data is not a JSON object");
                Self::unavailable("No analysis available")
            }
        }
    }
}

pub fn report_link_by_id(id: &str) -> String {
    let query = serde_urlencoded::to_string([("id", id)]).unwrap_or_default();
    format!("/report?{}", query)
}

pub fn report_routes() -> Router<AppState> {
    Router::new().route("/report", get(get_report))
}

/// GET /report?status=analyzing | ?id=<id> | ?data=<json>
#[instrument(skip(state, q), fields(id = ?q.id, status = ?q.status, inline = q.data.is_some()))]
pub async fn get_report(
    State(state): State<AppState>,
    Query(q): Query<ReportQuery>,
) -> Json<ReportPage> {
    Json(resolve(&state, q).await)
}

async fn resolve(state: &AppState, q: ReportQuery) -> ReportPage {
    if let Some(data) = q.data.as_deref() {
        return ReportPage::from_inline(data);
    }
    if let Some(id) = q.id.as_deref() {
        return match find_analysis(state, id).await {
            Ok(Some(result)) => ReportPage::Ready {
                report: ReportView::from_result(&result),
            },
            Ok(None) => {
                warn!(%id, "report requested for unknown analysis");
                ReportPage::unavailable("Failed to load analysis results")
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), %id, "report lookup failed");
                ReportPage::unavailable("Failed to load analysis results")
            }
        };
    }
    if q.status.as_deref() == Some("analyzing") {
        return ReportPage::Analyzing;
    }
    ReportPage::unavailable("No analysis ID provided")
}
