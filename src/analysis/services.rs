use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::normalizer::{normalize, Normalized};
use super::prompt::{strip_data_url, AnalysisPrompt, InvalidImage};
use super::repo_types::AnalysisResult;
use crate::config::STATUS_WAIT_CEILING_MS;
use crate::state::AppState;
use crate::vision::VisionError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid image: {0}")]
    InvalidImage(#[from] InvalidImage),
    #[error(transparent)]
    Model(#[from] VisionError),
    #[error("model reply is not a JSON object: {0}")]
    Unparseable(String),
    #[error("store analysis: {0:#}")]
    Store(anyhow::Error),
}

/// Ids are UUIDv7: creation-time ordered and unique across concurrent requests.
pub fn new_analysis_id() -> String {
    Uuid::now_v7().to_string()
}

/// Millisecond precision, like the timestamps the web client produces.
fn now_millis() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_millisecond(now.millisecond()).unwrap_or(now)
}

/// Builds the prompt, calls the model once, normalizes the reply and stores
/// the record.
pub async fn analyze_image(
    st: &AppState,
    image: Option<&str>,
) -> Result<AnalysisResult, AnalysisError> {
    let image = image.ok_or(InvalidImage::Missing)?;
    let payload = strip_data_url(image)?;
    let prompt = AnalysisPrompt::for_image(&payload);

    info!(format = payload.format, payload_len = payload.base64.len(), "starting food analysis");
    let raw = st.model.complete(&prompt).await?;
    debug!(reply = %raw, "model reply");

    let outcome = normalize(&raw);
    if let Normalized::Unparseable { reason } = &outcome {
        warn!(%reason, "model reply is not a JSON object");
        if st.config.strict_model_json {
            return Err(AnalysisError::Unparseable(reason.clone()));
        }
    }

    let result = outcome.into_result(new_analysis_id(), now_millis());
    st.store.put(&result).await.map_err(AnalysisError::Store)?;
    st.latest.publish(&result.id);
    info!(analysis_id = %result.id, "analysis stored");
    Ok(result)
}

pub async fn find_analysis(st: &AppState, id: &str) -> anyhow::Result<Option<AnalysisResult>> {
    st.store.get(id).await
}

/// Latest analysis id; with `wait` set, holds until one newer than `after`
/// shows up or the (capped) wait runs out.
pub async fn latest_analysis_id(
    st: &AppState,
    after: Option<&str>,
    wait: Option<Duration>,
) -> Option<String> {
    match wait {
        Some(w) if !w.is_zero() => {
            let budget = wait_budget(st.config.status_wait_max_ms, w);
            st.latest.wait_newer(after, budget).await
        }
        _ => st.latest.current(),
    }
}

fn wait_budget(max_ms: u64, requested: Duration) -> Duration {
    let cap = Duration::from_millis(max_ms.min(STATUS_WAIT_CEILING_MS));
    requested.min(cap)
}
