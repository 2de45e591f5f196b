use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors surfaced over HTTP. Every failure except not-found collapses to
/// the endpoint's single public message; the cause only goes to the log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{public}: {cause:#}")]
    Internal {
        public: &'static str,
        cause: anyhow::Error,
    },
    #[error("{0}")]
    NotFound(&'static str),
}

impl ApiError {
    pub fn internal(public: &'static str, cause: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal {
            public,
            cause: cause.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Internal { public, cause } => {
                error!(error = %format!("{cause:#}"), "{}", public);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: public.to_string(),
                    }),
                )
                    .into_response()
            }
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: msg.to_string(),
                }),
            )
                .into_response(),
        }
    }
}
