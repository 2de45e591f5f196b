mod dto;
pub mod handlers;
pub mod latest;
pub mod normalizer;
pub mod prompt;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes(max_body_bytes))
}
