use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;

// Rate limiting happens in the route layer before this runs.
// An id axum cannot decode (e.g. invalid UTF-8) addresses nothing, like any other bad id.
pub async fn todo_handler(
    State(state): State<Arc<AppState>>,
    id: Result<Path<String>, PathRejection>,
) -> Json<Value> {
    match id {
        Ok(Path(id)) => Json(state.todos.lookup(&id)),
        Err(rejection) => {
            debug!(error = %rejection, "undecodable todo id");
            Json(json!({}))
        }
    }
}
