//! Read-only todo endpoint guarded by a per-client sliding window rate limiter.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod todos;

use axum::{Router, middleware, routing::get};
use std::sync::Arc;

use crate::handlers::{health_handler, metrics_handler, rate_limit_middleware, todo_handler};
use crate::state::AppState;

pub use crate::error::GatewayError;

// Only the todo route is limited; health and metrics stay open
pub fn app(state: Arc<AppState>) -> Router {
    let todos = get(todo_handler).route_layer(middleware::from_fn_with_state(
        state.clone(),
        rate_limit_middleware,
    ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/todos/{id}", todos)
        .with_state(state)
}
