use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::error::GatewayError;
use crate::metrics::{LIMIT_LATENCY, RATE_LIMITED_TOTAL, REQUEST_TOTAL};
use crate::rate_limit::ANONYMOUS;
use crate::state::AppState;

/// Client key taken from the trusted proxy header, or the shared anonymous bucket.
pub fn client_identifier(headers: &HeaderMap, header_name: &HeaderName) -> String {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(ANONYMOUS)
        .to_string()
}

/// Consumes one unit of quota before the wrapped route runs.
///
/// Attach with `route_layer` to the routes that should be limited.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    REQUEST_TOTAL.inc();

    let identifier = client_identifier(request.headers(), &state.client_ip_header);
    let limiter = state.gate.limiter().await?;

    let start_time = Instant::now();
    let decision = limiter.limit(&identifier).await?;
    LIMIT_LATENCY.observe(start_time.elapsed().as_secs_f64());

    if !decision.success {
        RATE_LIMITED_TOTAL.inc();
        debug!(identifier = %identifier, reset = decision.reset, "rate limited");
        return Ok((StatusCode::TOO_MANY_REQUESTS, "Too many requests").into_response());
    }

    Ok(next.run(request).await)
}
