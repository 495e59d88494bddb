use prometheus::{Encoder, TextEncoder};

use crate::error::GatewayError;

// Prometheus text exposition of the default registry
pub async fn metrics_handler() -> Result<String, GatewayError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| GatewayError::Metrics(prometheus::Error::Msg(e.to_string())))
}
