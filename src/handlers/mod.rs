mod health;
mod metrics;
mod rate_limit;
mod todos;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use rate_limit::{client_identifier, rate_limit_middleware};
pub use todos::todo_handler;
