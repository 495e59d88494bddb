use axum::http::HeaderName;

use crate::config::{Args, LimiterSettings};
use crate::rate_limit::RateLimitGate;
use crate::todos::TodoList;
// app's shared state

pub struct AppState {
    pub todos: TodoList,
    pub gate: RateLimitGate,
    pub client_ip_header: HeaderName, // trusted proxy header with the client address
}

impl AppState {
    pub fn new(todos: TodoList, gate: RateLimitGate, client_ip_header: HeaderName) -> Self {
        Self {
            todos,
            gate,
            client_ip_header,
        }
    }

    pub fn from_args(todos: TodoList, args: &Args) -> Self {
        let gate = RateLimitGate::new(LimiterSettings::from_args(args));
        Self::new(todos, gate, args.client_ip_header.clone())
    }
}
