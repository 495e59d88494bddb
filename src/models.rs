use serde::{Deserialize, Serialize};
use serde_json::Value;

// Todo list file format: {"todos": [...]}
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct TodoFile {
    pub todos: Vec<Value>,
}

// Health endpoint response
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
