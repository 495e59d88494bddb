use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::RedisCredentials;
use crate::error::GatewayError;
use crate::rate_limit::store::{WindowOutcome, WindowRequest, WindowStore};

// Sliding log in a sorted set scored by request time, evaluated atomically
// inside Redis. Returns {remaining, reset_ms}; remaining is -1 when rejected.
const SLIDING_LOG_SCRIPT: &str = r#"
local key = KEYS[1]
local limit = tonumber(ARGV[1])
local now = tonumber(ARGV[2])
local window = tonumber(ARGV[3])
local member = ARGV[4]

redis.call("ZREMRANGEBYSCORE", key, "-inf", now - window)

local count = redis.call("ZCARD", key)
if count >= limit then
  local oldest = redis.call("ZRANGE", key, 0, 0, "WITHSCORES")
  local oldest_ms = now
  if #oldest > 0 then
    oldest_ms = tonumber(oldest[2])
  end
  return {-1, oldest_ms + window}
end

redis.call("ZADD", key, now, member)
redis.call("PEXPIRE", key, window)

local oldest = redis.call("ZRANGE", key, 0, 0, "WITHSCORES")
return {limit - count - 1, tonumber(oldest[2]) + window}
"#;

// REST reply: {"result": ...} or {"error": "..."}
#[derive(Deserialize, Debug)]
struct RestReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Request logs in Redis, reached over the Upstash REST protocol.
pub struct UpstashStore {
    client: reqwest::Client,
    credentials: RedisCredentials,
}

impl UpstashStore {
    pub fn new(client: reqwest::Client, credentials: RedisCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Sends one command as a JSON array and returns its `result`.
    pub async fn command(&self, args: &[String]) -> Result<Value, GatewayError> {
        let res = self
            .client
            .post(self.credentials.url.clone())
            .bearer_auth(&self.credentials.token)
            .json(args)
            .send()
            .await?;

        let status = res.status();
        let reply = res.json::<RestReply>().await?;

        if let Some(error) = reply.error {
            return Err(GatewayError::StoreResponse(error));
        }
        reply
            .result
            .ok_or_else(|| GatewayError::StoreResponse(format!("empty reply (status {status})")))
    }
}

#[async_trait]
impl WindowStore for UpstashStore {
    async fn admit(&self, request: &WindowRequest) -> Result<WindowOutcome, GatewayError> {
        let args = [
            "EVAL".to_string(),
            SLIDING_LOG_SCRIPT.to_string(),
            "1".to_string(),
            request.key.clone(),
            request.limit.to_string(),
            request.now_ms.to_string(),
            request.window_ms.to_string(),
            request.member.clone(),
        ];

        let result = self.command(&args).await?;
        parse_outcome(&result)
    }
}

fn parse_outcome(result: &Value) -> Result<WindowOutcome, GatewayError> {
    let unexpected = || GatewayError::StoreResponse(format!("expected [remaining, reset], got {result}"));

    let (remaining, reset_ms) = match result.as_array().map(Vec::as_slice) {
        Some([remaining, reset]) => (
            remaining.as_i64().ok_or_else(unexpected)?,
            reset.as_u64().ok_or_else(unexpected)?,
        ),
        _ => return Err(unexpected()),
    };

    Ok(WindowOutcome {
        admitted: remaining >= 0,
        remaining: u32::try_from(remaining).unwrap_or(0),
        reset_ms,
    })
}
