//! Redis-backed sliding-window store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::Script;

use warden_application::RateLimitStore;
use warden_core::{AppError, AppResult};
use warden_domain::{LimitConfig, WindowDecision};

// Members are `{now_ms}-{sequence}` so equal timestamps stay distinct.
const TRY_ACQUIRE_SCRIPT: &str = r#"
local window_key = KEYS[1]
local sequence_key = KEYS[2]
local now_ms = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])
local max_requests = tonumber(ARGV[3])

redis.call('ZREMRANGEBYSCORE', window_key, '-inf', now_ms - window_ms)
local current = redis.call('ZCARD', window_key)

if current >= max_requests then
  return {0, current}
end

local sequence = redis.call('INCR', sequence_key)
redis.call('ZADD', window_key, now_ms, now_ms .. '-' .. sequence)
redis.call('PEXPIRE', window_key, window_ms)
redis.call('PEXPIRE', sequence_key, window_ms)

return {1, current + 1}
"#;

const CURRENT_COUNT_SCRIPT: &str = r#"
local window_key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])

redis.call('ZREMRANGEBYSCORE', window_key, '-inf', now_ms - window_ms)
return redis.call('ZCARD', window_key)
"#;

const RESET_SCRIPT: &str = r#"
local existed = redis.call('EXISTS', KEYS[1])
redis.call('DEL', KEYS[1], KEYS[2])
return existed
"#;

/// Redis implementation of the rate limit store port.
///
/// Each window is a sorted set scored by request time in milliseconds.
/// Prune, count and record run inside one Lua script.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisRateLimitStore {
    /// Creates a store with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn window_key(&self, key: &str) -> String {
        format!("{}:window:{key}", self.key_prefix)
    }

    fn sequence_key(&self, key: &str) -> String {
        format!("{}:window:{key}:seq", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| {
                AppError::StorageUnavailable(format!("failed to connect to redis: {error}"))
            })
    }
}

fn window_millis(config: LimitConfig) -> i64 {
    i64::from(config.window_seconds()) * 1_000
}

fn count_from_redis(value: i64) -> AppResult<u32> {
    u32::try_from(value)
        .map_err(|error| AppError::Internal(format!("invalid redis window count: {error}")))
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn try_acquire(
        &self,
        key: &str,
        config: LimitConfig,
        now: DateTime<Utc>,
    ) -> AppResult<WindowDecision> {
        let mut connection = self.connection().await?;

        let script = Script::new(TRY_ACQUIRE_SCRIPT);
        let (admitted, current): (i64, i64) = script
            .key(self.window_key(key))
            .key(self.sequence_key(key))
            .arg(now.timestamp_millis())
            .arg(window_millis(config))
            .arg(config.max_requests())
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::StorageUnavailable(format!(
                    "failed to record redis rate limit attempt: {error}"
                ))
            })?;

        let current_requests = count_from_redis(current)?;
        if admitted == 1 {
            Ok(WindowDecision::Admitted { current_requests })
        } else {
            Ok(WindowDecision::Denied { current_requests })
        }
    }

    async fn current_count(
        &self,
        key: &str,
        config: LimitConfig,
        now: DateTime<Utc>,
    ) -> AppResult<u32> {
        let mut connection = self.connection().await?;

        let script = Script::new(CURRENT_COUNT_SCRIPT);
        let current: i64 = script
            .key(self.window_key(key))
            .arg(now.timestamp_millis())
            .arg(window_millis(config))
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::StorageUnavailable(format!(
                    "failed to read redis rate limit window: {error}"
                ))
            })?;

        count_from_redis(current)
    }

    async fn reset(&self, key: &str) -> AppResult<bool> {
        let mut connection = self.connection().await?;

        let script = Script::new(RESET_SCRIPT);
        let existed: i64 = script
            .key(self.window_key(key))
            .key(self.sequence_key(key))
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::StorageUnavailable(format!(
                    "failed to reset redis rate limit window: {error}"
                ))
            })?;

        Ok(existed > 0)
    }
}
