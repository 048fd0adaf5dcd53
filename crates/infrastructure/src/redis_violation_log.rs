//! Redis-backed violation log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Script};
use tracing::warn;

use warden_application::ViolationLog;
use warden_core::{AppError, AppResult};
use warden_domain::{ClientIdentifier, ViolationRecord};

const CLEAR_ALL_SCRIPT: &str = r#"
local index_key = KEYS[1]
local list_prefix = ARGV[1]
local cleared = 0

for _, client in ipairs(redis.call('SMEMBERS', index_key)) do
  local list_key = list_prefix .. client
  cleared = cleared + redis.call('LLEN', list_key)
  redis.call('DEL', list_key)
end

redis.call('DEL', index_key)
return cleared
"#;

/// Redis implementation of the violation log port.
///
/// Records are JSON entries in one list per client. A set of client
/// identifiers indexes the namespace so it can be cleared in one script.
#[derive(Clone)]
pub struct RedisViolationLog {
    client: redis::Client,
    key_prefix: String,
}

impl RedisViolationLog {
    /// Creates a log with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn list_prefix(&self) -> String {
        format!("{}:violations:client:", self.key_prefix)
    }

    fn list_key(&self, client: &ClientIdentifier) -> String {
        format!("{}{client}", self.list_prefix())
    }

    fn index_key(&self) -> String {
        format!("{}:violations:index", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| {
                AppError::StorageUnavailable(format!("failed to connect to redis: {error}"))
            })
    }

    async fn read_list(
        &self,
        connection: &mut redis::aio::MultiplexedConnection,
        client: &ClientIdentifier,
    ) -> AppResult<Vec<ViolationRecord>> {
        let entries: Vec<String> = connection
            .lrange(self.list_key(client), 0, -1)
            .await
            .map_err(|error| {
                AppError::StorageUnavailable(format!("failed to read violations: {error}"))
            })?;

        Ok(entries
            .iter()
            .filter_map(|entry| match serde_json::from_str::<ViolationRecord>(entry) {
                Ok(record) => Some(record),
                Err(error) => {
                    warn!(client = %client, %error, "skipping malformed violation entry");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl ViolationLog for RedisViolationLog {
    async fn append_violation(&self, record: ViolationRecord) -> AppResult<()> {
        let payload = serde_json::to_string(&record).map_err(|error| {
            AppError::Internal(format!("failed to serialize violation record: {error}"))
        })?;
        let mut connection = self.connection().await?;

        redis::pipe()
            .atomic()
            .rpush(self.list_key(&record.client), payload)
            .ignore()
            .sadd(self.index_key(), record.client.as_str())
            .ignore()
            .query_async::<()>(&mut connection)
            .await
            .map_err(|error| {
                AppError::StorageUnavailable(format!("failed to append violation: {error}"))
            })
    }

    async fn list_for_client(&self, client: &ClientIdentifier) -> AppResult<Vec<ViolationRecord>> {
        let mut connection = self.connection().await?;
        self.read_list(&mut connection, client).await
    }

    async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<ViolationRecord>> {
        let mut connection = self.connection().await?;
        let clients: Vec<String> = connection
            .smembers(self.index_key())
            .await
            .map_err(|error| {
                AppError::StorageUnavailable(format!("failed to read violation index: {error}"))
            })?;

        let mut listed = Vec::new();
        for client in clients {
            let Ok(client) = ClientIdentifier::new(client) else {
                continue;
            };
            listed.extend(
                self.read_list(&mut connection, &client)
                    .await?
                    .into_iter()
                    .filter(|record| start <= record.occurred_at && record.occurred_at <= end),
            );
        }

        listed.sort_by_key(|record| record.occurred_at);
        Ok(listed)
    }

    async fn clear_all(&self) -> AppResult<u64> {
        let mut connection = self.connection().await?;

        let script = Script::new(CLEAR_ALL_SCRIPT);
        let cleared: i64 = script
            .key(self.index_key())
            .arg(self.list_prefix())
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::StorageUnavailable(format!("failed to clear violations: {error}"))
            })?;

        Ok(u64::try_from(cleared).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use warden_application::ViolationLog;
    use warden_domain::{ClientIdentifier, LimitType, ViolationRecord};

    use super::RedisViolationLog;

    fn test_log() -> Option<RedisViolationLog> {
        let Ok(redis_url) = std::env::var("REDIS_URL") else {
            return None;
        };

        let client = match redis::Client::open(redis_url.as_str()) {
            Ok(client) => client,
            Err(error) => panic!("failed to open REDIS_URL in test: {error}"),
        };
        let prefix = format!(
            "warden-test-{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );

        Some(RedisViolationLog::new(client, prefix))
    }

    fn client(value: &str) -> ClientIdentifier {
        ClientIdentifier::new(value).unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn append_list_and_clear_roundtrip() {
        let Some(log) = test_log() else {
            return;
        };
        let now = Utc::now();

        for (identifier, minutes_ago) in [("alpha", 90), ("alpha", 5), ("beta", 1)] {
            let appended = log
                .append_violation(ViolationRecord {
                    client: client(identifier),
                    limit_type: LimitType::new("login").unwrap_or_else(|_| unreachable!()),
                    occurred_at: now - Duration::minutes(minutes_ago),
                })
                .await;
            assert!(appended.is_ok());
        }

        let alpha = log
            .list_for_client(&client("alpha"))
            .await
            .unwrap_or_default();
        assert_eq!(alpha.len(), 2);

        let recent = log
            .list_between(now - Duration::hours(1), now)
            .await
            .unwrap_or_default();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].client.as_str(), "beta");

        assert_eq!(log.clear_all().await.ok(), Some(3));
        assert_eq!(
            log.list_for_client(&client("alpha")).await.ok(),
            Some(Vec::new())
        );
    }
}
