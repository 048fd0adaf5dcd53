use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use warden_application::ViolationLog;
use warden_core::AppResult;
use warden_domain::{ClientIdentifier, ViolationRecord};

/// In-memory violation log keyed by client.
#[derive(Default)]
pub struct InMemoryViolationLog {
    records: RwLock<HashMap<ClientIdentifier, Vec<ViolationRecord>>>,
}

impl InMemoryViolationLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ViolationLog for InMemoryViolationLog {
    async fn append_violation(&self, record: ViolationRecord) -> AppResult<()> {
        self.records
            .write()
            .await
            .entry(record.client.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn list_for_client(&self, client: &ClientIdentifier) -> AppResult<Vec<ViolationRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(client)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<ViolationRecord>> {
        let records = self.records.read().await;
        let mut listed: Vec<ViolationRecord> = records
            .values()
            .flatten()
            .filter(|record| start <= record.occurred_at && record.occurred_at <= end)
            .cloned()
            .collect();
        listed.sort_by_key(|record| record.occurred_at);
        Ok(listed)
    }

    async fn clear_all(&self) -> AppResult<u64> {
        let mut records = self.records.write().await;
        let cleared = records.values().map(Vec::len).sum::<usize>();
        records.clear();
        Ok(u64::try_from(cleared).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use warden_application::ViolationLog;
    use warden_domain::{ClientIdentifier, LimitType, ViolationRecord};

    use super::InMemoryViolationLog;

    fn record(client: &str, limit_type: &str, minutes_ago: i64) -> ViolationRecord {
        ViolationRecord {
            client: ClientIdentifier::new(client).unwrap_or_else(|_| unreachable!()),
            limit_type: LimitType::new(limit_type).unwrap_or_else(|_| unreachable!()),
            occurred_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn lists_violations_per_client_in_append_order() {
        let log = InMemoryViolationLog::new();
        for entry in [
            record("alpha", "login", 3),
            record("beta", "login", 2),
            record("alpha", "register", 1),
        ] {
            assert!(log.append_violation(entry).await.is_ok());
        }

        let alpha = ClientIdentifier::new("alpha").unwrap_or_else(|_| unreachable!());
        let listed = log.list_for_client(&alpha).await.unwrap_or_default();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].limit_type.as_str(), "login");
        assert_eq!(listed[1].limit_type.as_str(), "register");
    }

    #[tokio::test]
    async fn unknown_client_has_no_history() {
        let log = InMemoryViolationLog::new();
        let ghost = ClientIdentifier::new("ghost").unwrap_or_else(|_| unreachable!());

        assert_eq!(log.list_for_client(&ghost).await.ok(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn list_between_filters_across_clients() {
        let log = InMemoryViolationLog::new();
        for entry in [
            record("alpha", "login", 120),
            record("beta", "login", 30),
            record("alpha", "admin", 10),
        ] {
            assert!(log.append_violation(entry).await.is_ok());
        }

        let now = Utc::now();
        let listed = log
            .list_between(now - Duration::hours(1), now)
            .await
            .unwrap_or_default();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].client.as_str(), "beta");
        assert_eq!(listed[1].limit_type.as_str(), "admin");
    }

    #[tokio::test]
    async fn clear_all_returns_removed_count() {
        let log = InMemoryViolationLog::new();
        for entry in [record("alpha", "login", 1), record("beta", "login", 1)] {
            assert!(log.append_violation(entry).await.is_ok());
        }

        assert_eq!(log.clear_all().await.ok(), Some(2));
        assert_eq!(log.clear_all().await.ok(), Some(0));
    }
}
