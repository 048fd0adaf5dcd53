use async_trait::async_trait;
use tokio::sync::RwLock;

use warden_application::{SecurityEventLog, SecurityEventQuery};
use warden_core::AppResult;
use warden_domain::SecurityEvent;

/// In-memory security event log for development and tests.
#[derive(Default)]
pub struct InMemorySecurityEventLog {
    events: RwLock<Vec<SecurityEvent>>,
}

impl InMemorySecurityEventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an event log preloaded with events.
    #[must_use]
    pub fn with_events(events: Vec<SecurityEvent>) -> Self {
        Self {
            events: RwLock::new(events),
        }
    }

    /// Appends one event.
    pub async fn record_event(&self, event: SecurityEvent) {
        self.events.write().await.push(event);
    }
}

#[async_trait]
impl SecurityEventLog for InMemorySecurityEventLog {
    async fn list_events(&self, query: SecurityEventQuery) -> AppResult<Vec<SecurityEvent>> {
        let events = self.events.read().await;
        let mut listed: Vec<SecurityEvent> = events
            .iter()
            .filter(|event| query.matches(event))
            .cloned()
            .collect();
        listed.sort_by_key(|event| event.occurred_at);
        Ok(listed)
    }
}
