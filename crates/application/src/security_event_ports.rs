use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::AppResult;
use warden_domain::{LoginEvent, ReportingPeriod, SecurityEvent, SecurityEventKind};

/// Query parameters for reading the security event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityEventQuery {
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Inclusive upper bound.
    pub end: DateTime<Utc>,
    /// Kinds to include; empty includes every kind.
    pub kinds: Vec<SecurityEventKind>,
}

impl SecurityEventQuery {
    /// Query for every event kind inside the period.
    #[must_use]
    pub fn all_in(period: ReportingPeriod) -> Self {
        Self {
            start: period.start(),
            end: period.end(),
            kinds: Vec::new(),
        }
    }

    /// Query for login events inside the period.
    #[must_use]
    pub fn logins_in(period: ReportingPeriod) -> Self {
        Self {
            start: period.start(),
            end: period.end(),
            kinds: vec![SecurityEventKind::Login],
        }
    }

    /// Returns whether an event satisfies the query.
    #[must_use]
    pub fn matches(&self, event: &SecurityEvent) -> bool {
        self.start <= event.occurred_at
            && event.occurred_at <= self.end
            && (self.kinds.is_empty() || self.kinds.contains(&event.kind))
    }
}

/// Read-only port over the external audit/login/CSRF event log.
#[async_trait]
pub trait SecurityEventLog: Send + Sync {
    /// Lists matching events ordered by time.
    async fn list_events(&self, query: SecurityEventQuery) -> AppResult<Vec<SecurityEvent>>;

    /// Lists login attempts inside the period.
    async fn list_login_events(&self, period: ReportingPeriod) -> AppResult<Vec<LoginEvent>> {
        Ok(self
            .list_events(SecurityEventQuery::logins_in(period))
            .await?
            .iter()
            .filter_map(SecurityEvent::as_login_event)
            .collect())
    }
}
