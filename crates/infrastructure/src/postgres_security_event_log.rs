use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::warn;

use warden_application::{SecurityEventLog, SecurityEventQuery};
use warden_core::{AppError, AppResult};
use warden_domain::{EventOutcome, SecurityEvent, SecurityEventKind};

/// PostgreSQL-backed reader over the `security_events` table.
#[derive(Clone)]
pub struct PostgresSecurityEventLog {
    pool: PgPool,
}

impl PostgresSecurityEventLog {
    /// Creates a log with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends one event. Used by producers sharing the table and by tests.
    pub async fn append_event(&self, event: &SecurityEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO security_events (
                event_type,
                outcome,
                source_ip,
                occurred_at
            )
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(event.kind.as_str())
        .bind(event.outcome.as_str())
        .bind(event.source_ip.as_deref())
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StorageUnavailable(format!("failed to append security event: {error}"))
        })?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct SecurityEventRow {
    event_type: String,
    outcome: String,
    source_ip: Option<String>,
    occurred_at: DateTime<Utc>,
}

impl SecurityEventRow {
    fn into_event(self) -> Option<SecurityEvent> {
        let kind = SecurityEventKind::from_str(&self.event_type);
        let outcome = EventOutcome::from_str(&self.outcome);
        match (kind, outcome) {
            (Ok(kind), Ok(outcome)) => Some(SecurityEvent::new(
                kind,
                outcome,
                self.occurred_at,
                self.source_ip,
            )),
            (Err(error), _) | (_, Err(error)) => {
                warn!(
                    event_type = %self.event_type,
                    outcome = %self.outcome,
                    %error,
                    "skipping unreadable security event row"
                );
                None
            }
        }
    }
}

#[async_trait]
impl SecurityEventLog for PostgresSecurityEventLog {
    async fn list_events(&self, query: SecurityEventQuery) -> AppResult<Vec<SecurityEvent>> {
        let kinds = if query.kinds.is_empty() {
            SecurityEventKind::all()
        } else {
            query.kinds.as_slice()
        };
        let event_types: Vec<&str> = kinds.iter().map(SecurityEventKind::as_str).collect();

        let rows = sqlx::query_as::<_, SecurityEventRow>(
            r#"
            SELECT
                event_type,
                outcome,
                source_ip,
                occurred_at
            FROM security_events
            WHERE occurred_at >= $1
                AND occurred_at <= $2
                AND event_type = ANY($3)
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(query.start)
        .bind(query.end)
        .bind(event_types)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::StorageUnavailable(format!("failed to list security events: {error}"))
        })?;

        Ok(rows
            .into_iter()
            .filter_map(SecurityEventRow::into_event)
            .collect())
    }
}

#[cfg(test)]
mod tests;
