use chrono::{Duration, Utc};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use warden_application::{SecurityEventLog, SecurityEventQuery};
use warden_domain::{EventOutcome, ReportingPeriod, SecurityEvent, SecurityEventKind};

use super::PostgresSecurityEventLog;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres security event tests: {error}");
    }

    Some(pool)
}

// Events land far in the past so concurrent runs against a shared database
// only see their own rows.
fn isolated_anchor() -> chrono::DateTime<Utc> {
    let offset_minutes = Utc::now().timestamp_subsec_micros() % 500_000;
    Utc::now() - Duration::days(3_650) - Duration::minutes(i64::from(offset_minutes) * 10)
}

#[tokio::test]
async fn lists_events_in_period_filtered_by_kind() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let log = PostgresSecurityEventLog::new(pool);
    let anchor = isolated_anchor();

    for event in [
        SecurityEvent::new(
            SecurityEventKind::Login,
            EventOutcome::Failure,
            anchor - Duration::minutes(3),
            Some("10.0.0.1".to_owned()),
        ),
        SecurityEvent::new(
            SecurityEventKind::CsrfViolation,
            EventOutcome::Failure,
            anchor - Duration::minutes(2),
            None,
        ),
        SecurityEvent::new(
            SecurityEventKind::Login,
            EventOutcome::Success,
            anchor - Duration::minutes(1),
            Some("10.0.0.2".to_owned()),
        ),
    ] {
        assert!(log.append_event(&event).await.is_ok());
    }

    let period = ReportingPeriod::trailing(anchor, Duration::minutes(5));

    let all_events = log
        .list_events(SecurityEventQuery::all_in(period))
        .await
        .unwrap_or_default();
    assert_eq!(all_events.len(), 3);
    assert_eq!(all_events[1].kind, SecurityEventKind::CsrfViolation);

    let logins = log.list_login_events(period).await.unwrap_or_default();
    assert_eq!(logins.len(), 2);
    assert!(!logins[0].success);
    assert!(logins[1].success);
    assert_eq!(logins[1].source_ip.as_deref(), Some("10.0.0.2"));
}

#[tokio::test]
async fn events_outside_period_are_excluded() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let log = PostgresSecurityEventLog::new(pool);
    let anchor = isolated_anchor();

    let event = SecurityEvent::new(
        SecurityEventKind::Registration,
        EventOutcome::Success,
        anchor - Duration::hours(2),
        None,
    );
    assert!(log.append_event(&event).await.is_ok());

    let period = ReportingPeriod::trailing(anchor, Duration::hours(1));
    let events = log
        .list_events(SecurityEventQuery {
            start: period.start(),
            end: period.end(),
            kinds: vec![SecurityEventKind::Registration],
        })
        .await;

    assert_eq!(events.ok(), Some(Vec::new()));
}
