use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use warden_core::{AppError, AppResult};
use warden_domain::{AnomalyThresholds, EventOutcome, SecurityEvent, SecurityEventKind};

use crate::security_event_ports::{SecurityEventLog, SecurityEventQuery};

use super::LoginAnalyticsService;

struct FakeSecurityEventLog {
    events: Vec<SecurityEvent>,
}

#[async_trait]
impl SecurityEventLog for FakeSecurityEventLog {
    async fn list_events(&self, query: SecurityEventQuery) -> AppResult<Vec<SecurityEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|event| query.matches(event))
            .cloned()
            .collect())
    }
}

fn now() -> DateTime<Utc> {
    // Friday 2026-10-16 12:00 UTC.
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

fn login(hours_ago: i64, success: bool) -> SecurityEvent {
    SecurityEvent::new(
        SecurityEventKind::Login,
        if success {
            EventOutcome::Success
        } else {
            EventOutcome::Failure
        },
        now() - Duration::hours(hours_ago),
        Some("10.0.0.1".to_owned()),
    )
}

fn service(events: Vec<SecurityEvent>) -> LoginAnalyticsService {
    LoginAnalyticsService::new(Arc::new(FakeSecurityEventLog { events }))
}

#[tokio::test]
async fn heatmap_counts_only_trailing_logins() {
    let events = vec![
        login(1, true),
        login(1, false),
        login(24 * 10, true),
        SecurityEvent::new(
            SecurityEventKind::CsrfViolation,
            EventOutcome::Failure,
            now() - Duration::hours(1),
            None,
        ),
    ];
    let matrix = service(events)
        .build_heatmap_at(7, now())
        .await
        .unwrap_or_else(|error| panic!("heatmap failed: {error}"));

    assert_eq!(matrix.total(), 2);
    assert_eq!(matrix.get(5, 11), 2);
}

#[tokio::test]
async fn heatmap_rejects_out_of_range_days() {
    let analytics = service(Vec::new());
    assert!(matches!(
        analytics.build_heatmap_at(0, now()).await,
        Err(AppError::Validation(_))
    ));
    assert!(analytics.build_heatmap_at(366, now()).await.is_err());
}

#[tokio::test]
async fn heatmap_report_without_activity_has_no_peak() {
    let report = service(Vec::new())
        .heatmap_report_at(30, now())
        .await
        .unwrap_or_else(|error| panic!("report failed: {error}"));

    assert_eq!(report.total_logins, 0);
    assert_eq!(report.peak.max_logins, 0);
    assert!(report.peak.peak_times.is_empty());
    assert_eq!(report.quiet_periods.len(), 168);
}

#[tokio::test]
async fn quiet_threshold_is_configurable() {
    let events = vec![login(1, true), login(1, true), login(2, true)];
    let analytics = service(events).with_quiet_threshold(0);
    let report = analytics
        .heatmap_report_at(7, now())
        .await
        .unwrap_or_else(|error| panic!("report failed: {error}"));

    assert_eq!(report.quiet_periods.len(), 166);
    assert_eq!(report.peak.max_logins, 2);
}

#[tokio::test]
async fn hourly_distribution_splits_outcomes() {
    let events = vec![login(1, true), login(1, false), login(25, false)];
    let buckets = service(events)
        .hourly_distribution_at(7, now())
        .await
        .unwrap_or_else(|error| panic!("distribution failed: {error}"));

    assert_eq!(buckets.len(), 24);
    assert_eq!(buckets[11].successful_logins, 1);
    assert_eq!(buckets[11].failed_logins, 2);
    assert_eq!(buckets[11].hour_label, "11:00");
}

#[tokio::test]
async fn weekly_trends_handle_empty_weeks() {
    let events = vec![login(1, true), login(2, false), login(3, true)];
    let trends = service(events)
        .weekly_trends_at(3, now())
        .await
        .unwrap_or_else(|error| panic!("trends failed: {error}"));

    assert_eq!(trends.len(), 3);
    assert_eq!(trends[0].success_rate, 0.0);
    assert_eq!(trends[1].success_rate, 0.0);
    assert_eq!(trends[2].successful_logins, 2);
    assert_eq!(trends[2].success_rate, 66.67);
    assert_eq!(trends[2].week_label, "Oct 09 - Oct 16");
}

#[tokio::test]
async fn weekly_trends_validate_lookback() {
    assert!(service(Vec::new()).weekly_trends_at(0, now()).await.is_err());
}

#[tokio::test]
async fn anomaly_thresholds_are_injectable() {
    // Two failures out of five: 0.4 failure ratio.
    let events = vec![
        login(1, true),
        login(2, true),
        login(3, true),
        login(4, false),
        login(5, false),
    ];

    let default_report = service(events.clone())
        .detect_anomalies_at(7, now())
        .await
        .unwrap_or_else(|error| panic!("anomalies failed: {error}"));
    assert!(default_report.unusual_failure_ratio);

    let lenient = AnomalyThresholds::new(5.0, 0.5, [2, 3, 4, 5], 0.2)
        .unwrap_or_else(|error| panic!("invalid thresholds: {error}"));
    let lenient_report = service(events)
        .with_thresholds(lenient)
        .detect_anomalies_at(7, now())
        .await
        .unwrap_or_else(|error| panic!("anomalies failed: {error}"));
    assert!(!lenient_report.unusual_failure_ratio);
}
