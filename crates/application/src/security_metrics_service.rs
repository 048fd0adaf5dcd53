//! Security summary, score and alert composition for admin dashboards.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use warden_core::{AppError, AppResult};
use warden_domain::{
    Alert, ReportingPeriod, SecurityScore, SecurityScorePolicy, SecuritySummary,
    check_critical_alerts,
};

use crate::rate_limit_service::ViolationLog;
use crate::security_event_ports::{SecurityEventLog, SecurityEventQuery};


/// Longest lookback accepted by `SecurityMetricsService::score_trend`.
pub const MAX_SCORE_TREND_DAYS: u32 = 90;

/// Window a dashboard aggregates over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DashboardPeriod {
    /// Trailing hour.
    Hour,
    /// Since midnight UTC.
    #[default]
    Day,
    /// Trailing seven days.
    Week,
}

impl DashboardPeriod {
    /// Returns a stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
        }
    }

    /// Parses a transport value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            _ => Err(AppError::Validation(format!(
                "dashboard period must be one of 'hour', 'day', 'week', got '{value}'"
            ))),
        }
    }

    /// Concrete reporting period ending at `now`.
    #[must_use]
    pub fn reporting_period(&self, now: DateTime<Utc>) -> ReportingPeriod {
        match self {
            Self::Hour => ReportingPeriod::trailing(now, Duration::hours(1)),
            Self::Day => {
                let midnight = now
                    .date_naive()
                    .and_hms_opt(0, 0, 0)
                    .map_or(now, |midnight| midnight.and_utc());
                ReportingPeriod::trailing(now, now - midnight)
            }
            Self::Week => ReportingPeriod::trailing(now, Duration::days(7)),
        }
    }
}

/// Summary, alerts and score for one dashboard period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityDashboard {
    /// Aggregated window.
    pub period: DashboardPeriod,
    /// Aggregated counts.
    pub summary: SecuritySummary,
    /// Critical alerts derived from the summary.
    pub alerts: Vec<Alert>,
    /// Score with its deduction breakdown.
    pub score: SecurityScore,
}

/// Security score for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreTrendPoint {
    /// UTC calendar day.
    pub date: NaiveDate,
    /// Score for the day.
    pub score: u8,
    /// Failed logins on the day.
    pub failed_logins: u64,
    /// Alerts raised for the day.
    pub alert_count: usize,
}

/// Application service turning recent events into scores and alerts.
#[derive(Clone)]
pub struct SecurityMetricsService {
    event_log: Arc<dyn SecurityEventLog>,
    violation_log: Arc<dyn ViolationLog>,
    score_policy: Arc<SecurityScorePolicy>,
}

impl SecurityMetricsService {
    /// Creates a metrics service with the default score rule table.
    #[must_use]
    pub fn new(event_log: Arc<dyn SecurityEventLog>, violation_log: Arc<dyn ViolationLog>) -> Self {
        Self {
            event_log,
            violation_log,
            score_policy: Arc::new(SecurityScorePolicy::default()),
        }
    }

    /// Replaces the score rule table.
    #[must_use]
    pub fn with_score_policy(mut self, score_policy: SecurityScorePolicy) -> Self {
        self.score_policy = Arc::new(score_policy);
        self
    }

    /// Aggregates events and violations between `start` and `end`.
    pub async fn generate_summary(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<SecuritySummary> {
        let period = ReportingPeriod::new(start, end)?;
        let events = self
            .event_log
            .list_events(SecurityEventQuery::all_in(period))
            .await?;
        let violations = self
            .violation_log
            .list_between(period.start(), period.end())
            .await?;

        Ok(SecuritySummary::from_events(period, &events, &violations))
    }

    /// Scores a summary against the configured rule table.
    #[must_use]
    pub fn calculate_security_score(&self, summary: &SecuritySummary, alerts: &[Alert]) -> u8 {
        self.score_policy.calculate(summary, alerts)
    }

    /// Evaluates the critical alert rules.
    #[must_use]
    pub fn check_critical_alerts(&self, summary: &SecuritySummary) -> Vec<Alert> {
        check_critical_alerts(summary)
    }

    /// Dashboard for the current day.
    pub async fn dashboard_data(&self) -> AppResult<SecurityDashboard> {
        self.dashboard_for(DashboardPeriod::Day).await
    }

    /// Dashboard for the trailing hour.
    pub async fn hourly_dashboard(&self) -> AppResult<SecurityDashboard> {
        self.dashboard_for(DashboardPeriod::Hour).await
    }

    /// Dashboard for the trailing seven days.
    pub async fn weekly_dashboard(&self) -> AppResult<SecurityDashboard> {
        self.dashboard_for(DashboardPeriod::Week).await
    }

    /// Dashboard for a period ending now.
    pub async fn dashboard_for(&self, period: DashboardPeriod) -> AppResult<SecurityDashboard> {
        self.dashboard_for_at(period, Utc::now()).await
    }

    /// Dashboard for a period ending at `now`.
    pub async fn dashboard_for_at(
        &self,
        period: DashboardPeriod,
        now: DateTime<Utc>,
    ) -> AppResult<SecurityDashboard> {
        let reporting_period = period.reporting_period(now);
        let summary = self
            .generate_summary(reporting_period.start(), reporting_period.end())
            .await?;
        let alerts = self.check_critical_alerts(&summary);
        let score = self.score_policy.evaluate(&summary, &alerts);

        Ok(SecurityDashboard {
            period,
            summary,
            alerts,
            score,
        })
    }

    /// Daily scores for the trailing `days` calendar days, oldest first.
    pub async fn score_trend(&self, days: u32) -> AppResult<Vec<ScoreTrendPoint>> {
        self.score_trend_at(days, Utc::now()).await
    }

    /// Daily scores for the trailing `days` calendar days ending at `now`.
    pub async fn score_trend_at(
        &self,
        days: u32,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ScoreTrendPoint>> {
        if days == 0 || days > MAX_SCORE_TREND_DAYS {
            return Err(AppError::Validation(format!(
                "days must be between 1 and {MAX_SCORE_TREND_DAYS}, got {days}"
            )));
        }

        let today = now.date_naive();
        let first_day = today - Duration::days(i64::from(days) - 1);
        let range_start = first_day
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .ok_or_else(|| AppError::Internal(format!("invalid trend start day {first_day}")))?;
        let range = ReportingPeriod::new(range_start, now)?;

        let events = self
            .event_log
            .list_events(SecurityEventQuery::all_in(range))
            .await?;
        let violations = self
            .violation_log
            .list_between(range.start(), range.end())
            .await?;

        first_day
            .iter_days()
            .take(days as usize)
            .map(|date| {
                let day_start = range_start + Duration::days((date - first_day).num_days());
                let day_end = (day_start + Duration::days(1) - Duration::nanoseconds(1)).min(now);
                let period = ReportingPeriod::new(day_start, day_end)?;
                let summary = SecuritySummary::from_events(period, &events, &violations);
                let alerts = self.check_critical_alerts(&summary);

                Ok(ScoreTrendPoint {
                    date,
                    score: self.calculate_security_score(&summary, &alerts),
                    failed_logins: summary.failed_logins,
                    alert_count: alerts.len(),
                })
            })
            .collect()
    }
}
