//! Temporal login analytics for anomaly triage.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use warden_core::AppResult;
use warden_domain::{
    AnomalyReport, AnomalyThresholds, DEFAULT_QUIET_THRESHOLD, HeatmapMatrix, HeatmapSlot,
    HourlyLoginBucket, LoginEvent, PeakActivity, ReportingPeriod, WeeklyLoginTrend,
    detect_anomalies, hourly_distribution, validate_heatmap_days, validate_trend_weeks,
    weekly_trends,
};

use crate::security_event_ports::SecurityEventLog;

#[cfg(test)]
mod tests;

/// Heatmap with its derived peak and quiet periods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapReport {
    /// Trailing window in days.
    pub days: u32,
    /// Day x hour login counts.
    pub matrix: HeatmapMatrix,
    /// Sum of all cells.
    pub total_logins: u64,
    /// Busiest cells.
    pub peak: PeakActivity,
    /// Cells at or below the quiet threshold.
    pub quiet_periods: Vec<HeatmapSlot>,
}

/// Application service for login-pattern analytics.
#[derive(Clone)]
pub struct LoginAnalyticsService {
    event_log: Arc<dyn SecurityEventLog>,
    thresholds: Arc<AnomalyThresholds>,
    quiet_threshold: u32,
}

impl LoginAnalyticsService {
    /// Creates an analytics service with default thresholds.
    #[must_use]
    pub fn new(event_log: Arc<dyn SecurityEventLog>) -> Self {
        Self {
            event_log,
            thresholds: Arc::new(AnomalyThresholds::default()),
            quiet_threshold: DEFAULT_QUIET_THRESHOLD,
        }
    }

    /// Replaces the anomaly thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: AnomalyThresholds) -> Self {
        self.thresholds = Arc::new(thresholds);
        self
    }

    /// Replaces the quiet-period threshold.
    #[must_use]
    pub fn with_quiet_threshold(mut self, quiet_threshold: u32) -> Self {
        self.quiet_threshold = quiet_threshold;
        self
    }

    /// Builds the day x hour heatmap for the trailing `days` days.
    pub async fn build_heatmap(&self, days: u32) -> AppResult<HeatmapMatrix> {
        self.build_heatmap_at(days, Utc::now()).await
    }

    /// Builds the heatmap for the `days` days ending at `now`.
    pub async fn build_heatmap_at(&self, days: u32, now: DateTime<Utc>) -> AppResult<HeatmapMatrix> {
        let logins = self.trailing_logins(days, now).await?;
        Ok(HeatmapMatrix::from_logins(&logins))
    }

    /// Finds the busiest cells, reporting every tie.
    #[must_use]
    pub fn find_peak_activity(&self, matrix: &HeatmapMatrix) -> PeakActivity {
        matrix.peak_activity()
    }

    /// Lists cells at or below the quiet threshold.
    #[must_use]
    pub fn find_quiet_periods(&self, matrix: &HeatmapMatrix) -> Vec<HeatmapSlot> {
        matrix.quiet_periods(self.quiet_threshold)
    }

    /// Heatmap with peak and quiet periods for the trailing `days` days.
    pub async fn heatmap_report(&self, days: u32) -> AppResult<HeatmapReport> {
        self.heatmap_report_at(days, Utc::now()).await
    }

    /// Heatmap report for the `days` days ending at `now`.
    pub async fn heatmap_report_at(&self, days: u32, now: DateTime<Utc>) -> AppResult<HeatmapReport> {
        let matrix = self.build_heatmap_at(days, now).await?;

        Ok(HeatmapReport {
            days,
            total_logins: matrix.total(),
            peak: self.find_peak_activity(&matrix),
            quiet_periods: self.find_quiet_periods(&matrix),
            matrix,
        })
    }

    /// Hour-of-day distribution for the trailing `days` days.
    pub async fn hourly_distribution(&self, days: u32) -> AppResult<Vec<HourlyLoginBucket>> {
        self.hourly_distribution_at(days, Utc::now()).await
    }

    /// Hour-of-day distribution for the `days` days ending at `now`.
    pub async fn hourly_distribution_at(
        &self,
        days: u32,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<HourlyLoginBucket>> {
        let logins = self.trailing_logins(days, now).await?;
        Ok(hourly_distribution(&logins))
    }

    /// Weekly login totals for the trailing `weeks_back` weeks, oldest first.
    pub async fn weekly_trends(&self, weeks_back: u32) -> AppResult<Vec<WeeklyLoginTrend>> {
        self.weekly_trends_at(weeks_back, Utc::now()).await
    }

    /// Weekly login totals ending at `now`.
    pub async fn weekly_trends_at(
        &self,
        weeks_back: u32,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<WeeklyLoginTrend>> {
        validate_trend_weeks(weeks_back)?;
        let period = ReportingPeriod::trailing(now, Duration::weeks(i64::from(weeks_back)));
        let logins = self.event_log.list_login_events(period).await?;

        Ok(weekly_trends(&logins, now, weeks_back))
    }

    /// Runs the anomaly heuristics over the trailing `days` days.
    pub async fn detect_anomalies(&self, days: u32) -> AppResult<AnomalyReport> {
        self.detect_anomalies_at(days, Utc::now()).await
    }

    /// Runs the anomaly heuristics over the `days` days ending at `now`.
    pub async fn detect_anomalies_at(
        &self,
        days: u32,
        now: DateTime<Utc>,
    ) -> AppResult<AnomalyReport> {
        let logins = self.trailing_logins(days, now).await?;
        Ok(detect_anomalies(&logins, &self.thresholds))
    }

    async fn trailing_logins(&self, days: u32, now: DateTime<Utc>) -> AppResult<Vec<LoginEvent>> {
        validate_heatmap_days(days)?;
        let period = ReportingPeriod::trailing(now, Duration::days(i64::from(days)));
        self.event_log.list_login_events(period).await
    }
}
