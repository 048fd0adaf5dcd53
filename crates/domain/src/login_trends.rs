use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::Serialize;
use warden_core::{AppError, AppResult};

use crate::{HeatmapMatrix, HeatmapSlot, LoginEvent};

/// Longest lookback accepted for weekly trends.
pub const MAX_TREND_WEEKS: u32 = 52;

/// Validates a weekly trend lookback.
pub fn validate_trend_weeks(weeks_back: u32) -> AppResult<()> {
    if weeks_back == 0 || weeks_back > MAX_TREND_WEEKS {
        return Err(AppError::Validation(format!(
            "weeks must be between 1 and {MAX_TREND_WEEKS}, got {weeks_back}"
        )));
    }

    Ok(())
}

/// Percentage of successful logins rounded to two decimals; `0` without logins.
#[must_use]
pub fn success_rate(successful: u64, failed: u64) -> f64 {
    let total = successful + failed;
    if total == 0 {
        return 0.0;
    }

    let rate = successful as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Logins for one hour of the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyLoginBucket {
    /// Hour of day in UTC.
    pub hour: u32,
    /// Successful logins in the hour.
    pub successful_logins: u64,
    /// Failed logins in the hour.
    pub failed_logins: u64,
    /// `HH:00` label.
    pub hour_label: String,
}

/// Splits logins into 24 hour-of-day buckets.
#[must_use]
pub fn hourly_distribution(events: &[LoginEvent]) -> Vec<HourlyLoginBucket> {
    let mut buckets: Vec<HourlyLoginBucket> = (0..24)
        .map(|hour| HourlyLoginBucket {
            hour,
            successful_logins: 0,
            failed_logins: 0,
            hour_label: format!("{hour:02}:00"),
        })
        .collect();

    for event in events {
        if let Some(bucket) = buckets.get_mut(event.occurred_at.hour() as usize) {
            if event.success {
                bucket.successful_logins += 1;
            } else {
                bucket.failed_logins += 1;
            }
        }
    }

    buckets
}

/// Login totals for one seven-day window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyLoginTrend {
    /// Window start, inclusive.
    pub week_start: DateTime<Utc>,
    /// Window end, exclusive.
    pub week_end: DateTime<Utc>,
    /// `Mon DD - Mon DD` label.
    pub week_label: String,
    /// Successful logins in the window.
    pub successful_logins: u64,
    /// Failed logins in the window.
    pub failed_logins: u64,
    /// Success percentage rounded to two decimals.
    pub success_rate: f64,
}

/// Groups logins into `weeks_back` seven-day windows ending at `now`, oldest first.
///
/// Windows are half-open except the newest, which includes `now`.
#[must_use]
pub fn weekly_trends(
    events: &[LoginEvent],
    now: DateTime<Utc>,
    weeks_back: u32,
) -> Vec<WeeklyLoginTrend> {
    (0..weeks_back)
        .rev()
        .map(|weeks_ago| {
            let week_end = now - Duration::weeks(i64::from(weeks_ago));
            let week_start = week_end - Duration::weeks(1);

            // The newest week also keeps logins stamped exactly at `now`.
            let closes_at_now = weeks_ago == 0;
            let (successful_logins, failed_logins) = events
                .iter()
                .filter(|event| {
                    week_start <= event.occurred_at
                        && (event.occurred_at < week_end
                            || (closes_at_now && event.occurred_at == week_end))
                })
                .fold((0_u64, 0_u64), |(successful, failed), event| {
                    if event.success {
                        (successful + 1, failed)
                    } else {
                        (successful, failed + 1)
                    }
                });

            WeeklyLoginTrend {
                week_start,
                week_end,
                week_label: format!(
                    "{} - {}",
                    week_start.format("%b %d"),
                    week_end.format("%b %d")
                ),
                successful_logins,
                failed_logins,
                success_rate: success_rate(successful_logins, failed_logins),
            }
        })
        .collect()
}

/// Tunable thresholds for the advisory anomaly heuristics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyThresholds {
    spike_multiplier: f64,
    failure_ratio: f64,
    night_hours: BTreeSet<u32>,
    night_share: f64,
}

impl AnomalyThresholds {
    /// Creates validated thresholds.
    pub fn new(
        spike_multiplier: f64,
        failure_ratio: f64,
        night_hours: impl IntoIterator<Item = u32>,
        night_share: f64,
    ) -> AppResult<Self> {
        if !spike_multiplier.is_finite() || spike_multiplier <= 1.0 {
            return Err(AppError::Validation(format!(
                "spike multiplier must be a finite value above 1, got {spike_multiplier}"
            )));
        }

        for (name, value) in [("failure ratio", failure_ratio), ("night share", night_share)] {
            if !value.is_finite() || value <= 0.0 || value >= 1.0 {
                return Err(AppError::Validation(format!(
                    "{name} must be strictly between 0 and 1, got {value}"
                )));
            }
        }

        let night_hours: BTreeSet<u32> = night_hours.into_iter().collect();
        if night_hours.is_empty() {
            return Err(AppError::Validation(
                "night hours must not be empty".to_owned(),
            ));
        }
        if let Some(hour) = night_hours.iter().find(|hour| **hour > 23) {
            return Err(AppError::Validation(format!(
                "night hour {hour} is outside 0..=23"
            )));
        }

        Ok(Self {
            spike_multiplier,
            failure_ratio,
            night_hours,
            night_share,
        })
    }

    /// Multiple of the baseline a cell must exceed to count as a spike.
    #[must_use]
    pub fn spike_multiplier(&self) -> f64 {
        self.spike_multiplier
    }

    /// Failure ratio above which a period is flagged.
    #[must_use]
    pub fn failure_ratio(&self) -> f64 {
        self.failure_ratio
    }

    /// Hours of day treated as night.
    #[must_use]
    pub fn night_hours(&self) -> &BTreeSet<u32> {
        &self.night_hours
    }

    /// Share of logins at night above which night activity is flagged.
    #[must_use]
    pub fn night_share(&self) -> f64 {
        self.night_share
    }
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            spike_multiplier: 5.0,
            failure_ratio: 0.3,
            night_hours: (2..=5).collect(),
            night_share: 0.2,
        }
    }
}

/// Failure ratio of one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyFailureRatio {
    /// Calendar day in UTC.
    pub date: NaiveDate,
    /// Successful logins on the day.
    pub successful_logins: u64,
    /// Failed logins on the day.
    pub failed_logins: u64,
    /// `failed / (failed + successful)` for the day.
    pub failure_ratio: f64,
}

/// Advisory anomaly flags for a login history window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    /// Any cell exceeded the spike multiple of its baseline.
    pub spike: bool,
    /// Mean count over active heatmap cells.
    pub baseline: f64,
    /// Cells that exceeded the spike multiple of the other active cells' mean.
    pub spike_slots: Vec<HeatmapSlot>,
    /// Night logins exceeded the configured share.
    pub unusual_night_activity: bool,
    /// Logins inside the configured night hours.
    pub night_logins: u64,
    /// The whole window or any single day exceeded the failure ratio threshold.
    pub unusual_failure_ratio: bool,
    /// `failed / (failed + successful)` over the whole window, `0` without logins.
    pub failure_ratio: f64,
    /// Days whose own failure ratio exceeded the threshold, oldest first.
    pub failure_ratio_days: Vec<DailyFailureRatio>,
}

/// Evaluates the spike, night-activity and failure-ratio heuristics independently.
///
/// A cell is a spike when it exceeds the multiplier times the mean of the
/// other active cells, so a lone burst is measured against the quiet hours
/// around it. A single active cell has nothing to compare against.
#[must_use]
pub fn detect_anomalies(events: &[LoginEvent], thresholds: &AnomalyThresholds) -> AnomalyReport {
    let matrix = HeatmapMatrix::from_logins(events);
    let (active_cells, active_total) = matrix
        .slots()
        .filter(|(_, _, count)| *count > 0)
        .fold((0_u32, 0_u64), |(cells, total), (_, _, count)| {
            (cells + 1, total + u64::from(count))
        });
    let spike_slots: Vec<HeatmapSlot> = matrix
        .slots()
        .filter(|(_, _, count)| {
            if *count == 0 || active_cells < 2 {
                return false;
            }
            let others = (active_total - u64::from(*count)) as f64 / f64::from(active_cells - 1);
            f64::from(*count) > others * thresholds.spike_multiplier()
        })
        .map(|(day, hour, count)| HeatmapSlot::new(day, hour, count))
        .collect();

    let total = events.len() as u64;
    let night_logins = events
        .iter()
        .filter(|event| thresholds.night_hours().contains(&event.occurred_at.hour()))
        .count() as u64;
    let night_ratio = if total == 0 {
        0.0
    } else {
        night_logins as f64 / total as f64
    };

    let failed = events.iter().filter(|event| !event.success).count() as u64;
    let failure_ratio = if total == 0 {
        0.0
    } else {
        failed as f64 / total as f64
    };
    let failure_ratio_days: Vec<DailyFailureRatio> = daily_failure_ratios(events)
        .into_iter()
        .filter(|day| day.failure_ratio > thresholds.failure_ratio())
        .collect();

    AnomalyReport {
        spike: !spike_slots.is_empty(),
        baseline: matrix.active_cell_mean(),
        spike_slots,
        unusual_night_activity: night_ratio > thresholds.night_share(),
        night_logins,
        unusual_failure_ratio: failure_ratio > thresholds.failure_ratio()
            || !failure_ratio_days.is_empty(),
        failure_ratio,
        failure_ratio_days,
    }
}

/// Per-day failure ratios for days with at least one login, oldest first.
#[must_use]
pub fn daily_failure_ratios(events: &[LoginEvent]) -> Vec<DailyFailureRatio> {
    let mut days: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    for event in events {
        let (successful, failed) = days.entry(event.occurred_at.date_naive()).or_default();
        if event.success {
            *successful += 1;
        } else {
            *failed += 1;
        }
    }

    days.into_iter()
        .map(|(date, (successful_logins, failed_logins))| DailyFailureRatio {
            date,
            successful_logins,
            failed_logins,
            failure_ratio: failed_logins as f64 / (successful_logins + failed_logins) as f64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{
        AnomalyThresholds, daily_failure_ratios, detect_anomalies, hourly_distribution,
        success_rate, validate_trend_weeks, weekly_trends,
    };
    use crate::LoginEvent;

    fn login(hours_offset: i64, success: bool) -> LoginEvent {
        // 2026-03-02 is a Monday.
        let base = Utc
            .with_ymd_and_hms(2026, 3, 2, 0, 30, 0)
            .single()
            .unwrap_or_default();
        LoginEvent {
            occurred_at: base + Duration::hours(hours_offset),
            success,
            source_ip: Some("10.0.0.1".to_owned()),
        }
    }

    #[test]
    fn success_rate_handles_empty_week() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(2, 1), 66.67);
        assert_eq!(success_rate(5, 0), 100.0);
    }

    #[test]
    fn trend_weeks_are_validated() {
        assert!(validate_trend_weeks(0).is_err());
        assert!(validate_trend_weeks(53).is_err());
        assert!(validate_trend_weeks(4).is_ok());
    }

    #[test]
    fn hourly_distribution_has_24_labelled_buckets() {
        let events = vec![login(9, true), login(9, false), login(33, true)];
        let buckets = hourly_distribution(&events);

        assert_eq!(buckets.len(), 24);
        assert_eq!(buckets[9].hour_label, "09:00");
        assert_eq!(buckets[9].successful_logins, 2);
        assert_eq!(buckets[9].failed_logins, 1);
        assert_eq!(buckets[0].successful_logins, 0);
    }

    #[test]
    fn weekly_trends_are_oldest_first_with_labels() {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 16, 0, 0, 0)
            .single()
            .unwrap_or_default();
        let events = vec![login(1, true), login(2, false), login(200, true)];
        let trends = weekly_trends(&events, now, 2);

        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].week_label, "Mar 02 - Mar 09");
        assert_eq!(trends[0].successful_logins, 1);
        assert_eq!(trends[0].failed_logins, 1);
        assert_eq!(trends[0].success_rate, 50.0);
        assert_eq!(trends[1].week_label, "Mar 09 - Mar 16");
        assert_eq!(trends[1].successful_logins, 1);
        assert_eq!(trends[1].success_rate, 100.0);
    }

    #[test]
    fn empty_week_reports_zero_rate() {
        let trends = weekly_trends(&[], Utc::now(), 1);
        assert_eq!(trends[0].success_rate, 0.0);
    }

    #[test]
    fn thresholds_reject_invalid_values() {
        assert!(AnomalyThresholds::new(f64::NAN, 0.3, [2], 0.2).is_err());
        assert!(AnomalyThresholds::new(5.0, 1.5, [2], 0.2).is_err());
        assert!(AnomalyThresholds::new(5.0, 0.3, [24], 0.2).is_err());
        assert!(AnomalyThresholds::new(5.0, 0.3, Vec::new(), 0.2).is_err());
        assert!(AnomalyThresholds::new(5.0, 0.3, [2, 3], 0.2).is_ok());
    }

    #[test]
    fn spike_is_flagged_against_active_baseline() {
        let mut events: Vec<LoginEvent> = (8..18).map(|hour| login(hour, true)).collect();
        events.extend((0..40).map(|_| login(12, true)));

        let report = detect_anomalies(&events, &AnomalyThresholds::default());

        assert!(report.spike);
        assert_eq!(report.spike_slots.len(), 1);
        assert_eq!(report.spike_slots[0].hour, 12);
        assert!(!report.unusual_failure_ratio);
    }

    #[test]
    fn night_activity_and_failure_ratio_are_independent() {
        let events = vec![
            login(3, false),
            login(4, true),
            login(10, true),
            login(11, true),
        ];
        let report = detect_anomalies(&events, &AnomalyThresholds::default());

        assert!(report.unusual_night_activity);
        assert_eq!(report.night_logins, 2);
        assert!(!report.unusual_failure_ratio);
        assert_eq!(report.failure_ratio, 0.25);
        assert!(!report.spike);
    }

    #[test]
    fn empty_history_raises_nothing() {
        let report = detect_anomalies(&[], &AnomalyThresholds::default());
        assert!(!report.spike && !report.unusual_night_activity && !report.unusual_failure_ratio);
    }

    #[test]
    fn lone_burst_among_quiet_hours_is_a_spike() {
        let mut events: Vec<LoginEvent> = (0..100).map(|_| login(9, true)).collect();
        events.extend([login(10, true), login(11, true), login(12, true), login(13, true)]);

        let report = detect_anomalies(&events, &AnomalyThresholds::default());

        assert!(report.spike);
        assert_eq!(report.spike_slots.len(), 1);
        assert_eq!(report.spike_slots[0].hour, 9);
        assert_eq!(report.spike_slots[0].count, 100);
        assert_eq!(report.baseline, 20.8);
    }

    #[test]
    fn single_active_cell_has_no_baseline_to_spike_against() {
        let events: Vec<LoginEvent> = (0..50).map(|_| login(9, true)).collect();
        let report = detect_anomalies(&events, &AnomalyThresholds::default());

        assert!(!report.spike);
        assert!(report.spike_slots.is_empty());
    }

    #[test]
    fn one_bad_day_inside_a_quiet_week_is_flagged() {
        // Six clean days, then a day with three failures out of four.
        let mut events: Vec<LoginEvent> = (0..6)
            .flat_map(|day| (0..5).map(move |hour| login(day * 24 + 9 + hour, true)))
            .collect();
        events.extend([
            login(6 * 24 + 9, false),
            login(6 * 24 + 10, false),
            login(6 * 24 + 11, false),
            login(6 * 24 + 12, true),
        ]);

        let report = detect_anomalies(&events, &AnomalyThresholds::default());

        assert!(report.failure_ratio < 0.3);
        assert!(report.unusual_failure_ratio);
        assert_eq!(report.failure_ratio_days.len(), 1);
        assert_eq!(report.failure_ratio_days[0].date.to_string(), "2026-03-08");
        assert_eq!(report.failure_ratio_days[0].failed_logins, 3);
        assert_eq!(report.failure_ratio_days[0].failure_ratio, 0.75);
    }

    #[test]
    fn daily_ratios_cover_only_days_with_logins() {
        let events = vec![login(1, false), login(2, true), login(49, true)];
        let days = daily_failure_ratios(&events);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date.to_string(), "2026-03-02");
        assert_eq!(days[0].failure_ratio, 0.5);
        assert_eq!(days[1].date.to_string(), "2026-03-04");
        assert_eq!(days[1].failure_ratio, 0.0);
    }

    #[test]
    fn login_at_now_lands_in_newest_week() {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 16, 0, 0, 0)
            .single()
            .unwrap_or_default();
        let events = vec![LoginEvent {
            occurred_at: now,
            success: true,
            source_ip: None,
        }];

        let trends = weekly_trends(&events, now, 2);

        assert_eq!(trends[0].successful_logins, 0);
        assert_eq!(trends[1].successful_logins, 1);
    }
}
