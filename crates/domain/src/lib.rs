//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod login_heatmap;
mod login_trends;
mod rate_limit;
mod security_event;
mod security_score;
mod security_summary;

pub use login_heatmap::{
    DEFAULT_QUIET_THRESHOLD, HeatmapMatrix, HeatmapSlot, MAX_HEATMAP_DAYS, PeakActivity, day_name,
    validate_heatmap_days,
};
pub use login_trends::{
    AnomalyReport, AnomalyThresholds, DailyFailureRatio, HourlyLoginBucket, MAX_TREND_WEEKS,
    WeeklyLoginTrend, daily_failure_ratios, detect_anomalies, hourly_distribution, success_rate,
    validate_trend_weeks, weekly_trends,
};
pub use rate_limit::{
    ClientIdentifier, GLOBAL_LIMIT_TYPE, LimitConfig, LimitType, RateLimitPolicy, RateLimitStatus,
    RateWindow, ViolationRecord, WindowDecision, rate_window_key,
};
pub use security_event::{EventOutcome, LoginEvent, SecurityEvent, SecurityEventKind};
pub use security_score::{
    Alert, AlertKind, AlertLevel, EXCESSIVE_FAILED_LOGINS_THRESHOLD, MAX_SECURITY_SCORE,
    ScoreDeduction, ScoreMetric, ScoreRule, ScoreTrigger, SecurityScore, SecurityScorePolicy,
    calculate_security_score, check_critical_alerts,
};
pub use security_summary::{
    ReportingPeriod, SUSPICIOUS_IP_FAILED_LOGIN_THRESHOLD, SecuritySummary, SuspiciousActivity,
};
