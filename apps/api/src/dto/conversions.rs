use chrono::SecondsFormat;
use warden_application::{HeatmapReport, ScoreTrendPoint, SecurityDashboard};
use warden_domain::{RateLimitStatus, ViolationRecord};

use super::types::{
    HeatmapResponse, RateLimitStatusResponse, ScoreTrendPointResponse, SecurityDashboardResponse,
    ViolationResponse,
};

impl From<RateLimitStatus> for RateLimitStatusResponse {
    fn from(value: RateLimitStatus) -> Self {
        Self {
            limit_type: value.limit_type.to_string(),
            max_requests: value.max_requests,
            window_seconds: value.window_seconds,
            current_requests: value.current_requests,
            remaining_requests: value.remaining_requests,
            window_reset: value.window_reset.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl From<ViolationRecord> for ViolationResponse {
    fn from(value: ViolationRecord) -> Self {
        Self {
            client_identifier: value.client.to_string(),
            limit_type: value.limit_type.to_string(),
            occurred_at: value.occurred_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl From<SecurityDashboard> for SecurityDashboardResponse {
    fn from(value: SecurityDashboard) -> Self {
        Self {
            period: value.period.as_str(),
            period_start: value
                .summary
                .period_start
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            period_end: value
                .summary
                .period_end
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            security_score: value.score.score,
            score_deductions: value.score.deductions,
            alerts: value.alerts,
            summary: value.summary,
        }
    }
}

impl From<ScoreTrendPoint> for ScoreTrendPointResponse {
    fn from(value: ScoreTrendPoint) -> Self {
        Self {
            date: value.date.format("%Y-%m-%d").to_string(),
            score: value.score,
            failed_logins: value.failed_logins,
            alert_count: value.alert_count,
        }
    }
}

impl From<HeatmapReport> for HeatmapResponse {
    fn from(value: HeatmapReport) -> Self {
        Self {
            days: value.days,
            heatmap: value.matrix,
            total_logins: value.total_logins,
            peak_activity: value.peak,
            quiet_periods: value.quiet_periods,
        }
    }
}
