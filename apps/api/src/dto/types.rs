use serde::{Deserialize, Serialize};
use warden_domain::{
    Alert, HeatmapMatrix, HeatmapSlot, PeakActivity, ScoreDeduction, SecuritySummary,
};

/// Dependency health check result.
#[derive(Debug, Serialize)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    pub detail: Option<String>,
}

/// Service readiness payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub postgres: HealthDependencyStatus,
    pub redis: HealthDependencyStatus,
}

/// Connection attributes of the client a check is made for.
#[derive(Debug, Default, Deserialize)]
pub struct ClientContextRequest {
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
    pub subject: Option<String>,
}

/// Current usage of one client's window.
#[derive(Debug, Serialize)]
pub struct RateLimitStatusResponse {
    pub limit_type: String,
    pub max_requests: u32,
    pub window_seconds: u32,
    pub current_requests: u32,
    pub remaining_requests: u32,
    pub window_reset: String,
}

/// Outcome of a rate limit check made on behalf of a client.
#[derive(Debug, Serialize)]
pub struct RateLimitCheckResponse {
    pub allowed: bool,
    pub client_identifier: String,
    pub status: RateLimitStatusResponse,
}

/// Outcome of a window reset.
#[derive(Debug, Serialize)]
pub struct RateLimitResetResponse {
    pub limit_type: String,
    pub client_identifier: String,
    pub reset: bool,
}

/// API representation of a recorded violation.
#[derive(Debug, Serialize)]
pub struct ViolationResponse {
    pub client_identifier: String,
    pub limit_type: String,
    pub occurred_at: String,
}

/// Number of violations removed by a clear.
#[derive(Debug, Serialize)]
pub struct ClearViolationsResponse {
    pub cleared: u64,
}

/// Dashboard payload for one reporting period.
#[derive(Debug, Serialize)]
pub struct SecurityDashboardResponse {
    pub period: &'static str,
    pub period_start: String,
    pub period_end: String,
    pub summary: SecuritySummary,
    pub alerts: Vec<Alert>,
    pub security_score: u8,
    pub score_deductions: Vec<ScoreDeduction>,
}

/// One day of the score trend.
#[derive(Debug, Serialize)]
pub struct ScoreTrendPointResponse {
    pub date: String,
    pub score: u8,
    pub failed_logins: u64,
    pub alert_count: usize,
}

/// Heatmap with peak and quiet periods.
#[derive(Debug, Serialize)]
pub struct HeatmapResponse {
    pub days: u32,
    pub heatmap: HeatmapMatrix,
    pub total_logins: u64,
    pub peak_activity: PeakActivity,
    pub quiet_periods: Vec<HeatmapSlot>,
}
