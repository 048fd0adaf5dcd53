//! Application services and ports.

#![forbid(unsafe_code)]

mod login_analytics_service;
mod rate_limit_service;
mod security_event_ports;
mod security_metrics_service;

pub use login_analytics_service::{HeatmapReport, LoginAnalyticsService};
pub use rate_limit_service::{
    ClientContext, ClientIdentifierStrategy, IpUserAgentIdentifier, RateLimitService,
    RateLimitStore, StorageFailurePolicy, SubjectOrIpIdentifier, ViolationLog,
};
pub use security_event_ports::{SecurityEventLog, SecurityEventQuery};
pub use security_metrics_service::{
    DashboardPeriod, MAX_SCORE_TREND_DAYS, ScoreTrendPoint, SecurityDashboard,
    SecurityMetricsService,
};
