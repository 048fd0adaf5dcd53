use std::sync::Arc;

use ipnet::IpNet;
use sqlx::PgPool;
use warden_application::{LoginAnalyticsService, RateLimitService, SecurityMetricsService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub rate_limit_service: RateLimitService,
    pub security_metrics_service: SecurityMetricsService,
    pub login_analytics_service: LoginAnalyticsService,
    pub admin_api_token: Arc<str>,
    pub trusted_proxies: Arc<[IpNet]>,
    pub postgres_pool: Option<PgPool>,
    pub redis_client: Option<redis::Client>,
}
