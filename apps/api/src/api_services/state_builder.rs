use std::sync::Arc;

use sqlx::PgPool;
use warden_application::{
    LoginAnalyticsService, RateLimitService, RateLimitStore, SecurityEventLog,
    SecurityMetricsService, ViolationLog,
};
use warden_core::{AppError, AppResult};
use warden_domain::RateLimitPolicy;
use warden_infrastructure::{
    InMemoryRateLimitStore, InMemorySecurityEventLog, InMemoryViolationLog,
    PostgresSecurityEventLog, RedisRateLimitStore, RedisViolationLog,
};

use crate::api_config::{ApiConfig, EventLogBackend, RateLimitBackend};
use crate::state::AppState;

use super::redis::build_redis_client;

pub fn build_app_state(pool: Option<PgPool>, config: &ApiConfig) -> AppResult<AppState> {
    let redis_client = if config.requires_redis() {
        config
            .redis_url
            .as_deref()
            .map(build_redis_client)
            .transpose()?
    } else {
        None
    };

    let (store, violation_log) = build_rate_limit_storage(config, redis_client.clone())?;
    let event_log = build_event_log(config, pool.clone())?;

    let rate_limit_service = RateLimitService::new(
        store,
        violation_log.clone(),
        RateLimitPolicy::with_overrides(config.rate_limit_overrides.clone()),
    )
    .with_failure_policy(config.storage_failure_policy);
    let security_metrics_service = SecurityMetricsService::new(event_log.clone(), violation_log);
    let login_analytics_service = LoginAnalyticsService::new(event_log)
        .with_thresholds(config.anomaly_thresholds.clone());

    Ok(AppState {
        rate_limit_service,
        security_metrics_service,
        login_analytics_service,
        admin_api_token: Arc::from(config.admin_api_token.as_str()),
        trusted_proxies: Arc::from(config.trusted_proxies.as_slice()),
        postgres_pool: pool,
        redis_client,
    })
}

fn build_rate_limit_storage(
    config: &ApiConfig,
    redis_client: Option<redis::Client>,
) -> AppResult<(Arc<dyn RateLimitStore>, Arc<dyn ViolationLog>)> {
    match config.rate_limit_backend {
        RateLimitBackend::Memory => Ok((
            Arc::new(InMemoryRateLimitStore::new()),
            Arc::new(InMemoryViolationLog::new()),
        )),
        RateLimitBackend::Redis => {
            let redis_client = redis_client.ok_or_else(|| {
                AppError::Validation(
                    "REDIS_URL is required when RATE_LIMIT_BACKEND=redis".to_owned(),
                )
            })?;
            let prefix = config.redis_key_prefix.as_str();
            Ok((
                Arc::new(RedisRateLimitStore::new(
                    redis_client.clone(),
                    format!("{prefix}:rate_limit"),
                )),
                Arc::new(RedisViolationLog::new(redis_client, prefix)),
            ))
        }
    }
}

fn build_event_log(
    config: &ApiConfig,
    pool: Option<PgPool>,
) -> AppResult<Arc<dyn SecurityEventLog>> {
    match config.event_log_backend {
        EventLogBackend::Memory => Ok(Arc::new(InMemorySecurityEventLog::new())),
        EventLogBackend::Postgres => {
            let pool = pool.ok_or_else(|| {
                AppError::Validation(
                    "DATABASE_URL is required when EVENT_LOG_BACKEND=postgres".to_owned(),
                )
            })?;
            Ok(Arc::new(PostgresSecurityEventLog::new(pool)))
        }
    }
}
