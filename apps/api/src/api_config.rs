use std::collections::HashMap;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use ipnet::IpNet;
use tracing_subscriber::EnvFilter;
use warden_application::StorageFailurePolicy;
use warden_core::AppError;
use warden_domain::{AnomalyThresholds, LimitConfig, LimitType};

const MIN_ADMIN_TOKEN_LENGTH: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLogBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub api_host: String,
    pub api_port: u16,
    pub admin_api_token: String,
    pub rate_limit_backend: RateLimitBackend,
    pub redis_url: Option<String>,
    pub redis_key_prefix: String,
    pub event_log_backend: EventLogBackend,
    pub database_url: Option<String>,
    pub rate_limit_overrides: HashMap<LimitType, LimitConfig>,
    pub storage_failure_policy: StorageFailurePolicy,
    pub anomaly_thresholds: AnomalyThresholds,
    pub trusted_proxies: Vec<IpNet>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let mut config = Self::from_lookup(|name| env::var(name).ok())?;
        config.migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let admin_api_token = required_non_empty(&lookup, "ADMIN_API_TOKEN")?;
        if admin_api_token.len() < MIN_ADMIN_TOKEN_LENGTH {
            return Err(AppError::Validation(format!(
                "ADMIN_API_TOKEN must be at least {MIN_ADMIN_TOKEN_LENGTH} characters"
            )));
        }

        let api_host = lookup("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = match lookup("API_PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|error| AppError::Validation(format!("invalid API_PORT: {error}")))?,
            None => 3002,
        };

        let redis_url = non_empty(&lookup, "REDIS_URL");
        let rate_limit_backend = match lookup("RATE_LIMIT_BACKEND")
            .unwrap_or_else(|| "memory".to_owned())
            .as_str()
        {
            "memory" => RateLimitBackend::Memory,
            "redis" => {
                if redis_url.is_none() {
                    return Err(AppError::Validation(
                        "REDIS_URL is required when RATE_LIMIT_BACKEND=redis".to_owned(),
                    ));
                }
                RateLimitBackend::Redis
            }
            other => {
                return Err(AppError::Validation(format!(
                    "RATE_LIMIT_BACKEND must be either 'memory' or 'redis', got '{other}'"
                )));
            }
        };
        let redis_key_prefix =
            non_empty(&lookup, "REDIS_KEY_PREFIX").unwrap_or_else(|| "warden".to_owned());

        let database_url = non_empty(&lookup, "DATABASE_URL");
        let event_log_backend = match lookup("EVENT_LOG_BACKEND")
            .unwrap_or_else(|| "memory".to_owned())
            .as_str()
        {
            "memory" => EventLogBackend::Memory,
            "postgres" => {
                if database_url.is_none() {
                    return Err(AppError::Validation(
                        "DATABASE_URL is required when EVENT_LOG_BACKEND=postgres".to_owned(),
                    ));
                }
                EventLogBackend::Postgres
            }
            other => {
                return Err(AppError::Validation(format!(
                    "EVENT_LOG_BACKEND must be either 'memory' or 'postgres', got '{other}'"
                )));
            }
        };

        let rate_limit_overrides = match non_empty(&lookup, "RATE_LIMIT_OVERRIDES") {
            Some(value) => parse_rate_limit_overrides(&value)?,
            None => HashMap::new(),
        };

        let storage_failure_policy = if lookup("RATE_LIMIT_FAIL_CLOSED")
            .unwrap_or_else(|| "false".to_owned())
            .eq_ignore_ascii_case("true")
        {
            StorageFailurePolicy::FailClosed
        } else {
            StorageFailurePolicy::FailOpen
        };

        let anomaly_thresholds = parse_anomaly_thresholds(&lookup)?;

        let trusted_proxies = match non_empty(&lookup, "TRUSTED_PROXIES") {
            Some(value) => parse_trusted_proxies(&value)?,
            None => Vec::new(),
        };

        Ok(Self {
            migrate_only: false,
            api_host,
            api_port,
            admin_api_token,
            rate_limit_backend,
            redis_url,
            redis_key_prefix,
            event_log_backend,
            database_url,
            rate_limit_overrides,
            storage_failure_policy,
            anomaly_thresholds,
            trusted_proxies,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }

    pub fn requires_redis(&self) -> bool {
        self.rate_limit_backend == RateLimitBackend::Redis
    }

    pub fn requires_postgres(&self) -> bool {
        self.event_log_backend == EventLogBackend::Postgres
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

/// Parses `login=5/300,admin=100/3600`.
fn parse_rate_limit_overrides(value: &str) -> Result<HashMap<LimitType, LimitConfig>, AppError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (limit_type, config) = entry.split_once('=').ok_or_else(|| {
                AppError::Validation(format!(
                    "RATE_LIMIT_OVERRIDES entry '{entry}' must look like type=max/seconds"
                ))
            })?;
            Ok((LimitType::new(limit_type)?, LimitConfig::parse(config)?))
        })
        .collect()
}

/// Parses `10.0.0.0/8, 192.0.2.7`; a bare address is a single-host network.
fn parse_trusted_proxies(value: &str) -> Result<Vec<IpNet>, AppError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            IpNet::from_str(entry)
                .or_else(|_| IpAddr::from_str(entry).map(IpNet::from))
                .map_err(|error| {
                    AppError::Validation(format!("invalid TRUSTED_PROXIES entry '{entry}': {error}"))
                })
        })
        .collect()
}

fn parse_anomaly_thresholds(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<AnomalyThresholds, AppError> {
    let defaults = AnomalyThresholds::default();

    let spike_multiplier = match non_empty(lookup, "ANOMALY_SPIKE_MULTIPLIER") {
        Some(value) => parse_float("ANOMALY_SPIKE_MULTIPLIER", &value)?,
        None => defaults.spike_multiplier(),
    };
    let failure_ratio = match non_empty(lookup, "ANOMALY_FAILURE_RATIO") {
        Some(value) => parse_float("ANOMALY_FAILURE_RATIO", &value)?,
        None => defaults.failure_ratio(),
    };
    let night_hours = match non_empty(lookup, "ANOMALY_NIGHT_HOURS") {
        Some(value) => parse_hour_range(&value)?,
        None => defaults.night_hours().iter().copied().collect(),
    };

    AnomalyThresholds::new(
        spike_multiplier,
        failure_ratio,
        night_hours,
        defaults.night_share(),
    )
}

fn parse_float(name: &str, value: &str) -> Result<f64, AppError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))
}

/// Parses an inclusive `start-end` hour range; `22-3` wraps past midnight.
fn parse_hour_range(value: &str) -> Result<Vec<u32>, AppError> {
    let invalid = || {
        AppError::Validation(format!(
            "ANOMALY_NIGHT_HOURS must look like start-end with hours in 0..=23, got '{value}'"
        ))
    };

    let (start, end) = value.trim().split_once('-').ok_or_else(invalid)?;
    let start = start.trim().parse::<u32>().map_err(|_| invalid())?;
    let end = end.trim().parse::<u32>().map_err(|_| invalid())?;
    if start > 23 || end > 23 {
        return Err(invalid());
    }

    if start <= end {
        Ok((start..=end).collect())
    } else {
        Ok((start..24).chain(0..=end).collect())
    }
}

fn required_non_empty(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<String, AppError> {
    let value = lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|value| !value.trim().is_empty())
}
