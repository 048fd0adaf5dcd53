//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_rate_limit_store;
mod in_memory_security_event_log;
mod in_memory_violation_log;
mod postgres_security_event_log;
mod redis_rate_limit_store;
mod redis_violation_log;

pub use in_memory_rate_limit_store::InMemoryRateLimitStore;
pub use in_memory_security_event_log::InMemorySecurityEventLog;
pub use in_memory_violation_log::InMemoryViolationLog;
pub use postgres_security_event_log::PostgresSecurityEventLog;
pub use redis_rate_limit_store::RedisRateLimitStore;
pub use redis_violation_log::RedisViolationLog;

/// Migrations for the tables read by the PostgreSQL adapters.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
