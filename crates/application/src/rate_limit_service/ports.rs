use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::AppResult;
use warden_domain::{ClientIdentifier, LimitConfig, ViolationRecord, WindowDecision};

/// Store port for sliding-window counters.
///
/// Keys are built with `warden_domain::rate_window_key`.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Prunes expired entries, then records `now` if the window has room.
    ///
    /// Must be atomic per key: two concurrent calls may not both be admitted
    /// when only one slot remains.
    async fn try_acquire(
        &self,
        key: &str,
        config: LimitConfig,
        now: DateTime<Utc>,
    ) -> AppResult<WindowDecision>;

    /// Returns the number of timestamps still inside the window.
    async fn current_count(
        &self,
        key: &str,
        config: LimitConfig,
        now: DateTime<Utc>,
    ) -> AppResult<u32>;

    /// Drops one window. Returns whether it existed.
    async fn reset(&self, key: &str) -> AppResult<bool>;
}

/// Append-only log of rate-limit violations.
#[async_trait]
pub trait ViolationLog: Send + Sync {
    /// Appends one violation to the client's list.
    async fn append_violation(&self, record: ViolationRecord) -> AppResult<()>;

    /// Lists one client's violations, oldest first.
    async fn list_for_client(&self, client: &ClientIdentifier) -> AppResult<Vec<ViolationRecord>>;

    /// Lists violations of every client inside the closed interval.
    async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<ViolationRecord>>;

    /// Clears the whole violation namespace and returns the number of records removed.
    async fn clear_all(&self) -> AppResult<u64>;
}
