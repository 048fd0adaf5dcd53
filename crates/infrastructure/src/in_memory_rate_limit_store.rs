use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use warden_application::RateLimitStore;
use warden_core::AppResult;
use warden_domain::{LimitConfig, RateWindow, WindowDecision};

/// Minimum spacing between sweeps of drained windows.
const SWEEP_INTERVAL_SECONDS: i64 = 60;

/// Process-local sliding-window store.
///
/// A single mutex guards every window, so prune, count and record happen
/// under one lock and concurrent checks cannot both take the last slot.
/// Windows whose span has fully elapsed are swept at most once per
/// `SWEEP_INTERVAL_SECONDS` from inside `try_acquire`.
#[derive(Default)]
pub struct InMemoryRateLimitStore {
    table: Mutex<WindowTable>,
}

#[derive(Default)]
struct WindowTable {
    windows: HashMap<String, TrackedWindow>,
    last_sweep: Option<DateTime<Utc>>,
}

struct TrackedWindow {
    window: RateWindow,
    span: Duration,
}

impl WindowTable {
    fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, tracked| {
            tracked.window.prune(now, tracked.span);
            !tracked.window.is_empty()
        });
        self.last_sweep = Some(now);
        before - self.windows.len()
    }

    fn sweep_due(&self, now: DateTime<Utc>) -> bool {
        self.last_sweep.is_none_or(|last_sweep| {
            now - last_sweep >= Duration::seconds(SWEEP_INTERVAL_SECONDS)
        })
    }
}

impl InMemoryRateLimitStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of windows currently held, including drained ones not yet evicted.
    pub async fn window_count(&self) -> usize {
        self.table.lock().await.windows.len()
    }

    /// Drops every window with no timestamp left inside its span at `now`.
    ///
    /// Returns the number of windows removed.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        self.table.lock().await.sweep(now)
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn try_acquire(
        &self,
        key: &str,
        config: LimitConfig,
        now: DateTime<Utc>,
    ) -> AppResult<WindowDecision> {
        let mut table = self.table.lock().await;
        if table.sweep_due(now) {
            table.sweep(now);
        }

        let tracked = table
            .windows
            .entry(key.to_owned())
            .or_insert_with(|| TrackedWindow {
                window: RateWindow::new(),
                span: config.window(),
            });
        tracked.span = config.window();
        Ok(tracked.window.try_admit(now, config))
    }

    async fn current_count(
        &self,
        key: &str,
        config: LimitConfig,
        now: DateTime<Utc>,
    ) -> AppResult<u32> {
        let mut table = self.table.lock().await;
        let Some(tracked) = table.windows.get_mut(key) else {
            return Ok(0);
        };

        tracked.window.prune(now, config.window());
        if tracked.window.is_empty() {
            table.windows.remove(key);
            return Ok(0);
        }

        Ok(tracked.window.len())
    }

    async fn reset(&self, key: &str) -> AppResult<bool> {
        Ok(self.table.lock().await.windows.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use warden_application::RateLimitStore;
    use warden_domain::{LimitConfig, WindowDecision};

    use super::InMemoryRateLimitStore;

    fn config(max_requests: u32, window_seconds: u32) -> LimitConfig {
        LimitConfig::new(max_requests, window_seconds).unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn admits_until_budget_is_spent() {
        let store = InMemoryRateLimitStore::new();
        let now = Utc::now();
        let config = config(2, 60);

        let first = store.try_acquire("login:a", config, now).await;
        let second = store.try_acquire("login:a", config, now).await;
        let third = store.try_acquire("login:a", config, now).await;

        assert!(matches!(
            first,
            Ok(WindowDecision::Admitted {
                current_requests: 1
            })
        ));
        assert!(matches!(
            second,
            Ok(WindowDecision::Admitted {
                current_requests: 2
            })
        ));
        assert!(matches!(
            third,
            Ok(WindowDecision::Denied {
                current_requests: 2
            })
        ));
        assert_eq!(store.current_count("login:a", config, now).await.ok(), Some(2));
    }

    #[tokio::test]
    async fn keys_are_isolated() {
        let store = InMemoryRateLimitStore::new();
        let now = Utc::now();
        let config = config(1, 60);

        assert!(
            store
                .try_acquire("login:a", config, now)
                .await
                .is_ok_and(|decision| decision.is_admitted())
        );
        assert!(
            store
                .try_acquire("login:b", config, now)
                .await
                .is_ok_and(|decision| decision.is_admitted())
        );
        assert!(
            store
                .try_acquire("register:a", config, now)
                .await
                .is_ok_and(|decision| decision.is_admitted())
        );
    }

    #[tokio::test]
    async fn expired_windows_are_evicted_on_read() {
        let store = InMemoryRateLimitStore::new();
        let now = Utc::now();
        let config = config(3, 60);

        let acquired = store.try_acquire("login:a", config, now).await;
        assert!(acquired.is_ok());
        assert_eq!(store.window_count().await, 1);

        let later = now + Duration::seconds(61);
        assert_eq!(store.current_count("login:a", config, later).await.ok(), Some(0));
        assert_eq!(store.window_count().await, 0);
    }

    #[tokio::test]
    async fn reset_reports_whether_window_existed() {
        let store = InMemoryRateLimitStore::new();
        let now = Utc::now();
        let config = config(3, 60);

        let acquired = store.try_acquire("login:a", config, now).await;
        assert!(acquired.is_ok());

        assert_eq!(store.reset("login:a").await.ok(), Some(true));
        assert_eq!(store.reset("login:a").await.ok(), Some(false));
        assert_eq!(store.current_count("login:a", config, now).await.ok(), Some(0));
    }

    #[tokio::test]
    async fn concurrent_acquires_never_exceed_budget() {
        let store = Arc::new(InMemoryRateLimitStore::new());
        let now = Utc::now();
        let config = config(5, 60);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.try_acquire("login:a", config, now).await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if let Ok(Ok(decision)) = handle.await {
                if decision.is_admitted() {
                    admitted += 1;
                }
            }
        }

        assert_eq!(admitted, 5);
        assert_eq!(store.current_count("login:a", config, now).await.ok(), Some(5));
    }

    #[tokio::test]
    async fn drained_windows_of_one_off_clients_are_swept() {
        let store = InMemoryRateLimitStore::new();
        let now = Utc::now();
        let config = config(5, 300);

        for client in 0..1_000 {
            let acquired = store
                .try_acquire(&format!("login:client-{client}"), config, now)
                .await;
            assert!(acquired.is_ok());
        }
        assert_eq!(store.window_count().await, 1_000);

        let later = now + Duration::days(30);
        let acquired = store.try_acquire("login:returning", config, later).await;
        assert!(acquired.is_ok_and(|decision| decision.is_admitted()));
        assert_eq!(store.window_count().await, 1);
    }

    #[tokio::test]
    async fn cleanup_keeps_windows_still_inside_their_span() {
        let store = InMemoryRateLimitStore::new();
        let now = Utc::now();

        let short = store.try_acquire("login:a", config(5, 60), now).await;
        let long = store.try_acquire("register:a", config(3, 3_600), now).await;
        assert!(short.is_ok() && long.is_ok());

        let removed = store.cleanup_expired(now + Duration::seconds(120)).await;

        assert_eq!(removed, 1);
        assert_eq!(store.window_count().await, 1);
        assert_eq!(
            store
                .current_count("register:a", config(3, 3_600), now + Duration::seconds(120))
                .await
                .ok(),
            Some(1)
        );
    }
}
