use std::collections::{HashMap, VecDeque};
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use warden_core::{AppError, AppResult, NonEmptyString};

/// Reserved limit type used for any category without an explicit entry.
pub const GLOBAL_LIMIT_TYPE: &str = "global";

/// Named rate-limit category such as `login` or `register`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LimitType(String);

impl LimitType {
    /// Creates a validated limit type.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.contains(':') {
            return Err(AppError::Validation(format!(
                "limit type '{trimmed}' must not contain ':'"
            )));
        }

        let value = NonEmptyString::new(trimmed.to_ascii_lowercase())?;
        Ok(Self(value.into()))
    }

    /// Returns the reserved fallback limit type.
    #[must_use]
    pub fn global() -> Self {
        Self(GLOBAL_LIMIT_TYPE.to_owned())
    }

    /// Returns the storage value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for LimitType {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LimitType> for String {
    fn from(value: LimitType) -> Self {
        value.0
    }
}

impl Display for LimitType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Budget for one limit type: at most `max_requests` inside the trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    max_requests: u32,
    window_seconds: u32,
}

impl LimitConfig {
    /// Creates a validated limit configuration.
    pub fn new(max_requests: u32, window_seconds: u32) -> AppResult<Self> {
        if max_requests == 0 {
            return Err(AppError::Validation(
                "max_requests must be greater than zero".to_owned(),
            ));
        }

        if window_seconds == 0 {
            return Err(AppError::Validation(
                "window_seconds must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            max_requests,
            window_seconds,
        })
    }

    /// Parses the `"{requests}/{seconds}"` shorthand used in configuration.
    pub fn parse(value: &str) -> AppResult<Self> {
        let (requests, seconds) = value.trim().split_once('/').ok_or_else(|| {
            AppError::Validation(format!(
                "limit '{value}' must use the form '<requests>/<seconds>'"
            ))
        })?;

        let max_requests = requests.trim().parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid request count in '{value}': {error}"))
        })?;
        let window_seconds = seconds.trim().parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid window in '{value}': {error}"))
        })?;

        Self::new(max_requests, window_seconds)
    }

    /// Maximum admitted requests per window.
    #[must_use]
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Trailing window length in seconds.
    #[must_use]
    pub fn window_seconds(&self) -> u32 {
        self.window_seconds
    }

    /// Trailing window length as a duration.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::seconds(i64::from(self.window_seconds))
    }
}

/// Per-type limit table with a mandatory `global` fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    limits: HashMap<LimitType, LimitConfig>,
    global: LimitConfig,
}

impl RateLimitPolicy {
    /// Creates a policy from explicit entries.
    ///
    /// A `global` entry in `limits` replaces the provided fallback.
    #[must_use]
    pub fn new(global: LimitConfig, limits: HashMap<LimitType, LimitConfig>) -> Self {
        let mut limits = limits;
        let global = limits.remove(&LimitType::global()).unwrap_or(global);
        Self { limits, global }
    }

    /// Returns the reference defaults merged with the given overrides.
    #[must_use]
    pub fn with_overrides(overrides: HashMap<LimitType, LimitConfig>) -> Self {
        let mut policy = Self::default();
        for (limit_type, config) in overrides {
            if limit_type.as_str() == GLOBAL_LIMIT_TYPE {
                policy.global = config;
            } else {
                policy.limits.insert(limit_type, config);
            }
        }

        policy
    }

    /// Resolves the budget for a limit type, falling back to `global`.
    #[must_use]
    pub fn resolve(&self, limit_type: &LimitType) -> LimitConfig {
        self.limits
            .get(limit_type)
            .copied()
            .unwrap_or(self.global)
    }

    /// Returns whether the limit type has its own entry.
    #[must_use]
    pub fn is_configured(&self, limit_type: &LimitType) -> bool {
        limit_type.as_str() == GLOBAL_LIMIT_TYPE || self.limits.contains_key(limit_type)
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        let defaults = [
            ("login", 5, 300),
            ("register", 3, 3_600),
            ("admin", 50, 3_600),
            ("two_factor", 5, 300),
            ("password_reset", 3, 3_600),
        ];

        let limits = defaults
            .into_iter()
            .filter_map(|(name, max_requests, window_seconds)| {
                Some((
                    LimitType::new(name).ok()?,
                    LimitConfig {
                        max_requests,
                        window_seconds,
                    },
                ))
            })
            .collect();

        Self {
            limits,
            global: LimitConfig {
                max_requests: 500,
                window_seconds: 3_600,
            },
        }
    }
}

/// Deterministic key grouping one client's requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientIdentifier(String);

impl ClientIdentifier {
    /// Creates a validated client identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = NonEmptyString::new(value)?;
        if value.as_str().contains(char::is_whitespace) {
            return Err(AppError::Validation(
                "client identifier must not contain whitespace".to_owned(),
            ));
        }

        Ok(Self(value.into()))
    }

    /// Returns the identifier value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for ClientIdentifier {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClientIdentifier> for String {
    fn from(value: ClientIdentifier) -> Self {
        value.0
    }
}

impl Display for ClientIdentifier {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Storage key for one (limit type, client) window.
#[must_use]
pub fn rate_window_key(limit_type: &LimitType, client: &ClientIdentifier) -> String {
    format!("{}:{}", limit_type.as_str(), client.as_str())
}

/// Outcome of one admission attempt against a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    /// The request was admitted and now occupies a slot.
    Admitted {
        /// Requests in the window including this one.
        current_requests: u32,
    },
    /// The window is full; the request was not recorded.
    Denied {
        /// Requests already in the window.
        current_requests: u32,
    },
}

impl WindowDecision {
    /// Returns whether the request was admitted.
    #[must_use]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }

    /// Returns the retained request count after the decision.
    #[must_use]
    pub fn current_requests(&self) -> u32 {
        match self {
            Self::Admitted { current_requests } | Self::Denied { current_requests } => {
                *current_requests
            }
        }
    }
}

/// Ordered request timestamps retained inside a trailing window.
///
/// Every retained timestamp satisfies `timestamp > now - window`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateWindow {
    timestamps: VecDeque<DateTime<Utc>>,
}

impl RateWindow {
    /// Creates an empty window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every timestamp at or before `now - window`.
    pub fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        let cutoff = now - window;
        while self
            .timestamps
            .front()
            .is_some_and(|timestamp| *timestamp <= cutoff)
        {
            self.timestamps.pop_front();
        }
    }

    /// Prunes, then admits `now` if the window still has room.
    ///
    /// A denied attempt does not occupy a slot.
    pub fn try_admit(&mut self, now: DateTime<Utc>, config: LimitConfig) -> WindowDecision {
        self.prune(now, config.window());

        let current = self.len();
        if current >= config.max_requests() {
            return WindowDecision::Denied {
                current_requests: current,
            };
        }

        let position = self
            .timestamps
            .iter()
            .rposition(|timestamp| *timestamp <= now)
            .map_or(0, |index| index + 1);
        self.timestamps.insert(position, now);

        WindowDecision::Admitted {
            current_requests: current + 1,
        }
    }

    /// Number of retained timestamps.
    #[must_use]
    pub fn len(&self) -> u32 {
        u32::try_from(self.timestamps.len()).unwrap_or(u32::MAX)
    }

    /// Returns whether the window holds no timestamps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Oldest retained timestamp.
    #[must_use]
    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.timestamps.front().copied()
    }
}

/// A recorded instance of a client exceeding a rate limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    /// Offending client.
    pub client: ClientIdentifier,
    /// Limit that was exceeded.
    pub limit_type: LimitType,
    /// When the denied attempt happened.
    pub occurred_at: DateTime<Utc>,
}

/// Current usage of one (limit type, client) window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    /// Limit type the status was requested for.
    pub limit_type: LimitType,
    /// Configured budget.
    pub max_requests: u32,
    /// Configured window.
    pub window_seconds: u32,
    /// Retained requests in the window.
    pub current_requests: u32,
    /// Requests still admissible.
    pub remaining_requests: u32,
    /// Upper bound on when the window fully resets.
    pub window_reset: DateTime<Utc>,
}

impl RateLimitStatus {
    /// Builds a status projection from a resolved config and retained count.
    #[must_use]
    pub fn new(
        limit_type: LimitType,
        config: LimitConfig,
        current_requests: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            limit_type,
            max_requests: config.max_requests(),
            window_seconds: config.window_seconds(),
            current_requests,
            remaining_requests: config.max_requests().saturating_sub(current_requests),
            window_reset: now + config.window(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{Duration, TimeZone, Utc};

    use super::{LimitConfig, LimitType, RateLimitPolicy, RateLimitStatus, RateWindow};

    fn limit_type(value: &str) -> LimitType {
        LimitType::new(value).unwrap_or_else(|_| LimitType::global())
    }

    fn config(max_requests: u32, window_seconds: u32) -> LimitConfig {
        LimitConfig::new(max_requests, window_seconds)
            .unwrap_or_else(|error| panic!("invalid test config: {error}"))
    }

    #[test]
    fn limit_config_rejects_zero_values() {
        assert!(LimitConfig::new(0, 60).is_err());
        assert!(LimitConfig::new(5, 0).is_err());
    }

    #[test]
    fn limit_config_parses_shorthand() {
        let parsed = LimitConfig::parse(" 10 / 120 ");
        assert_eq!(parsed.ok(), Some(config(10, 120)));
        assert!(LimitConfig::parse("10").is_err());
        assert!(LimitConfig::parse("-1/60").is_err());
    }

    #[test]
    fn limit_type_is_normalized_and_rejects_separator() {
        assert_eq!(limit_type(" Login ").as_str(), "login");
        assert!(LimitType::new("login:extra").is_err());
        assert!(LimitType::new("  ").is_err());
    }

    #[test]
    fn unknown_limit_type_falls_back_to_global() {
        let policy = RateLimitPolicy::default();
        let resolved = policy.resolve(&limit_type("export"));
        assert_eq!(resolved, config(500, 3_600));
        assert!(!policy.is_configured(&limit_type("export")));
    }

    #[test]
    fn defaults_match_reference_budgets() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.resolve(&limit_type("login")), config(5, 300));
        assert_eq!(policy.resolve(&limit_type("register")), config(3, 3_600));
        assert_eq!(policy.resolve(&limit_type("admin")), config(50, 3_600));
    }

    #[test]
    fn overrides_replace_defaults_and_global() {
        let overrides = HashMap::from([
            (limit_type("login"), config(2, 60)),
            (LimitType::global(), config(10, 60)),
        ]);
        let policy = RateLimitPolicy::with_overrides(overrides);
        assert_eq!(policy.resolve(&limit_type("login")), config(2, 60));
        assert_eq!(policy.resolve(&limit_type("anything")), config(10, 60));
        assert_eq!(policy.resolve(&limit_type("admin")), config(50, 3_600));
    }

    #[test]
    fn window_denies_without_occupying_a_slot() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).single().unwrap_or_default();
        let budget = config(3, 60);
        let mut window = RateWindow::new();

        let admitted = (0..8)
            .filter(|offset| {
                window
                    .try_admit(now + Duration::seconds(*offset), budget)
                    .is_admitted()
            })
            .count();

        assert_eq!(admitted, 3);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn window_slides_after_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).single().unwrap_or_default();
        let budget = config(2, 60);
        let mut window = RateWindow::new();

        assert!(window.try_admit(now, budget).is_admitted());
        assert!(window.try_admit(now + Duration::seconds(30), budget).is_admitted());
        assert!(!window.try_admit(now + Duration::seconds(59), budget).is_admitted());

        // The first entry sits exactly on the cutoff at +60s and is pruned.
        let decision = window.try_admit(now + Duration::seconds(60), budget);
        assert!(decision.is_admitted());
        assert_eq!(decision.current_requests(), 2);
        assert_eq!(window.oldest(), Some(now + Duration::seconds(30)));
    }

    #[test]
    fn status_reports_remaining_budget() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).single().unwrap_or_default();
        let status = RateLimitStatus::new(limit_type("login"), config(5, 300), 7, now);
        assert_eq!(status.remaining_requests, 0);
        assert_eq!(status.window_reset, now + Duration::seconds(300));
    }
}
