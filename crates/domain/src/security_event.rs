use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::AppError;

/// Categories of security-relevant events read from the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    /// Password, passkey, or second-factor login attempt.
    Login,
    /// Password reset request or completion.
    PasswordReset,
    /// New account registration.
    Registration,
    /// Request rejected by CSRF validation.
    CsrfViolation,
}

impl SecurityEventKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "auth.login",
            Self::PasswordReset => "auth.password_reset",
            Self::Registration => "auth.registration",
            Self::CsrfViolation => "security.csrf_violation",
        }
    }

    /// Returns all known kinds.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[SecurityEventKind] = &[
            SecurityEventKind::Login,
            SecurityEventKind::PasswordReset,
            SecurityEventKind::Registration,
            SecurityEventKind::CsrfViolation,
        ];

        ALL
    }
}

impl FromStr for SecurityEventKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "auth.login" => Ok(Self::Login),
            "auth.password_reset" => Ok(Self::PasswordReset),
            "auth.registration" => Ok(Self::Registration),
            "security.csrf_violation" => Ok(Self::CsrfViolation),
            _ => Err(AppError::Validation(format!(
                "unknown security event kind '{value}'"
            ))),
        }
    }
}

/// Outcome label attached to each security event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// The attempted action succeeded.
    Success,
    /// The attempted action was rejected.
    Failure,
}

impl EventOutcome {
    /// Returns a stable storage value for this outcome.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl FromStr for EventOutcome {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            _ => Err(AppError::Validation(format!(
                "unknown event outcome '{value}'"
            ))),
        }
    }
}

/// One audit/login/CSRF event as stored by the external event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// Event category.
    pub kind: SecurityEventKind,
    /// Event outcome.
    pub outcome: EventOutcome,
    /// When the event happened.
    pub occurred_at: DateTime<Utc>,
    /// Caller IP address if available.
    pub source_ip: Option<String>,
}

impl SecurityEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(
        kind: SecurityEventKind,
        outcome: EventOutcome,
        occurred_at: DateTime<Utc>,
        source_ip: Option<String>,
    ) -> Self {
        Self {
            kind,
            outcome,
            occurred_at,
            source_ip,
        }
    }

    /// Projects login events into the read-only login shape.
    #[must_use]
    pub fn as_login_event(&self) -> Option<LoginEvent> {
        (self.kind == SecurityEventKind::Login).then(|| LoginEvent {
            occurred_at: self.occurred_at,
            success: self.outcome == EventOutcome::Success,
            source_ip: self.source_ip.clone(),
        })
    }
}

/// Login attempt read from login history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEvent {
    /// When the attempt happened.
    pub occurred_at: DateTime<Utc>,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Caller IP address if available.
    pub source_ip: Option<String>,
}
