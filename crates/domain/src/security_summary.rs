use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use warden_core::{AppError, AppResult};

use crate::{EventOutcome, SecurityEvent, SecurityEventKind, ViolationRecord};

/// Failed logins from one IP above this count mark the IP as suspicious.
pub const SUSPICIOUS_IP_FAILED_LOGIN_THRESHOLD: u64 = 10;

/// Closed time interval used for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportingPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ReportingPeriod {
    /// Creates a validated period.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if start > end {
            return Err(AppError::Validation(format!(
                "period start {start} must not be after period end {end}"
            )));
        }

        Ok(Self { start, end })
    }

    /// Period covering `length` up to `end`.
    #[must_use]
    pub fn trailing(end: DateTime<Utc>, length: Duration) -> Self {
        let length = length.max(Duration::zero());
        Self {
            start: end - length,
            end,
        }
    }

    /// Inclusive period start.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Inclusive period end.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns whether the instant falls inside the period.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Source IPs with repeated failed logins in a period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuspiciousActivity {
    /// Number of flagged IPs.
    pub suspicious_ip_count: u64,
    /// Flagged IPs in ascending order.
    pub ips: Vec<String>,
}

impl SuspiciousActivity {
    /// Flags every IP with more than `threshold` failed logins.
    #[must_use]
    pub fn from_failed_logins<'a>(
        failed_login_ips: impl IntoIterator<Item = &'a str>,
        threshold: u64,
    ) -> Self {
        let mut failures_by_ip: HashMap<&str, u64> = HashMap::new();
        for ip in failed_login_ips {
            *failures_by_ip.entry(ip).or_default() += 1;
        }

        let mut ips: Vec<String> = failures_by_ip
            .into_iter()
            .filter(|(_, failures)| *failures > threshold)
            .map(|(ip, _)| ip.to_owned())
            .collect();
        ips.sort();

        Self {
            suspicious_ip_count: ips.len() as u64,
            ips,
        }
    }
}

/// Aggregated security counts for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecuritySummary {
    /// Inclusive period start.
    pub period_start: DateTime<Utc>,
    /// Inclusive period end.
    pub period_end: DateTime<Utc>,
    /// Failed login attempts.
    pub failed_logins: u64,
    /// Successful logins.
    pub successful_logins: u64,
    /// Password reset events of any outcome.
    pub password_resets: u64,
    /// Successful registrations.
    pub new_registrations: u64,
    /// Requests rejected by CSRF validation.
    pub csrf_violations: u64,
    /// Recorded rate-limit violations.
    pub rate_limit_hits: u64,
    /// Rate-limit violations grouped by limit type.
    pub rate_limit_hits_by_type: BTreeMap<String, u64>,
    /// IPs with repeated failed logins.
    pub suspicious_activity: SuspiciousActivity,
}

impl SecuritySummary {
    /// Returns an all-zero summary for the period.
    #[must_use]
    pub fn empty(period: ReportingPeriod) -> Self {
        Self {
            period_start: period.start(),
            period_end: period.end(),
            failed_logins: 0,
            successful_logins: 0,
            password_resets: 0,
            new_registrations: 0,
            csrf_violations: 0,
            rate_limit_hits: 0,
            rate_limit_hits_by_type: BTreeMap::new(),
            suspicious_activity: SuspiciousActivity::default(),
        }
    }

    /// Aggregates events and violations that fall inside the period.
    #[must_use]
    pub fn from_events(
        period: ReportingPeriod,
        events: &[SecurityEvent],
        violations: &[ViolationRecord],
    ) -> Self {
        let mut summary = Self::empty(period);
        let mut failed_login_ips = Vec::new();

        for event in events
            .iter()
            .filter(|event| period.contains(event.occurred_at))
        {
            match (event.kind, event.outcome) {
                (SecurityEventKind::Login, EventOutcome::Success) => summary.successful_logins += 1,
                (SecurityEventKind::Login, EventOutcome::Failure) => {
                    summary.failed_logins += 1;
                    if let Some(ip) = event.source_ip.as_deref() {
                        failed_login_ips.push(ip);
                    }
                }
                (SecurityEventKind::PasswordReset, _) => summary.password_resets += 1,
                (SecurityEventKind::Registration, EventOutcome::Success) => {
                    summary.new_registrations += 1;
                }
                (SecurityEventKind::Registration, EventOutcome::Failure) => {}
                (SecurityEventKind::CsrfViolation, _) => summary.csrf_violations += 1,
            }
        }

        for violation in violations
            .iter()
            .filter(|violation| period.contains(violation.occurred_at))
        {
            summary.rate_limit_hits += 1;
            *summary
                .rate_limit_hits_by_type
                .entry(violation.limit_type.as_str().to_owned())
                .or_default() += 1;
        }

        summary.suspicious_activity = SuspiciousActivity::from_failed_logins(
            failed_login_ips,
            SUSPICIOUS_IP_FAILED_LOGIN_THRESHOLD,
        );

        summary
    }
}
