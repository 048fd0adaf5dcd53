use serde::Serialize;

use crate::SecuritySummary;

/// Score assigned to a period with no deductions.
pub const MAX_SECURITY_SCORE: u8 = 100;

/// Failed logins above this count raise a HIGH alert.
pub const EXCESSIVE_FAILED_LOGINS_THRESHOLD: u64 = 100;

/// Severity of a derived alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    /// Needs immediate attention.
    High,
    /// Should be investigated.
    Medium,
    /// Informational.
    Low,
}

/// Stable alert categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Failed logins exceeded the excessive threshold.
    ExcessiveFailedLogins,
    /// At least one CSRF violation was recorded.
    CsrfViolations,
    /// At least one source IP was flagged as suspicious.
    SuspiciousActivity,
}

impl AlertKind {
    /// Returns the stable alert type identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExcessiveFailedLogins => "excessive_failed_logins",
            Self::CsrfViolations => "csrf_violations",
            Self::SuspiciousActivity => "suspicious_activity",
        }
    }
}

/// Actionable alert derived from a summary. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    /// Alert severity.
    pub level: AlertLevel,
    /// Alert category.
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// Message embedding the offending count.
    pub message: String,
    /// Suggested operator action.
    pub recommendation: String,
}

/// Evaluates the critical alert rules independently; any subset may fire.
#[must_use]
pub fn check_critical_alerts(summary: &SecuritySummary) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if summary.failed_logins > EXCESSIVE_FAILED_LOGINS_THRESHOLD {
        alerts.push(Alert {
            level: AlertLevel::High,
            kind: AlertKind::ExcessiveFailedLogins,
            message: format!(
                "{} failed login attempts detected in the reporting period",
                summary.failed_logins
            ),
            recommendation: "Review the failing accounts and consider tightening login rate limits"
                .to_owned(),
        });
    }

    if summary.csrf_violations > 0 {
        alerts.push(Alert {
            level: AlertLevel::Medium,
            kind: AlertKind::CsrfViolations,
            message: format!(
                "{} CSRF violations detected in the reporting period",
                summary.csrf_violations
            ),
            recommendation: "Check for cross-site request forgery attempts against state-changing forms"
                .to_owned(),
        });
    }

    let suspicious_ips = summary.suspicious_activity.suspicious_ip_count;
    if suspicious_ips > 0 {
        alerts.push(Alert {
            level: AlertLevel::High,
            kind: AlertKind::SuspiciousActivity,
            message: format!("{suspicious_ips} IP addresses show repeated failed logins"),
            recommendation: "Consider blocking the flagged IP addresses at the edge".to_owned(),
        });
    }

    alerts
}

/// Quantity a score rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMetric {
    /// `SecuritySummary::failed_logins`.
    FailedLogins,
    /// `SecuritySummary::csrf_violations`.
    CsrfViolations,
    /// `SecuritySummary::rate_limit_hits`.
    RateLimitHits,
    /// Number of alerts at the given level.
    Alerts(AlertLevel),
}

impl ScoreMetric {
    fn measure(&self, summary: &SecuritySummary, alerts: &[Alert]) -> u64 {
        match self {
            Self::FailedLogins => summary.failed_logins,
            Self::CsrfViolations => summary.csrf_violations,
            Self::RateLimitHits => summary.rate_limit_hits,
            Self::Alerts(level) => alerts.iter().filter(|alert| alert.level == *level).count() as u64,
        }
    }
}

/// When a score rule applies its penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTrigger {
    /// Penalty applied once when the metric is strictly above the value.
    Above(u64),
    /// Penalty applied once per unit of the metric.
    PerOccurrence,
}

/// One additive deduction rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreRule {
    /// Stable rule name reported in breakdowns.
    pub name: String,
    /// Inspected quantity.
    pub metric: ScoreMetric,
    /// Application mode.
    pub trigger: ScoreTrigger,
    /// Points deducted per application.
    pub penalty: u32,
    /// Optional upper bound on this rule's total deduction.
    pub cap: Option<u32>,
}

impl ScoreRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        metric: ScoreMetric,
        trigger: ScoreTrigger,
        penalty: u32,
        cap: Option<u32>,
    ) -> Self {
        Self {
            name: name.into(),
            metric,
            trigger,
            penalty,
            cap,
        }
    }

    fn deduction(&self, summary: &SecuritySummary, alerts: &[Alert]) -> u64 {
        let value = self.metric.measure(summary, alerts);
        let raw = match self.trigger {
            ScoreTrigger::Above(threshold) if value > threshold => u64::from(self.penalty),
            ScoreTrigger::Above(_) => 0,
            ScoreTrigger::PerOccurrence => value.saturating_mul(u64::from(self.penalty)),
        };

        match self.cap {
            Some(cap) => raw.min(u64::from(cap)),
            None => raw,
        }
    }
}

/// Deduction applied by one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreDeduction {
    /// Rule name.
    pub rule: String,
    /// Points deducted.
    pub points: u64,
}

/// Score with the deductions that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityScore {
    /// Final score in `0..=100`.
    pub score: u8,
    /// Non-zero deductions in rule order.
    pub deductions: Vec<ScoreDeduction>,
}

/// Ordered rule table behind the security score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityScorePolicy {
    rules: Vec<ScoreRule>,
}

impl SecurityScorePolicy {
    /// Creates a policy from an ordered rule list.
    #[must_use]
    pub fn new(rules: Vec<ScoreRule>) -> Self {
        Self { rules }
    }

    /// Returns a copy of this policy with an extra rule appended.
    #[must_use]
    pub fn with_rule(mut self, rule: ScoreRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Configured rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[ScoreRule] {
        &self.rules
    }

    /// Applies every rule and clamps the result to `0..=100`.
    #[must_use]
    pub fn evaluate(&self, summary: &SecuritySummary, alerts: &[Alert]) -> SecurityScore {
        let deductions: Vec<ScoreDeduction> = self
            .rules
            .iter()
            .map(|rule| ScoreDeduction {
                rule: rule.name.clone(),
                points: rule.deduction(summary, alerts),
            })
            .filter(|deduction| deduction.points > 0)
            .collect();

        let total = deductions
            .iter()
            .fold(0_u64, |total, deduction| total.saturating_add(deduction.points));
        let score = u64::from(MAX_SECURITY_SCORE).saturating_sub(total);

        SecurityScore {
            score: u8::try_from(score).unwrap_or(MAX_SECURITY_SCORE),
            deductions,
        }
    }

    /// Returns only the clamped score.
    #[must_use]
    pub fn calculate(&self, summary: &SecuritySummary, alerts: &[Alert]) -> u8 {
        self.evaluate(summary, alerts).score
    }
}

impl Default for SecurityScorePolicy {
    fn default() -> Self {
        Self::new(vec![
            ScoreRule::new(
                "failed_logins_over_50",
                ScoreMetric::FailedLogins,
                ScoreTrigger::Above(50),
                10,
                None,
            ),
            ScoreRule::new(
                "failed_logins_over_100",
                ScoreMetric::FailedLogins,
                ScoreTrigger::Above(100),
                20,
                None,
            ),
            ScoreRule::new(
                "csrf_violations",
                ScoreMetric::CsrfViolations,
                ScoreTrigger::PerOccurrence,
                5,
                Some(30),
            ),
            ScoreRule::new(
                "high_alerts",
                ScoreMetric::Alerts(AlertLevel::High),
                ScoreTrigger::PerOccurrence,
                15,
                None,
            ),
            ScoreRule::new(
                "medium_alerts",
                ScoreMetric::Alerts(AlertLevel::Medium),
                ScoreTrigger::PerOccurrence,
                5,
                None,
            ),
        ])
    }
}

/// Scores a summary with the default rule table.
#[must_use]
pub fn calculate_security_score(summary: &SecuritySummary, alerts: &[Alert]) -> u8 {
    SecurityScorePolicy::default().calculate(summary, alerts)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    use super::{
        Alert, AlertKind, AlertLevel, ScoreMetric, ScoreRule, ScoreTrigger, SecurityScorePolicy,
        calculate_security_score, check_critical_alerts,
    };
    use crate::{ReportingPeriod, SecuritySummary, SuspiciousActivity};

    fn summary(failed_logins: u64, csrf_violations: u64) -> SecuritySummary {
        let period = ReportingPeriod::trailing(Utc::now(), Duration::days(1));
        SecuritySummary {
            failed_logins,
            csrf_violations,
            ..SecuritySummary::empty(period)
        }
    }

    fn alert(level: AlertLevel) -> Alert {
        Alert {
            level,
            kind: AlertKind::SuspiciousActivity,
            message: String::new(),
            recommendation: String::new(),
        }
    }

    #[test]
    fn clean_period_scores_100() {
        assert_eq!(calculate_security_score(&summary(0, 0), &[]), 100);
    }

    #[test]
    fn failed_login_thresholds_are_additive() {
        assert_eq!(calculate_security_score(&summary(50, 0), &[]), 100);
        assert_eq!(calculate_security_score(&summary(51, 0), &[]), 90);
        assert_eq!(calculate_security_score(&summary(150, 0), &[]), 70);
    }

    #[test]
    fn csrf_penalty_is_capped() {
        assert_eq!(calculate_security_score(&summary(0, 2), &[]), 90);
        assert_eq!(calculate_security_score(&summary(0, 100), &[]), 70);
    }

    #[test]
    fn alert_levels_deduct_by_severity() {
        let alerts = vec![
            alert(AlertLevel::High),
            alert(AlertLevel::Medium),
            alert(AlertLevel::Low),
        ];
        assert_eq!(calculate_security_score(&summary(0, 0), &alerts), 80);
    }

    #[test]
    fn score_floors_at_zero() {
        let alerts: Vec<Alert> = (0..10).map(|_| alert(AlertLevel::High)).collect();
        assert_eq!(calculate_security_score(&summary(500, 50), &alerts), 0);
    }

    #[test]
    fn score_breakdown_lists_applied_rules() {
        let result = SecurityScorePolicy::default().evaluate(&summary(150, 1), &[]);
        let rules: Vec<&str> = result
            .deductions
            .iter()
            .map(|deduction| deduction.rule.as_str())
            .collect();
        assert_eq!(
            rules,
            vec!["failed_logins_over_50", "failed_logins_over_100", "csrf_violations"]
        );
        assert_eq!(result.score, 65);
    }

    #[test]
    fn custom_rules_extend_the_table() {
        let mut base = summary(0, 0);
        base.rate_limit_hits = 7;
        let policy = SecurityScorePolicy::default().with_rule(ScoreRule::new(
            "rate_limit_hits",
            ScoreMetric::RateLimitHits,
            ScoreTrigger::PerOccurrence,
            2,
            Some(10),
        ));
        assert_eq!(policy.calculate(&base, &[]), 90);
    }

    #[test]
    fn excessive_failed_login_alert_uses_strict_boundary() {
        assert!(check_critical_alerts(&summary(100, 0)).is_empty());

        let alerts = check_critical_alerts(&summary(101, 0));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::High);
        assert_eq!(alerts[0].kind.as_str(), "excessive_failed_logins");
        assert!(alerts[0].message.contains("101"));
    }

    #[test]
    fn alert_rules_fire_independently() {
        let mut base = summary(120, 3);
        base.suspicious_activity = SuspiciousActivity {
            suspicious_ip_count: 2,
            ips: vec!["10.0.0.1".to_owned(), "10.0.0.2".to_owned()],
        };

        let kinds: Vec<AlertKind> = check_critical_alerts(&base)
            .into_iter()
            .map(|alert| alert.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                AlertKind::ExcessiveFailedLogins,
                AlertKind::CsrfViolations,
                AlertKind::SuspiciousActivity,
            ]
        );
    }

    #[test]
    fn alert_serializes_type_and_uppercase_level() {
        let value = serde_json::to_value(alert(AlertLevel::Medium));
        assert!(value.is_ok());
        let value = value.unwrap_or_default();
        assert_eq!(value["level"], "MEDIUM");
        assert_eq!(value["type"], "suspicious_activity");
    }

    proptest! {
        #[test]
        fn score_stays_within_bounds(
            failed in 0_u64..10_000,
            csrf in 0_u64..10_000,
            high in 0_usize..20,
            medium in 0_usize..20,
        ) {
            let mut alerts: Vec<Alert> = (0..high).map(|_| alert(AlertLevel::High)).collect();
            alerts.extend((0..medium).map(|_| alert(AlertLevel::Medium)));
            let score = calculate_security_score(&summary(failed, csrf), &alerts);
            prop_assert!(score <= 100);
        }
    }
}
