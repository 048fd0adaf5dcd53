use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use warden_core::{AppError, AppResult};
use warden_domain::{
    ClientIdentifier, LimitType, RateLimitPolicy, RateLimitStatus, ViolationRecord,
    rate_window_key,
};

use super::client_identity::{ClientContext, ClientIdentifierStrategy, IpUserAgentIdentifier};
use super::config::StorageFailurePolicy;
use super::ports::{RateLimitStore, ViolationLog};

/// Application service for sliding-window rate limiting.
#[derive(Clone)]
pub struct RateLimitService {
    store: Arc<dyn RateLimitStore>,
    violation_log: Arc<dyn ViolationLog>,
    identifier_strategy: Arc<dyn ClientIdentifierStrategy>,
    policy: Arc<RateLimitPolicy>,
    failure_policy: StorageFailurePolicy,
}

impl RateLimitService {
    /// Creates a rate limit service with IP + user-agent identification and fail-open storage handling.
    #[must_use]
    pub fn new(
        store: Arc<dyn RateLimitStore>,
        violation_log: Arc<dyn ViolationLog>,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            store,
            violation_log,
            identifier_strategy: Arc::new(IpUserAgentIdentifier),
            policy: Arc::new(policy),
            failure_policy: StorageFailurePolicy::default(),
        }
    }

    /// Replaces the client identifier strategy.
    #[must_use]
    pub fn with_identifier_strategy(mut self, strategy: Arc<dyn ClientIdentifierStrategy>) -> Self {
        self.identifier_strategy = strategy;
        self
    }

    /// Replaces the storage failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, failure_policy: StorageFailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Configured limit table.
    #[must_use]
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Derives the client identifier for a request context.
    pub fn identify(&self, context: &ClientContext) -> AppResult<ClientIdentifier> {
        self.identifier_strategy.identify(context)
    }

    /// Admits or denies one unit of work for the limit type.
    ///
    /// Unknown or malformed limit types use the `global` budget.
    pub async fn check_limit(&self, limit_type: &str, context: &ClientContext) -> bool {
        self.check_limit_at(&resolve_limit_type(limit_type), context, Utc::now())
            .await
    }

    /// Admits or denies one unit of work at an explicit instant.
    pub async fn check_limit_at(
        &self,
        limit_type: &LimitType,
        context: &ClientContext,
        now: DateTime<Utc>,
    ) -> bool {
        let config = self.policy.resolve(limit_type);
        let client = match self.identify(context) {
            Ok(client) => client,
            Err(error) => return self.storage_failure_decision(limit_type, &error),
        };
        let key = rate_window_key(limit_type, &client);

        let decision = match self.store.try_acquire(&key, config, now).await {
            Ok(decision) => decision,
            Err(error) => return self.storage_failure_decision(limit_type, &error),
        };

        if decision.is_admitted() {
            return true;
        }

        debug!(
            limit_type = %limit_type,
            client = %client,
            current_requests = decision.current_requests(),
            max_requests = config.max_requests(),
            "rate limit exceeded"
        );

        let record = ViolationRecord {
            client,
            limit_type: limit_type.clone(),
            occurred_at: now,
        };
        if let Err(error) = self.violation_log.append_violation(record).await {
            warn!(limit_type = %limit_type, %error, "failed to record rate limit violation");
        }

        false
    }

    /// Like `check_limit`, but maps a denial to `AppError::RateLimited`.
    pub async fn enforce(&self, limit_type: &str, context: &ClientContext) -> AppResult<()> {
        if self.check_limit(limit_type, context).await {
            return Ok(());
        }

        Err(AppError::RateLimited(
            "too many requests, please try again later".to_owned(),
        ))
    }

    /// Returns the current usage of the caller's window.
    pub async fn get_status(
        &self,
        limit_type: &str,
        context: &ClientContext,
    ) -> AppResult<RateLimitStatus> {
        self.get_status_at(&resolve_limit_type(limit_type), context, Utc::now())
            .await
    }

    /// Returns the caller's window usage at an explicit instant.
    pub async fn get_status_at(
        &self,
        limit_type: &LimitType,
        context: &ClientContext,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitStatus> {
        let config = self.policy.resolve(limit_type);
        let client = self.identify(context)?;
        let current = self
            .store
            .current_count(&rate_window_key(limit_type, &client), config, now)
            .await?;

        Ok(RateLimitStatus::new(
            limit_type.clone(),
            config,
            current.min(config.max_requests()),
            now,
        ))
    }

    /// Clears one client's window for a limit type.
    pub async fn reset_limit(
        &self,
        limit_type: &str,
        identifier: &ClientIdentifier,
    ) -> AppResult<bool> {
        let limit_type = resolve_limit_type(limit_type);
        let existed = self
            .store
            .reset(&rate_window_key(&limit_type, identifier))
            .await?;

        info!(limit_type = %limit_type, client = %identifier, existed, "rate limit window reset");
        Ok(existed)
    }

    /// Clears every recorded violation and returns how many were removed.
    pub async fn clear_all_violations(&self) -> AppResult<u64> {
        let cleared = self.violation_log.clear_all().await?;
        info!(cleared, "rate limit violations cleared");
        Ok(cleared)
    }

    /// Lists one client's violation history.
    pub async fn violations_for_client(
        &self,
        identifier: &ClientIdentifier,
    ) -> AppResult<Vec<ViolationRecord>> {
        self.violation_log.list_for_client(identifier).await
    }

    fn storage_failure_decision(&self, limit_type: &LimitType, error: &AppError) -> bool {
        let admitted = self.failure_policy.admits();
        warn!(
            limit_type = %limit_type,
            %error,
            admitted,
            "rate limit storage unavailable"
        );
        admitted
    }
}

fn resolve_limit_type(value: &str) -> LimitType {
    LimitType::new(value).unwrap_or_else(|_| LimitType::global())
}
