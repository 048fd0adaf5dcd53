use std::fmt::Write;

use sha2::{Digest, Sha256};

use warden_core::AppResult;
use warden_domain::ClientIdentifier;

const UNKNOWN_ATTRIBUTE: &str = "unknown";

/// Connection attributes of the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    /// Caller IP address if available.
    pub source_ip: Option<String>,
    /// Caller user-agent if available.
    pub user_agent: Option<String>,
    /// Authenticated subject if the request carries one.
    pub subject: Option<String>,
}

impl ClientContext {
    /// Creates an anonymous request context.
    #[must_use]
    pub fn new(source_ip: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            source_ip,
            user_agent,
            subject: None,
        }
    }

    /// Attaches an authenticated subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    fn attribute(value: Option<&str>) -> &str {
        value
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNKNOWN_ATTRIBUTE)
    }

    fn source_ip(&self) -> &str {
        Self::attribute(self.source_ip.as_deref())
    }

    fn user_agent(&self) -> &str {
        Self::attribute(self.user_agent.as_deref())
    }
}

/// Derives the rate-limit bucket for a request.
///
/// Implementations must be deterministic: the same context always maps to
/// the same identifier.
pub trait ClientIdentifierStrategy: Send + Sync {
    /// Returns the identifier for the request context.
    fn identify(&self, context: &ClientContext) -> AppResult<ClientIdentifier>;
}

/// Hashes source address and user-agent together.
///
/// This is a grouping heuristic, not a security boundary. The user-agent is
/// caller controlled, so rotating it yields a fresh bucket, and clients behind
/// one NAT with identical browsers share a bucket.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpUserAgentIdentifier;

impl ClientIdentifierStrategy for IpUserAgentIdentifier {
    fn identify(&self, context: &ClientContext) -> AppResult<ClientIdentifier> {
        let material = format!("{}|{}", context.source_ip(), context.user_agent());
        ClientIdentifier::new(sha256_hex(&material))
    }
}

/// Uses the authenticated subject when present, otherwise the source address.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubjectOrIpIdentifier;

impl ClientIdentifierStrategy for SubjectOrIpIdentifier {
    fn identify(&self, context: &ClientContext) -> AppResult<ClientIdentifier> {
        let material = match context
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|subject| !subject.is_empty())
        {
            Some(subject) => format!("subject|{subject}"),
            None => format!("ip|{}", context.source_ip()),
        };

        ClientIdentifier::new(sha256_hex(&material))
    }
}

fn sha256_hex(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}
