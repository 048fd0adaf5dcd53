//! Sliding-window rate limiting ports and application service.
//!
//! Every (limit type, client) pair owns a trailing window of admitted request
//! timestamps. Denied attempts are written to the violation log and never
//! occupy a window slot. Storage failures fail open unless configured
//! otherwise.

mod client_identity;
mod config;
mod ports;
mod service;


pub use client_identity::{
    ClientContext, ClientIdentifierStrategy, IpUserAgentIdentifier, SubjectOrIpIdentifier,
};
pub use config::StorageFailurePolicy;
pub use ports::{RateLimitStore, ViolationLog};
pub use service::RateLimitService;
