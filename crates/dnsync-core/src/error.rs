//! Error types for the dnsync system
//!
//! This module defines all error types used throughout the crate.
//!
//! The taxonomy follows how each failure propagates:
//!
//! - [`ConstraintViolation`]: fatal, raised before any remote mutation
//! - [`MalformedDeclaration`]: fatal, collected for every bad file in a run
//! - per-operation remote failures: carried as data in
//!   [`PlanResult`](crate::executor::PlanResult), never as a crash

use crate::record::RecordType;
use thiserror::Error;

/// Result type alias for dnsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dnsync system
#[derive(Error, Debug)]
pub enum Error {
    /// The declared snapshot breaks a DNS coexistence rule
    #[error("Constraint violation: {0}")]
    Constraint(#[from] ConstraintViolation),

    /// One or more declaration files could not be parsed
    #[error("{} malformed declaration(s): {}", .0.len(), join_malformed(.0))]
    Malformed(Vec<MalformedDeclaration>),

    /// History source errors
    #[error("History error: {0}")]
    History(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The remote call did not complete in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
        /// Whether re-running the sync may succeed
        transient: bool,
    },
}

/// A DNS-level rule broken by the declared snapshot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    /// A CNAME shares its name with an A or AAAA record
    #[error("CNAME conflicts with A/AAAA record at {name}")]
    CnameConflict { name: String },

    /// An NS record shares its name with another record type
    #[error("NS record at {name} must be the only record type at that name")]
    NsExclusivity { name: String },

    /// Two declaration files define the same (name, type) pair
    #[error("{name} ({record_type}) is declared more than once: {}", .paths.join(", "))]
    DuplicateIdentity {
        name: String,
        record_type: RecordType,
        paths: Vec<String>,
    },
}

/// A declaration file that failed to parse or failed shape checks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {reason}")]
pub struct MalformedDeclaration {
    /// Repository-relative path of the file
    pub path: String,
    /// Human-readable reason
    pub reason: String,
}

impl MalformedDeclaration {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

fn join_malformed(items: &[MalformedDeclaration]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a history error
    pub fn history(msg: impl Into<String>) -> Self {
        Self::History(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error that will not go away on its own
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            transient: false,
        }
    }

    /// Create a provider-specific error that a later run may not hit
    pub fn provider_transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            transient: true,
        }
    }

    /// Whether re-invoking the sync could succeed without changing any input
    ///
    /// The executor never retries on its own; this only informs the run summary.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::RateLimited(_) | Error::Http(_) => true,
            Error::Provider { transient, .. } => *transient,
            _ => false,
        }
    }
}
