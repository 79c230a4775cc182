//! Olho Vivo Proxy Egress Connectors
//!
//! This crate provides the connector to the upstream transit API:
//! - Shared HTTP client construction
//! - Olho Vivo connector (authenticate, then search lines)

pub mod client;
pub mod olhovivo;

use thiserror::Error;

/// Egress error types
#[derive(Debug, Error)]
pub enum EgressError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid connector or client configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Request exceeded the configured timeout
    #[error("Request timeout after {0}s")]
    Timeout(u64),
}

/// Egress result type
pub type Result<T> = std::result::Result<T, EgressError>;
