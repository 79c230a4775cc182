//! Error types for the Olho Vivo proxy
//!
//! Every variant is terminal for the invocation that produced it. The HTTP status and
//! the caller-facing message are fixed per variant; upstream details stay server-side
//! except for transport error text, which is echoed in the `error` field.

use crate::types::ErrorResponse;
use thiserror::Error;

/// Maximum number of characters of an upstream body kept for diagnostics
pub const BODY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum Error {
    #[error("server not configured")]
    ConfigurationMissing,

    #[error("missing search term")]
    InvalidInput,

    #[error("authentication failed")]
    UpstreamAuthFailed {
        /// Truncated upstream body, for server-side logs only
        body: String,
        cookie_present: bool,
    },

    #[error("internal error during authentication")]
    UpstreamAuthTransport(String),

    #[error("upstream search failed (status: {status})")]
    UpstreamSearchHttp {
        status: u16,
        reason: Option<String>,
    },

    #[error("upstream returned invalid (non-JSON) data; session likely expired")]
    UpstreamSearchMalformed {
        /// First characters of the raw body, for server-side logs only
        preview: String,
    },

    #[error("internal error during search")]
    UpstreamSearchTransport(String),
}

impl Error {
    /// Authentication rejected by the upstream (wrong body or no cookie)
    pub fn auth_rejected(body: &str, cookie_present: bool) -> Self {
        Error::UpstreamAuthFailed {
            body: body_preview(body),
            cookie_present,
        }
    }

    /// Search answered with something that is not JSON
    pub fn malformed_search_body(raw: &str) -> Self {
        Error::UpstreamSearchMalformed {
            preview: body_preview(raw),
        }
    }

    /// HTTP status reported to the caller
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ConfigurationMissing => 500,
            Error::InvalidInput => 400,
            Error::UpstreamAuthFailed { .. } => 401,
            Error::UpstreamAuthTransport(_) => 500,
            Error::UpstreamSearchHttp { .. } => 502,
            Error::UpstreamSearchMalformed { .. } => 502,
            Error::UpstreamSearchTransport(_) => 500,
        }
    }

    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ConfigurationMissing => "configuration_missing",
            Error::InvalidInput => "invalid_input",
            Error::UpstreamAuthFailed { .. } => "upstream_auth_failed",
            Error::UpstreamAuthTransport(_) => "upstream_auth_transport",
            Error::UpstreamSearchHttp { .. } => "upstream_search_http",
            Error::UpstreamSearchMalformed { .. } => "upstream_search_malformed",
            Error::UpstreamSearchTransport(_) => "upstream_search_transport",
        }
    }

    /// JSON body sent to the caller
    pub fn to_error_response(&self) -> ErrorResponse {
        let error = match self {
            Error::UpstreamAuthTransport(detail) | Error::UpstreamSearchTransport(detail) => {
                Some(detail.clone())
            }
            _ => None,
        };

        ErrorResponse {
            message: self.to_string(),
            error,
        }
    }
}

/// Truncate an upstream body to `BODY_PREVIEW_CHARS` characters
pub fn body_preview(body: &str) -> String {
    let mut chars = body.chars();
    let preview: String = chars.by_ref().take(BODY_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

pub type Result<T> = std::result::Result<T, Error>;
