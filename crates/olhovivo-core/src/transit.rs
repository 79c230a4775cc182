//! Upstream transit API trait

use crate::{
    Result,
    types::{ApiToken, SearchQuery, SessionCookie},
};

/// The two upstream steps of a line search
///
/// Each step reports its own outcome; callers compose them sequentially and stop at
/// the first error. Implementations must not cache sessions across calls.
#[async_trait::async_trait]
pub trait TransitApi: Send + Sync {
    /// Exchange the API token for a session cookie
    ///
    /// Fails with `UpstreamAuthFailed` when the upstream rejects the token and with
    /// `UpstreamAuthTransport` when the call itself fails.
    async fn authenticate(&self, token: &ApiToken) -> Result<SessionCookie>;

    /// Search lines with a session obtained from `authenticate`
    ///
    /// Returns the decoded JSON payload unmodified.
    async fn search_lines(
        &self,
        session: &SessionCookie,
        query: &SearchQuery,
    ) -> Result<serde_json::Value>;

    /// Base URL the implementation talks to, for readiness reports
    fn endpoint(&self) -> Option<&str> {
        None
    }
}
