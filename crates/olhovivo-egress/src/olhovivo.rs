//! Olho Vivo egress connector
//!
//! Talks to the SPTrans Olho Vivo API in two steps:
//! 1. `POST {base}/Login/Autenticar?token=...` answers the literal body `true` plus a
//!    `Set-Cookie` header when the token is accepted.
//! 2. `GET {base}/Linha/Buscar?termosBusca=...` with that cookie returns a JSON array.
//!
//! An expired or missing session makes step 2 answer an HTML page with status 200, so
//! the body is decoded by hand instead of trusting the status code.

use crate::{
    EgressError, Result,
    client::{HttpClientConfig, create_client},
};
use async_trait::async_trait;
use olhovivo_core::{ApiToken, Error as CoreError, SearchQuery, SessionCookie, TransitApi};
use reqwest::{
    Client, Url,
    header::{COOKIE, SET_COOKIE},
};
use tracing::{debug, instrument};

/// Default upstream base URL
pub const DEFAULT_BASE_URL: &str = "https://api.olhovivo.sptrans.com.br/v2.1";

const AUTH_PATH: &str = "Login/Autenticar";
const SEARCH_PATH: &str = "Linha/Buscar";

/// Olho Vivo connector configuration
#[derive(Debug, Clone)]
pub struct OlhoVivoConfig {
    /// Base URL for the API, including the version segment
    pub base_url: String,

    /// HTTP client configuration
    pub client_config: HttpClientConfig,
}

impl OlhoVivoConfig {
    /// Create a configuration pointing at the public API
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_config: HttpClientConfig::default(),
        }
    }

    /// Set the base URL (for mirrors and tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the HTTP client configuration
    pub fn with_client_config(mut self, client_config: HttpClientConfig) -> Self {
        self.client_config = client_config;
        self
    }
}

impl Default for OlhoVivoConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Olho Vivo connector
pub struct OlhoVivoConnector {
    config: OlhoVivoConfig,
    client: Client,
    auth_url: Url,
    search_url: Url,
}

impl OlhoVivoConnector {
    /// Create a new connector, validating the base URL
    pub fn new(config: OlhoVivoConfig) -> Result<Self> {
        let client = create_client(&config.client_config)?;
        let auth_url = endpoint(&config.base_url, AUTH_PATH)?;
        let search_url = endpoint(&config.base_url, SEARCH_PATH)?;

        Ok(Self {
            config,
            client,
            auth_url,
            search_url,
        })
    }

    /// Configured base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Send the authentication request, returning the raw body and any cookie
    async fn send_authenticate(&self, token: &ApiToken) -> Result<(String, Option<SessionCookie>)> {
        let mut url = self.auth_url.clone();
        url.query_pairs_mut().append_pair("token", token.expose());

        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        debug!(status = %response.status(), "Olho Vivo authentication response");

        let cookie = SessionCookie::from_set_cookie(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok()),
        );

        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        Ok((body, cookie))
    }

    /// Send the search request, returning the response for status inspection
    async fn send_search(
        &self,
        session: &SessionCookie,
        query: &SearchQuery,
    ) -> Result<reqwest::Response> {
        let url = search_url_with_term(&self.search_url, query.as_str());

        let response = self
            .client
            .get(url)
            .header(COOKIE, session.header_value())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        debug!(status = %response.status(), "Olho Vivo search response");

        Ok(response)
    }

    /// Convert a reqwest failure, never keeping the URL (it carries the token)
    fn transport_error(&self, err: reqwest::Error) -> EgressError {
        if err.is_timeout() {
            EgressError::Timeout(self.config.client_config.timeout_secs)
        } else {
            EgressError::HttpError(err.without_url())
        }
    }
}

#[async_trait]
impl TransitApi for OlhoVivoConnector {
    #[instrument(skip_all)]
    async fn authenticate(&self, token: &ApiToken) -> olhovivo_core::Result<SessionCookie> {
        let (body, cookie) = self
            .send_authenticate(token)
            .await
            .map_err(|e| CoreError::UpstreamAuthTransport(e.to_string()))?;

        match cookie {
            Some(cookie) if body == "true" => Ok(cookie),
            cookie => Err(CoreError::auth_rejected(&body, cookie.is_some())),
        }
    }

    #[instrument(skip(self, session, query), fields(query = %query))]
    async fn search_lines(
        &self,
        session: &SessionCookie,
        query: &SearchQuery,
    ) -> olhovivo_core::Result<serde_json::Value> {
        let response = self
            .send_search(session, query)
            .await
            .map_err(|e| CoreError::UpstreamSearchTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::UpstreamSearchHttp {
                status: status.as_u16(),
                reason: status.canonical_reason().map(str::to_string),
            });
        }

        let raw = response.text().await.map_err(|e| {
            CoreError::UpstreamSearchTransport(self.transport_error(e).to_string())
        })?;

        serde_json::from_str(&raw).map_err(|e| {
            debug!("Search body is not JSON: {}", e);
            CoreError::malformed_search_body(&raw)
        })
    }

    fn endpoint(&self) -> Option<&str> {
        Some(self.base_url())
    }
}

/// Attach the search term, percent-encoded (space is `%20`, never `+`)
fn search_url_with_term(search_url: &Url, term: &str) -> Url {
    let mut url = search_url.clone();
    url.set_query(Some(&format!("termosBusca={}", urlencoding::encode(term))));
    url
}

/// Join a path onto the base URL, keeping any version segment in the base
fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    let url = Url::parse(&format!("{}/{}", base_url.trim_end_matches('/'), path)).map_err(|e| {
        EgressError::ConfigError(format!("Invalid base URL '{}': {}", base_url, e))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(EgressError::ConfigError(format!(
            "Unsupported URL scheme '{}' in base URL '{}'",
            other, base_url
        ))),
    }
}
