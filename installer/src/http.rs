//! Shared `ureq` client configuration.
//!
//! Index queries and asset downloads need different timeout shapes: a query
//! is small and bounded as a whole, while a download may legitimately run
//! for minutes once the response has started.

use std::time::Duration;

use sitesync::ReleaseConfig;
use ureq::http::Response;

/// Media type requested from the GitHub REST API.
pub(crate) const GITHUB_JSON: &str = "application/vnd.github+json";

/// Media type requested for asset downloads.
pub(crate) const OCTET_STREAM: &str = "application/octet-stream";

/// A configured HTTP agent plus the headers every request carries.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    user_agent: String,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Client for small JSON queries; the timeout bounds the whole call.
    #[must_use]
    pub fn for_queries(config: &ReleaseConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Client for streamed downloads; the body itself is not time-bounded.
    #[must_use]
    pub fn for_downloads(config: &ReleaseConfig) -> Self {
        let timeout = Some(Duration::from_secs(config.timeout_secs));
        let agent_config = ureq::Agent::config_builder()
            .timeout_connect(timeout)
            .timeout_recv_response(timeout)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Issue a GET request. Non-success statuses surface as
    /// [`ureq::Error::StatusCode`].
    pub(crate) fn get(
        &self,
        url: &str,
        accept: &str,
    ) -> Result<Response<ureq::Body>, ureq::Error> {
        self.agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .header("Accept", accept)
            .call()
    }
}

/// Render a transport failure as a short reason string.
pub(crate) fn describe_ureq_error(err: &ureq::Error) -> String {
    match err {
        ureq::Error::StatusCode(code) => format!("server responded with HTTP {code}"),
        other => other.to_string(),
    }
}
