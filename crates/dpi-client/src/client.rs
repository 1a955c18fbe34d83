//! DNS-over-HTTPS client for JSON resolver APIs.

use dpi_core::{ProbeError, RecordType, Result};
use reqwest::header::ACCEPT;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::DohProvider;

/// Media type of the JSON DoH API
const DNS_JSON: &str = "application/dns-json";

/// Default per-query timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// One entry of the `Answer` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DohAnswer {
    /// Owner name
    #[serde(default)]
    pub name: Option<String>,

    /// Numeric RR type (1 = A, 12 = PTR)
    #[serde(rename = "type")]
    pub record_type: u16,

    /// Record data: an address for A, a host name for PTR
    pub data: String,
}

/// JSON DoH response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DohResponse {
    /// DNS RCODE (0 = NOERROR, 3 = NXDOMAIN)
    #[serde(rename = "Status", default)]
    pub status: Option<u32>,

    /// Answer records, absent when nothing matched
    #[serde(rename = "Answer", default)]
    pub answer: Vec<DohAnswer>,
}

impl DohResponse {
    /// Record data of the given type, trailing dots stripped
    pub fn records(&self, record_type: RecordType) -> impl Iterator<Item = &str> {
        self.answer
            .iter()
            .filter(move |a| a.record_type == record_type.code())
            .map(|a| a.data.trim_end_matches('.'))
    }
}

/// DoH client shared by all DNS probes
#[derive(Clone)]
pub struct DohClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    timeout: Duration,
}

impl DohClient {
    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> DohClientBuilder {
        DohClientBuilder::new()
    }

    /// Query one provider for `name` records of `record_type`.
    ///
    /// A non-success HTTP status is reported as [`ProbeError::Provider`];
    /// callers treat it as "not resolved".
    pub async fn query(
        &self,
        provider: &DohProvider,
        name: &str,
        record_type: RecordType,
    ) -> Result<DohResponse> {
        let url = build_url(&provider.url, &[("name", name), ("type", record_type.as_str())])?;
        debug!(provider = %provider.name, url = %url, "DoH query");

        let response = self
            .inner
            .http
            .get(url)
            .header(ACCEPT, DNS_JSON)
            .timeout(self.inner.timeout)
            .send()
            .await
            .map_err(|e| self.request_error(&e))?;

        self.handle_response(provider, response).await
    }

    /// Decode a DoH response
    async fn handle_response(
        &self,
        provider: &DohProvider,
        response: reqwest::Response,
    ) -> Result<DohResponse> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await.map_err(|e| self.request_error(&e))?;
            serde_json::from_str(&body).map_err(ProbeError::Json)
        } else {
            warn!(provider = %provider.name, status = status.as_u16(), "DoH provider returned error status");
            Err(ProbeError::Provider {
                provider: provider.name.clone(),
                code: status.as_u16(),
            })
        }
    }

    fn request_error(&self, err: &reqwest::Error) -> ProbeError {
        if err.is_timeout() {
            ProbeError::Timeout(u64::try_from(self.inner.timeout.as_millis()).unwrap_or(u64::MAX))
        } else {
            ProbeError::Http(err.to_string())
        }
    }
}

/// Build a provider URL with query parameters
fn build_url(base: &str, params: &[(&str, &str)]) -> Result<Url> {
    Url::parse_with_params(base, params).map_err(|e| ProbeError::InvalidUrl(format!("{base}: {e}")))
}

/// Builder for configuring a [`DohClient`]
pub struct DohClientBuilder {
    timeout: Duration,
    user_agent: String,
}

impl Default for DohClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DohClientBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("dpi-probe/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the per-query timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<DohClient> {
        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| ProbeError::Config(format!("failed to build DoH client: {e}")))?;

        Ok(DohClient {
            inner: Arc::new(ClientInner {
                http,
                timeout: self.timeout,
            }),
        })
    }
}
