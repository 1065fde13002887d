//! # Probes
//!
//! A probe issues one request against a route and reports what came back.
//! [`HttpProbe`] is the production implementation; tests substitute scripted
//! probes through the [`Probe`] trait.

use super::policy::ProbeMethod;
use super::predicate::ProbeResponse;
use crate::constants::MAX_PROBE_BODY_BYTES;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;
use url::Url;

/// One probe request
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub url: Url,
    pub method: ProbeMethod,
    /// Read (a bounded prefix of) the body
    pub read_body: bool,
    pub timeout: Duration,
}

/// Why a single probe did not count as ready
///
/// Every variant is transient from the poller's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    /// Connection refused, DNS failure, TLS handshake failure, reset
    #[error("transport error: {0}")]
    Transport(String),

    #[error("probe request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// A response arrived but the success predicate rejected it
    #[error("HTTP {status} response did not satisfy {expected}")]
    Rejected { status: u16, expected: String },
}

impl ProbeFailure {
    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeFailure::Transport(_) => "transport",
            ProbeFailure::RequestTimeout(_) => "request_timeout",
            ProbeFailure::Rejected { .. } => "rejected",
        }
    }
}

/// Issues single probe requests
#[async_trait]
pub trait Probe: Send + Sync {
    /// Perform one request
    ///
    /// # Errors
    ///
    /// Returns [`ProbeFailure::Transport`] or [`ProbeFailure::RequestTimeout`]
    /// when no response was received. Any HTTP response, whatever its status,
    /// is returned as `Ok`.
    async fn probe(&self, request: &ProbeRequest) -> Result<ProbeResponse, ProbeFailure>;
}

/// Probe backed by a reqwest client that never follows redirects
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    /// Build a probe client
    ///
    /// Set `accept_invalid_certs` for clusters serving self-signed route
    /// certificates.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(accept_invalid_certs: bool) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, request: &ProbeRequest) -> Result<ProbeResponse, ProbeFailure> {
        let method = match request.method {
            ProbeMethod::Get => reqwest::Method::GET,
            ProbeMethod::Head => reqwest::Method::HEAD,
        };

        let mut response = self
            .client
            .request(method, request.url.clone())
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| classify_request_error(&e, request.timeout))?;

        let status = response.status().as_u16();
        trace!("Probe {} {} returned {}", request.method, request.url, status);

        if !request.read_body || request.method == ProbeMethod::Head {
            return Ok(ProbeResponse::new(status));
        }

        let mut body = Vec::new();
        while body.len() < MAX_PROBE_BODY_BYTES {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let take = chunk.len().min(MAX_PROBE_BODY_BYTES - body.len());
                    body.extend_from_slice(&chunk[..take]);
                }
                Ok(None) => break,
                Err(e) => return Err(classify_request_error(&e, request.timeout)),
            }
        }

        Ok(ProbeResponse {
            status,
            body: Some(String::from_utf8_lossy(&body).into_owned()),
        })
    }
}

fn classify_request_error(error: &reqwest::Error, timeout: Duration) -> ProbeFailure {
    if error.is_timeout() {
        return ProbeFailure::RequestTimeout(timeout);
    }
    ProbeFailure::Transport(error_chain(error))
}

/// Error message including its sources, since reqwest's top-level message
/// hides "connection refused" and TLS details
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_message = cause.to_string();
        if !message.contains(&cause_message) {
            message.push_str(": ");
            message.push_str(&cause_message);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages() {
        let rejected = ProbeFailure::Rejected {
            status: 503,
            expected: "status 2xx/3xx".to_string(),
        };
        assert_eq!(
            rejected.to_string(),
            "HTTP 503 response did not satisfy status 2xx/3xx"
        );
        assert_eq!(rejected.kind(), "rejected");
        assert_eq!(
            ProbeFailure::RequestTimeout(Duration::from_millis(800)).to_string(),
            "probe request timed out after 800ms"
        );
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let inner =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let outer = std::io::Error::other(inner);
        assert!(error_chain(&outer).contains("connection refused"));
    }
}
