//! Probe command

use anyhow::{Context, Result};
use route_readiness::poller::{HttpProbe, PollPolicy, Probe, ProbeFailure, ProbeRequest};
use route_readiness::route::append_path;
use url::Url;

/// Issue one probe against `url` and report how the policy classifies it
pub async fn probe_command(
    url: &str,
    policy: &PollPolicy,
    accept_invalid_certs: bool,
) -> Result<()> {
    let mut url = Url::parse(url).with_context(|| format!("Invalid URL '{url}'"))?;
    if let Some(path) = policy.path() {
        url = append_path(&url, path)
            .with_context(|| format!("Cannot append path '{path}' to {url}"))?;
    }

    let probe = HttpProbe::new(accept_invalid_certs).context("Failed to create HTTP client")?;
    let request = ProbeRequest {
        url,
        method: policy.method(),
        read_body: policy.predicate().needs_body(),
        timeout: policy.request_timeout(),
    };

    let result = probe.probe(&request).await.and_then(|response| {
        if policy.predicate().accepts(&response) {
            Ok(response.status)
        } else {
            Err(ProbeFailure::Rejected {
                status: response.status,
                expected: policy.predicate().describe(),
            })
        }
    });

    match result {
        Ok(status) => {
            println!("✔ {} {} ready (HTTP {status})", request.method, request.url);
            Ok(())
        }
        Err(failure) => {
            println!("✗ {} {} not ready: {failure}", request.method, request.url);
            Err(anyhow::anyhow!("probe failed: {}", failure.kind()))
        }
    }
}
