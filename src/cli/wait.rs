//! Await command
//!
//! Resolves a service reference and blocks until the route is ready. Ctrl-C
//! cancels the wait instead of killing the process mid-probe.

use anyhow::{Context, Result};
use route_readiness::poller::{PollOutcome, PollPolicy, ReadinessPoller};
use route_readiness::resolver::RouteResolver;
use route_readiness::route::ServiceReference;
use tokio_util::sync::CancellationToken;

pub async fn await_command(
    resolver: &RouteResolver,
    name: &str,
    policy: &PollPolicy,
    accept_invalid_certs: bool,
) -> Result<()> {
    let poller =
        ReadinessPoller::http(accept_invalid_certs).context("Failed to create HTTP client")?;
    let reference = ServiceReference::new(name);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    println!("► waiting for {reference}");
    let outcome = poller
        .resolve_and_await(resolver, &reference, policy, &cancel)
        .await;

    match outcome {
        PollOutcome::Ready { .. } => {
            println!("✔ {outcome}");
            Ok(())
        }
        other => {
            println!("✗ {other}");
            Err(anyhow::anyhow!("{reference} is not ready"))
        }
    }
}
