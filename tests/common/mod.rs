//! Common test utilities
//!
//! - rustls crypto provider setup
//! - an in-memory control plane
//! - a scripted probe for timing tests on a paused clock
//! - axum mock applications for real HTTP probes

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use axum::Router;
use route_readiness::poller::{Probe, ProbeFailure, ProbeRequest, ProbeResponse};
use route_readiness::resolver::{ControlPlane, ControlPlaneError, RouteRecord};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use tokio::task::JoinHandle;
use tokio::time::Instant;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        route_readiness::install_crypto_provider();
    });
}

pub const GREETING: &str = "Greetings from Spring Boot!";

/// Route record for `name` served at `host`
pub fn record(name: &str, host: &str, tls: bool) -> RouteRecord {
    RouteRecord {
        name: name.to_string(),
        host: Some(host.to_string()),
        path: None,
        tls,
    }
}

/// In-memory control plane
///
/// `find_routes` returns every record in the namespace, so the resolver's
/// exact-name filtering is exercised.
#[derive(Debug, Default)]
pub struct FakeControlPlane {
    routes: Mutex<HashMap<String, Vec<RouteRecord>>>,
    failure: Option<ControlPlaneError>,
    namespace: Option<String>,
    calls: AtomicUsize,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(self, namespace: &str, record: RouteRecord) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(namespace.to_string())
            .or_default()
            .push(record);
        self
    }

    pub fn failing(mut self, error: ControlPlaneError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn in_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Number of `find_routes` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn find_routes(
        &self,
        namespace: &str,
        _name: &str,
    ) -> Result<Vec<RouteRecord>, ControlPlaneError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    fn current_namespace(&self) -> Option<String> {
        self.namespace.clone()
    }
}

/// One scripted probe result
#[derive(Debug, Clone)]
pub enum Step {
    Status(u16),
    Body(u16, &'static str),
    Refused,
    /// Never answers; the poller's request timeout must cut it off
    Hang,
}

/// Probe that plays back a script, then repeats `fallback` forever
#[derive(Debug)]
pub struct ScriptedProbe {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    started: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<ProbeRequest>>,
}

impl ScriptedProbe {
    pub fn new(script: impl IntoIterator<Item = Step>, fallback: Step) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            started: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Probe that fails `n` times with connection refused, then returns 200
    pub fn failing_then_ready(n: usize) -> Self {
        Self::new(std::iter::repeat_n(Step::Refused, n), Step::Status(200))
    }

    pub fn always(step: Step) -> Self {
        Self::new([], step)
    }

    pub fn attempts(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    /// Start instants of every probe, in order
    pub fn start_times(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<ProbeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn probe(&self, request: &ProbeRequest) -> Result<ProbeResponse, ProbeFailure> {
        self.started.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(request.clone());
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Status(status) => Ok(ProbeResponse::new(status)),
            Step::Body(status, body) => Ok(ProbeResponse::with_body(status, body)),
            Step::Refused => Err(ProbeFailure::Transport(
                "tcp connect error: Connection refused (os error 111)".to_string(),
            )),
            Step::Hang => std::future::pending().await,
        }
    }
}

/// Mock application bound to an ephemeral local port
#[derive(Debug)]
pub struct MockApp {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockApp {
    /// Host and port, as a route record would carry it
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockApp {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve `router` on an ephemeral port
pub async fn start_app(router: Router) -> MockApp {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    start_app_on(listener, router)
}

/// Serve `router` on an already bound listener
pub fn start_app_on(listener: tokio::net::TcpListener, router: Router) -> MockApp {
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    MockApp { addr, handle }
}

/// A local port with nothing listening on it
pub fn refused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
