//! # routectl
//!
//! Command-line access to route resolution and readiness polling, for
//! debugging a test environment by hand.
//!
//! ## Usage
//!
//! ```bash
//! # Print the URL of a route in the current namespace
//! routectl resolve greeting-app
//!
//! # Expand placeholders from the command line
//! routectl --property app.name=greeting-app resolve '${app.name}'
//!
//! # Wait up to 30 seconds for the route, probing every 2 seconds
//! routectl await greeting-app --interval-ms 2000 --timeout-secs 30
//!
//! # Wait for a health endpoint to return 200
//! routectl await greeting-app --path /actuator/health --status 200
//!
//! # Probe a URL once
//! routectl probe https://greeting-app.apps.example.com
//! ```

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use route_readiness::config::{ReadinessConfig, TestProperties};
use route_readiness::poller::{PollPolicy, ProbeMethod, SuccessPredicate};
use route_readiness::resolver::{KubeControlPlane, RouteKind, RouteResolver};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod probe;
mod resolve;
mod wait;

/// Route readiness CLI
#[derive(Parser)]
#[command(name = "routectl")]
#[command(
    about = "Resolve cluster routes and wait for them to answer HTTP traffic",
    long_about = None,
    after_help = "\
Examples:
  routectl resolve greeting-app
  routectl --property app.name=greeting-app await '${app.name}' --timeout-secs 60
  routectl probe http://localhost:8080 --status 200
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Namespace (defaults to ROUTE_NAMESPACE, then the current context namespace)
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Object kind that carries the route: route or ingress
    #[arg(long, global = true)]
    kind: Option<RouteKind>,

    /// Placeholder value, as key=value (repeatable)
    #[arg(
        short,
        long = "property",
        value_name = "KEY=VALUE",
        value_parser = parse_property,
        global = true
    )]
    properties: Vec<(String, String)>,

    /// YAML file with placeholder values
    #[arg(long, value_name = "PATH", global = true)]
    properties_file: Option<PathBuf>,

    /// Dotenv file with placeholder values
    #[arg(long, value_name = "PATH", global = true)]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a service reference and print its URL
    Resolve {
        /// Route name, may contain ${key} placeholders
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Resolve a service reference and wait until it is ready
    Await {
        /// Route name, may contain ${key} placeholders
        #[arg(value_name = "NAME")]
        name: String,

        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Probe a URL once and print the classification
    Probe {
        /// Absolute http(s) URL
        #[arg(value_name = "URL")]
        url: String,

        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Print build information
    Version,
}

/// Poll policy overrides; unset flags fall back to the environment
#[derive(Args)]
struct PolicyArgs {
    /// Time between probes in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Overall wait in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Per-probe request timeout in milliseconds
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// Path appended to the route URL
    #[arg(long)]
    path: Option<String>,

    /// Accepted status codes (repeatable); default is any 2xx/3xx
    #[arg(long = "status", value_name = "CODE")]
    statuses: Vec<u16>,

    /// Require the body to contain this text
    #[arg(long, value_name = "TEXT")]
    body_contains: Option<String>,

    /// Probe with HEAD instead of GET
    #[arg(long)]
    head: bool,

    /// Accept self-signed certificates
    #[arg(long)]
    insecure: bool,
}

impl PolicyArgs {
    fn poll_policy(&self, config: &ReadinessConfig) -> Result<PollPolicy> {
        let interval = self
            .interval_ms
            .map_or(config.poll_interval(), Duration::from_millis);
        let timeout = self
            .timeout_secs
            .map_or(config.poll_timeout(), Duration::from_secs);
        let request_timeout = self
            .request_timeout_ms
            .map_or(config.probe_timeout(), Duration::from_millis);

        let predicate = self.predicate();
        if self.head && predicate.needs_body() {
            bail!("--head cannot be combined with --body-contains, HEAD carries no body");
        }

        let mut policy = PollPolicy::new(interval, timeout)
            .context("Invalid poll policy")?
            .with_request_timeout(request_timeout)
            .with_predicate(predicate);
        if self.head {
            policy = policy.with_method(ProbeMethod::Head);
        }
        if let Some(path) = self.path.as_ref().or(config.probe_path.as_ref()) {
            policy = policy.with_path(path.clone());
        }
        Ok(policy)
    }

    fn predicate(&self) -> SuccessPredicate {
        match (&self.body_contains, self.statuses.as_slice()) {
            (Some(needle), []) => SuccessPredicate::BodyContains {
                status: None,
                needle: needle.clone(),
            },
            (Some(needle), [status]) => SuccessPredicate::BodyContains {
                status: Some(*status),
                needle: needle.clone(),
            },
            (Some(needle), statuses) => {
                let statuses = statuses.to_vec();
                let needle = needle.clone();
                SuccessPredicate::custom(move |response| {
                    statuses.contains(&response.status)
                        && response
                            .body
                            .as_deref()
                            .is_some_and(|body| body.contains(needle.as_str()))
                })
            }
            (None, []) => SuccessPredicate::SuccessOrRedirect,
            (None, statuses) => SuccessPredicate::StatusIn(statuses.to_vec()),
        }
    }

    fn accept_invalid_certs(&self, config: &ReadinessConfig) -> bool {
        self.insecure || config.probe_accept_invalid_certs
    }
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Cli {
    fn test_properties(&self) -> Result<TestProperties> {
        let mut properties = TestProperties::new();
        if let Some(path) = &self.env_file {
            properties
                .load_env_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
        }
        if let Some(path) = &self.properties_file {
            properties
                .load_yaml_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
        }
        for (key, value) in &self.properties {
            properties.insert(key.clone(), value.clone());
        }
        Ok(properties)
    }

    fn config(&self) -> ReadinessConfig {
        let mut config = ReadinessConfig::from_env();
        if let Some(namespace) = &self.namespace {
            config.namespace = Some(namespace.clone());
        }
        if let Some(kind) = self.kind {
            config.route_kind = kind;
        }
        config
    }
}

async fn build_resolver(cli: &Cli, config: &ReadinessConfig) -> Result<RouteResolver> {
    let control_plane = KubeControlPlane::try_default(config.route_kind)
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;
    Ok(RouteResolver::from_config(
        Arc::new(control_plane),
        cli.test_properties()?,
        config,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider FIRST, before any client is built
    route_readiness::install_crypto_provider();

    let cli = Cli::parse();
    let config = cli.config();
    route_readiness::observability::init_tracing(&config);
    route_readiness::observability::register_metrics().context("Failed to register metrics")?;

    match &cli.command {
        Commands::Resolve { name } => {
            let resolver = build_resolver(&cli, &config).await?;
            resolve::resolve_command(&resolver, name).await
        }
        Commands::Await { name, policy } => {
            let resolver = build_resolver(&cli, &config).await?;
            let poll_policy = policy.poll_policy(&config)?;
            wait::await_command(
                &resolver,
                name,
                &poll_policy,
                policy.accept_invalid_certs(&config),
            )
            .await
        }
        Commands::Probe { url, policy } => {
            let poll_policy = policy.poll_policy(&config)?;
            probe::probe_command(url, &poll_policy, policy.accept_invalid_certs(&config)).await
        }
        Commands::Version => {
            println!(
                "routectl {} ({}, built {})",
                env!("CARGO_PKG_VERSION"),
                env!("BUILD_GIT_HASH"),
                env!("BUILD_DATETIME")
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_args(args: &[&str]) -> PolicyArgs {
        let argv = ["routectl", "probe", "http://localhost:8080"]
            .into_iter()
            .chain(args.iter().copied());
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Probe { policy, .. } => policy,
            _ => panic!("expected probe command"),
        }
    }

    #[test]
    fn test_head_with_body_contains_is_rejected() {
        let args = policy_args(&["--head", "--body-contains", "Hello"]);

        let err = args.poll_policy(&ReadinessConfig::default()).unwrap_err();

        assert!(err.to_string().contains("--head"), "{err}");
    }

    #[test]
    fn test_head_with_status_is_accepted() {
        let args = policy_args(&["--head", "--status", "200"]);

        let policy = args.poll_policy(&ReadinessConfig::default()).unwrap();

        assert_eq!(policy.method(), ProbeMethod::Head);
        assert!(!policy.predicate().needs_body());
    }

    #[test]
    fn test_parse_property() {
        assert_eq!(
            parse_property("app.name=greeting-app").unwrap(),
            ("app.name".to_string(), "greeting-app".to_string())
        );
        assert!(parse_property("app.name").is_err());
        assert!(parse_property("=value").is_err());
    }
}
