//! Resolve command
//!
//! Prints the URL a service reference resolves to. Performs no probing.

use anyhow::Result;
use route_readiness::resolver::RouteResolver;
use route_readiness::route::ServiceReference;

pub async fn resolve_command(resolver: &RouteResolver, name: &str) -> Result<()> {
    let reference = ServiceReference::new(name);
    let route = resolver.resolve(&reference).await?;

    println!("{}", route.url());
    Ok(())
}
