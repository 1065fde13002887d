//! # Kubernetes Control Plane
//!
//! Reads OpenShift `Route` objects (through a dynamic API, the CRD is not
//! compiled in) or Kubernetes `Ingress` objects.

use super::control_plane::{ControlPlane, RouteRecord};
use super::error::ControlPlaneError;
use crate::constants::{OPENSHIFT_ROUTE_GROUP, OPENSHIFT_ROUTE_KIND, OPENSHIFT_ROUTE_VERSION};
use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, ApiResource};
use kube::core::{DynamicObject, GroupVersionKind};
use kube::Client;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info_span, Instrument};

/// Kind of object that carries the externally routable host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteKind {
    /// `route.openshift.io/v1` Route
    #[default]
    OpenShiftRoute,
    /// `networking.k8s.io/v1` Ingress
    Ingress,
}

impl RouteKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::OpenShiftRoute => "route",
            RouteKind::Ingress => "ingress",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "route" | "routes" | "openshift" | "openshift-route" => Ok(RouteKind::OpenShiftRoute),
            "ingress" | "ingresses" => Ok(RouteKind::Ingress),
            other => Err(format!("unknown route kind '{other}' (expected 'route' or 'ingress')")),
        }
    }
}

/// [`ControlPlane`] backed by a Kubernetes client
#[derive(Clone)]
pub struct KubeControlPlane {
    client: Client,
    kind: RouteKind,
}

impl fmt::Debug for KubeControlPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeControlPlane")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl KubeControlPlane {
    pub fn new(client: Client, kind: RouteKind) -> Self {
        Self { client, kind }
    }

    /// Create a client from the ambient kubeconfig or in-cluster configuration
    pub async fn try_default(kind: RouteKind) -> Result<Self, ControlPlaneError> {
        let client = Client::try_default()
            .await
            .map_err(|e| ControlPlaneError::Transport(format!("failed to create client: {e}")))?;
        Ok(Self::new(client, kind))
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    async fn get_openshift_route(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<RouteRecord>, ControlPlaneError> {
        let ar = ApiResource::from_gvk(&GroupVersionKind {
            group: OPENSHIFT_ROUTE_GROUP.to_string(),
            version: OPENSHIFT_ROUTE_VERSION.to_string(),
            kind: OPENSHIFT_ROUTE_KIND.to_string(),
        });
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);

        match api.get(name).await {
            Ok(route) => {
                let value = serde_json::to_value(route)
                    .map_err(|e| ControlPlaneError::Malformed(e.to_string()))?;
                Ok(Some(openshift_route_record(&value)?))
            }
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
            Err(e) => Err(map_kube_error(e)),
        }
    }

    async fn get_ingress(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<RouteRecord>, ControlPlaneError> {
        let api: Api<Ingress> = Api::namespaced(self.client.clone(), namespace);

        match api.get(name).await {
            Ok(ingress) => {
                let value = serde_json::to_value(ingress)
                    .map_err(|e| ControlPlaneError::Malformed(e.to_string()))?;
                Ok(Some(ingress_record(&value)?))
            }
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
            Err(e) => Err(map_kube_error(e)),
        }
    }
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    async fn find_routes(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<RouteRecord>, ControlPlaneError> {
        let span = info_span!(
            "control_plane.get_route",
            route.kind = self.kind.as_str(),
            route.name = name,
            namespace = namespace,
            operation.duration_ms = tracing::field::Empty,
            operation.success = tracing::field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let result = match self.kind {
                RouteKind::OpenShiftRoute => self.get_openshift_route(namespace, name).await,
                RouteKind::Ingress => self.get_ingress(namespace, name).await,
            };
            span_clone.record("operation.duration_ms", start.elapsed().as_millis() as u64);
            span_clone.record("operation.success", result.is_ok());
            if let Ok(None) = &result {
                debug!("No {} named {}/{}", self.kind, namespace, name);
            }
            result.map(|record| record.into_iter().collect())
        }
        .instrument(span)
        .await
    }

    fn current_namespace(&self) -> Option<String> {
        Some(self.client.default_namespace().to_string())
    }
}

fn map_kube_error(error: kube::Error) -> ControlPlaneError {
    match error {
        kube::Error::Api(e) if e.code == 401 || e.code == 403 => ControlPlaneError::Unauthorized {
            code: e.code,
            message: e.message.clone(),
        },
        kube::Error::Api(e) => ControlPlaneError::Api {
            code: e.code,
            message: e.message.clone(),
        },
        other => ControlPlaneError::Transport(other.to_string()),
    }
}

fn object_name(object: &Value) -> Result<String, ControlPlaneError> {
    object
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ControlPlaneError::Malformed("object has no metadata.name".to_string()))
}

/// Extract a [`RouteRecord`] from a serialized OpenShift Route
///
/// The host comes from `spec.host`; when that is empty the first admitted
/// `status.ingress[].host` is used instead.
pub fn openshift_route_record(route: &Value) -> Result<RouteRecord, ControlPlaneError> {
    let name = object_name(route)?;
    let spec = route.get("spec");

    let spec_host = spec
        .and_then(|s| s.get("host"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string);

    let host = spec_host.or_else(|| {
        route
            .get("status")
            .and_then(|s| s.get("ingress"))
            .and_then(Value::as_array)
            .and_then(|ingresses| {
                ingresses
                    .iter()
                    .find(|ingress| is_admitted(ingress))
                    .and_then(|ingress| ingress.get("host"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
    });

    let path = spec
        .and_then(|s| s.get("path"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let tls = spec
        .and_then(|s| s.get("tls"))
        .is_some_and(|t| !t.is_null());

    Ok(RouteRecord {
        name,
        host,
        path,
        tls,
    })
}

fn is_admitted(ingress: &Value) -> bool {
    ingress
        .get("conditions")
        .and_then(Value::as_array)
        .is_some_and(|conditions| {
            conditions.iter().any(|c| {
                c.get("type").and_then(Value::as_str) == Some("Admitted")
                    && c.get("status").and_then(Value::as_str) == Some("True")
            })
        })
}

/// Extract a [`RouteRecord`] from a serialized Ingress
///
/// Uses the first rule that names a host and the first path of that rule. The
/// record is TLS when the host appears under `spec.tls[].hosts`.
pub fn ingress_record(ingress: &Value) -> Result<RouteRecord, ControlPlaneError> {
    let name = object_name(ingress)?;
    let spec = ingress.get("spec");

    let rule = spec
        .and_then(|s| s.get("rules"))
        .and_then(Value::as_array)
        .and_then(|rules| {
            rules.iter().find(|r| {
                r.get("host")
                    .and_then(Value::as_str)
                    .is_some_and(|h| !h.trim().is_empty())
            })
        });

    let host = rule
        .and_then(|r| r.get("host"))
        .and_then(Value::as_str)
        .map(|h| h.trim().to_string());

    let path = rule
        .and_then(|r| r.get("http"))
        .and_then(|h| h.get("paths"))
        .and_then(Value::as_array)
        .and_then(|paths| paths.first())
        .and_then(|p| p.get("path"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let tls = match &host {
        Some(host) => spec
            .and_then(|s| s.get("tls"))
            .and_then(Value::as_array)
            .is_some_and(|entries| {
                entries.iter().any(|entry| {
                    entry
                        .get("hosts")
                        .and_then(Value::as_array)
                        .is_some_and(|hosts| {
                            hosts.iter().any(|h| h.as_str() == Some(host.as_str()))
                        })
                })
            }),
        None => false,
    };

    Ok(RouteRecord {
        name,
        host,
        path,
        tls,
    })
}
