//! Manifest documents submitted to the controller's `.../yaml` endpoints and
//! the typed microservice spec they usually wrap.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// API version stamped on every manifest the SDK builds.
pub const API_VERSION: &str = "datasance.com/v3";

/// Document kinds accepted by the controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A group of microservices and routes.
    Application,
    /// A parametrized application.
    ApplicationTemplate,
    /// A single microservice.
    Microservice,
    /// A route between two microservices.
    Route,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Kind::Application => "Application",
            Kind::ApplicationTemplate => "ApplicationTemplate",
            Kind::Microservice => "Microservice",
            Kind::Route => "Route",
        };
        f.write_str(kind)
    }
}

/// Manifest metadata block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct HeaderMetadata {
    /// Resource name (`<app>/<msvc>` for microservices).
    pub name: String,
    /// Namespace; empty for controller-scoped resources.
    pub namespace: String,
}

/// Manifest document: `{apiVersion, kind, metadata, spec}`.
///
/// Generic over the spec payload so callers can submit either the typed
/// [`Microservice`] or any other serializable value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest<S> {
    /// Always [`API_VERSION`] for manifests built by the SDK.
    pub api_version: String,
    /// Document kind.
    pub kind: Kind,
    /// Metadata block.
    pub metadata: HeaderMetadata,
    /// Resource payload.
    pub spec: S,
}

impl<S> Manifest<S> {
    /// Builds a manifest with the SDK's API version and an empty namespace.
    pub fn new(kind: Kind, name: impl Into<String>, spec: S) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind,
            metadata: HeaderMetadata {
                name: name.into(),
                namespace: String::new(),
            },
            spec,
        }
    }
}

/// Free-form nested configuration map.
pub type NestedMap = BTreeMap<String, serde_json::Value>;

/// Image references for a microservice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MicroserviceImages {
    /// Catalog item providing the images (0 for custom images).
    pub catalog_id: i64,
    /// Image for x86 agents.
    pub x86: String,
    /// Image for ARM agents.
    pub arm: String,
    /// Registry name (`remote`, `local`, or a registry id).
    pub registry: String,
}

/// Agent overrides applied while scheduling a microservice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentConfiguration {
    /// Container engine socket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_url: Option<String>,
    /// Container engine (`docker`, `podman`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_engine: Option<String>,
    /// Deployment type (`native`, `container`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_type: Option<String>,
    /// Disk limit (GB).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_limit: Option<i64>,
    /// Disk directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_directory: Option<String>,
    /// Memory limit (MB).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<i64>,
    /// CPU limit (percent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<i64>,
    /// Log limit (GB).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_limit: Option<i64>,
    /// Log directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_directory: Option<String>,
    /// Number of rotated log files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_count: Option<i64>,
    /// Status report frequency (seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_frequency: Option<f64>,
    /// Change polling frequency (seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_frequency: Option<f64>,
    /// Router mode (`edge`, `interior`, `none`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router_mode: Option<String>,
    /// Router port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router_port: Option<i64>,
    /// Upstream routers; ignored when router mode is `none`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_routers: Option<Vec<String>>,
    /// Network router; required when router mode is `none`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_router: Option<String>,
}

/// Agent a microservice is scheduled on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct MicroserviceAgent {
    /// Agent name.
    pub name: String,
    /// Agent overrides.
    pub config: AgentConfiguration,
}

/// Container port mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MicroservicePortMapping {
    /// Container port.
    pub internal: i64,
    /// Host port.
    pub external: i64,
    /// Protocol (`tcp` when omitted).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub protocol: String,
}

/// Container volume mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MicroserviceVolumeMapping {
    /// Host path, volume name or volume mount name.
    pub host_destination: String,
    /// Path inside the container.
    pub container_destination: String,
    /// `rw` or `ro`.
    pub access_mode: String,
    /// `bind`, `volume` or `volumeMount`.
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub mapping_type: String,
}

/// Container environment variable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MicroserviceEnvironment {
    /// Variable name.
    pub key: String,
    /// Literal value.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// `secret/key` reference.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value_from_secret: String,
    /// `configmap/key` reference.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value_from_config_map: String,
}

/// Extra `/etc/hosts` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MicroserviceExtraHost {
    /// Host name.
    pub name: String,
    /// Address (may reference another microservice or agent).
    pub address: String,
    /// Resolved value.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
}

/// Container health check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MicroserviceHealthCheck {
    /// Health check command.
    pub test: Vec<String>,
    /// Interval between checks (seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    /// Check timeout (seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    /// Failures before unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<i64>,
    /// Grace period after start (seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_period: Option<i64>,
}

/// Container settings of a microservice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MicroserviceContainer {
    /// Command override.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    /// Volume mappings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<MicroserviceVolumeMapping>,
    /// Environment variables.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<MicroserviceEnvironment>,
    /// Extra hosts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_hosts: Vec<MicroserviceExtraHost>,
    /// Port mappings.
    pub ports: Vec<MicroservicePortMapping>,
    /// Run with host root access.
    pub root_host_access: bool,
    /// PID namespace mode.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pid_mode: String,
    /// IPC namespace mode.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ipc_mode: String,
    /// OCI runtime.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub runtime: String,
    /// Target platform.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub platform: String,
    /// User the container runs as.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub run_as_user: String,
    /// CDI devices.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cdi_devices: Vec<String>,
    /// Added capabilities.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cap_add: Vec<String>,
    /// Dropped capabilities.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cap_drop: Vec<String>,
    /// Container annotations.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: NestedMap,
    /// CPU set.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cpu_set_cpus: String,
    /// Memory limit (bytes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<i64>,
    /// Health check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<MicroserviceHealthCheck>,
}

/// Message routing tags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MsRoutes {
    /// Published tags.
    pub pub_tags: Vec<String>,
    /// Subscribed tags.
    pub sub_tags: Vec<String>,
}

/// Desired microservice, the spec of a `Microservice` manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Microservice {
    /// Identifier; empty for new microservices.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    /// Microservice name.
    pub name: String,
    /// Target agent.
    pub agent: MicroserviceAgent,
    /// Images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<MicroserviceImages>,
    /// Container settings.
    pub container: MicroserviceContainer,
    /// Message routing tags.
    pub ms_routes: MsRoutes,
    /// Scheduling priority.
    pub schedule: i64,
    /// Application configuration handed to the container.
    pub config: NestedMap,
    /// Owning application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    /// Force a rebuild on update.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub rebuild: bool,
}

/// Route between two microservices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Route {
    /// Route name.
    pub name: String,
    /// Source microservice.
    pub from: String,
    /// Destination microservice.
    pub to: String,
}

/// Application spec: microservices and routes deployed together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Application {
    /// Application name.
    pub name: String,
    /// Member microservices.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub microservices: Vec<Microservice>,
    /// Member routes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
}
