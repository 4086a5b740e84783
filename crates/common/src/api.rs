//! Controller REST DTOs used by the SDK resource client.
//!
//! The controller speaks camelCase JSON. Info payloads default every field so a
//! partially populated response still decodes; request payloads omit optional
//! fields so `PATCH` bodies only carry what the caller wants changed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

// ---------------------------------------------------------------------------
// Users and controller status
// ---------------------------------------------------------------------------

/// Credentials exchanged for an access/refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
    /// One-time password; the controller expects the field even when empty.
    #[serde(default)]
    pub totp: String,
}

/// Refresh token exchanged for a new token pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    /// Refresh token issued by a previous login.
    pub refresh_token: String,
}

/// Token pair returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token used to sign requests.
    pub access_token: String,
    /// Token used to obtain a new access token.
    #[serde(default)]
    pub refresh_token: String,
}

/// Component versions reported by the controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ControllerVersions {
    /// Controller version.
    pub controller: String,
    /// ECN viewer version.
    pub ecn_viewer: String,
}

/// Response of `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ControllerStatus {
    /// Overall status string (`online` when healthy).
    pub status: String,
    /// Seconds since controller start.
    #[serde(rename = "uptimeSec")]
    pub uptime_seconds: f64,
    /// Component versions.
    pub versions: ControllerVersions,
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// Secret stored by the controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct SecretInfo {
    /// Numeric identifier.
    pub id: i64,
    /// Secret name (unique).
    pub name: String,
    /// Secret type (`Opaque` or `tls`).
    #[serde(rename = "type")]
    pub secret_type: String,
    /// Key/value payload.
    pub data: HashMap<String, String>,
    /// Creation timestamp as reported by the controller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp as reported by the controller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Request body for `POST /secrets`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretCreateRequest {
    /// Secret name.
    pub name: String,
    /// Secret type.
    #[serde(rename = "type")]
    pub secret_type: String,
    /// Key/value payload.
    pub data: HashMap<String, String>,
}

/// Request body for `PATCH /secrets/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SecretUpdateRequest {
    /// New name (None means unchanged).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Replacement payload.
    pub data: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// Service exposed through the controller's router network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceInfo {
    /// Service tags.
    pub tags: Vec<String>,
    /// Service name.
    pub name: String,
    /// Backend type (`microservice`, `agent`, `k8s`, `external`).
    #[serde(rename = "type")]
    pub service_type: String,
    /// Backend resource reference.
    pub resource: String,
    /// Port on the backend.
    pub target_port: i64,
    /// Port the service listens on.
    pub service_port: i64,
    /// Kubernetes service type when applicable.
    pub k8s_type: String,
    /// Bridge port allocated by the controller.
    pub bridge_port: i64,
    /// Default bridge router.
    pub default_bridge: String,
    /// Resolved service endpoint.
    pub service_endpoint: String,
    /// Provisioning status.
    pub provisioning_status: String,
    /// Provisioning error message, if any.
    pub provisioning_error: String,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Request body for `POST /services`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCreateRequest {
    /// Service name.
    pub name: String,
    /// Backend type.
    #[serde(rename = "type")]
    pub service_type: String,
    /// Backend resource reference.
    pub resource: String,
    /// Port on the backend.
    pub target_port: i64,
    /// Port the service listens on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_port: Option<i64>,
    /// Kubernetes service type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k8s_type: Option<String>,
    /// Default bridge router.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_bridge: Option<String>,
    /// Service tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Request body for `PATCH /services/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUpdateRequest {
    /// New name (None means unchanged).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New backend type.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    /// New backend resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// New backend port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<i64>,
    /// New listening port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_port: Option<i64>,
    /// New Kubernetes service type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k8s_type: Option<String>,
    /// New default bridge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_bridge: Option<String>,
    /// Replacement tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Config maps
// ---------------------------------------------------------------------------

/// Config map stored by the controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigMapInfo {
    /// Numeric identifier.
    pub id: i64,
    /// Config map name.
    pub name: String,
    /// Key/value payload.
    pub data: HashMap<String, String>,
    /// Whether the config map rejects updates.
    #[serde(skip_serializing_if = "is_false")]
    pub immutable: bool,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Request body for `POST /configmaps`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ConfigMapCreateRequest {
    /// Config map name.
    pub name: String,
    /// Key/value payload.
    pub data: HashMap<String, String>,
    /// Whether the config map rejects updates.
    #[serde(default, skip_serializing_if = "is_false")]
    pub immutable: bool,
}

/// Request body for `PATCH /configmaps/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ConfigMapUpdateRequest {
    /// New name (None means unchanged).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Replacement payload (None means unchanged).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
    /// New immutability flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immutable: Option<bool>,
}

// ---------------------------------------------------------------------------
// Volume mounts
// ---------------------------------------------------------------------------

/// Volume mount backed by a secret or a config map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumeMountInfo {
    /// Volume mount name.
    pub name: String,
    /// Controller-assigned identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Backing config map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_map_name: Option<String>,
    /// Backing secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
    /// Content version.
    pub version: i64,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Request body for `POST /volumeMounts` and `PATCH /volumeMounts/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMountRequest {
    /// Volume mount name (optional on update).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Backing config map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_name: Option<String>,
    /// Backing secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

/// Body for linking/unlinking a volume mount to agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMountLinkRequest {
    /// Volume mount name.
    pub name: String,
    /// Agents to link or unlink.
    #[serde(rename = "fogUuids")]
    pub fog_uuids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Certificates
// ---------------------------------------------------------------------------

/// CA reference used when issuing a certificate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CertificateCreateCa {
    /// CA type (`self-signed`, `k8s-secret`, `direct`).
    #[serde(rename = "type")]
    pub ca_type: String,
    /// Secret holding the CA, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

/// Request body for `POST /certificates`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CertificateCreateRequest {
    /// Certificate name.
    pub name: String,
    /// Certificate subject.
    pub subject: String,
    /// Comma-separated host list.
    pub hosts: String,
    /// Validity in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
    /// Issuing CA.
    pub ca: CertificateCreateCa,
}

/// Request body for `POST /certificates/ca`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CaCreateRequest {
    /// CA name.
    pub name: String,
    /// CA subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Validity in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
    /// CA type.
    #[serde(rename = "type")]
    pub ca_type: String,
    /// Secret holding the CA material, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

/// PEM material attached to certificates and CAs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CertificateData {
    /// PEM-encoded certificate.
    pub certificate: String,
    /// PEM-encoded private key.
    pub private_key: String,
}

/// Element of a certificate chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CertificateChainItem {
    /// Certificate name.
    pub name: String,
    /// Certificate subject.
    pub subject: String,
}

/// Certificate stored by the controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CertificateInfo {
    /// Certificate name.
    pub name: String,
    /// Certificate subject.
    pub subject: String,
    /// Comma-separated host list.
    pub hosts: String,
    /// Whether the certificate is a CA.
    #[serde(rename = "isCA")]
    pub is_ca: bool,
    /// Start of validity window.
    pub valid_from: Option<DateTime<Utc>>,
    /// End of validity window.
    pub valid_to: Option<DateTime<Utc>>,
    /// Serial number.
    pub serial_number: String,
    /// Issuing CA name.
    pub ca_name: Option<String>,
    /// Issuer chain.
    pub certificate_chain: Vec<CertificateChainItem>,
    /// Days until expiry.
    pub days_remaining: i64,
    /// Whether the certificate has expired.
    pub is_expired: bool,
    /// PEM material.
    pub data: CertificateData,
}

/// Certificate authority stored by the controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CaInfo {
    /// CA name.
    pub name: String,
    /// CA subject.
    pub subject: String,
    /// Always true for CAs.
    #[serde(rename = "isCA")]
    pub is_ca: bool,
    /// Start of validity window.
    pub valid_from: Option<DateTime<Utc>>,
    /// End of validity window.
    pub valid_to: Option<DateTime<Utc>>,
    /// Serial number.
    pub serial_number: String,
    /// PEM material.
    pub data: CertificateData,
}

// ---------------------------------------------------------------------------
// Microservices
// ---------------------------------------------------------------------------

/// Port mapping reported for a microservice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MicroservicePortMappingInfo {
    /// Container port.
    pub internal: i64,
    /// Host port.
    pub external: i64,
    /// Protocol (`tcp` when omitted).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub protocol: String,
}

/// Volume mapping reported for a microservice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MicroserviceVolumeMappingInfo {
    /// Source on the host (or volume mount name).
    pub host_destination: String,
    /// Target inside the container.
    pub container_destination: String,
    /// Access mode (`rw`, `ro`).
    pub access_mode: String,
    /// Mapping type (`bind`, `volume`, `volumeMount`).
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub mapping_type: String,
}

/// Environment variable reported for a microservice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MicroserviceEnvironmentInfo {
    /// Variable name.
    pub key: String,
    /// Literal value.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// Secret reference (`secret/key`).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value_from_secret: String,
    /// Config map reference (`configmap/key`).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value_from_config_map: String,
}

/// Runtime status reported for a microservice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MicroserviceStatusInfo {
    /// Container status (`RUNNING`, `PULLING`, ...).
    pub status: String,
    /// Start time (ms since epoch).
    pub start_time: i64,
    /// Uptime (ms).
    pub operating_duration: i64,
    /// Memory usage in bytes.
    pub memory_usage: f64,
    /// CPU usage percentage.
    pub cpu_usage: f64,
    /// Container identifier on the agent.
    pub container_id: String,
    /// Image pull progress percentage.
    pub percentage: f64,
    /// Container IP address.
    pub ip_address: String,
    /// Last runtime error.
    pub error_message: String,
    /// Health check status.
    pub health_status: String,
}

/// Microservice as stored by the controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MicroserviceInfo {
    /// Controller-assigned identifier.
    pub uuid: String,
    /// Microservice name (unique inside its application).
    pub name: String,
    /// Serialized microservice configuration.
    pub config: String,
    /// Owning application name.
    pub application: String,
    /// Owning application identifier.
    #[serde(rename = "applicationID")]
    pub application_id: i64,
    /// Agent the microservice is scheduled on.
    #[serde(rename = "iofogUuid")]
    pub agent_uuid: String,
    /// Catalog item the image comes from.
    pub catalog_item_id: i64,
    /// Registry the image is pulled from.
    pub registry_id: i64,
    /// Whether the container runs with host root access.
    pub root_host_access: bool,
    /// Scheduling priority.
    pub schedule: i64,
    /// Log size limit (MB).
    pub log_size: i64,
    /// Port mappings.
    pub ports: Vec<MicroservicePortMappingInfo>,
    /// Volume mappings.
    #[serde(rename = "volumeMappings")]
    pub volumes: Vec<MicroserviceVolumeMappingInfo>,
    /// Command override.
    #[serde(rename = "cmd")]
    pub commands: Vec<String>,
    /// Environment variables.
    pub env: Vec<MicroserviceEnvironmentInfo>,
    /// Runtime status.
    pub status: MicroserviceStatusInfo,
    /// Published message tags.
    pub pub_tags: Vec<String>,
    /// Subscribed message tags.
    pub sub_tags: Vec<String>,
}

/// Response of microservice create endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MicroserviceCreateResponse {
    /// Identifier of the created microservice.
    pub uuid: String,
}

/// Body for attaching or detaching an exec session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecSessionRequest {
    /// Microservice or agent identifier.
    pub uuid: String,
    /// Debug image for agent exec sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

// ---------------------------------------------------------------------------
// Agents, applications, routes
// ---------------------------------------------------------------------------

/// Edge agent (fog node) registered with the controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentInfo {
    /// Agent identifier.
    pub uuid: String,
    /// Agent name.
    pub name: String,
    /// Host the agent runs on.
    pub host: String,
    /// Free-form location.
    pub location: String,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Description.
    pub description: String,
    /// Daemon status (`RUNNING`, `UNKNOWN`, ...).
    pub daemon_status: String,
    /// Last activity (ms since epoch).
    pub last_active: i64,
    /// Agent version.
    pub version: String,
    /// Fog type (0 auto, 1 x86, 2 arm).
    #[serde(rename = "fogTypeId")]
    pub fog_type: i64,
    /// Router mode (`edge`, `interior`, `none`).
    pub router_mode: String,
    /// Whether the agent hosts system microservices.
    pub is_system: bool,
    /// Volume mounts linked to the agent.
    pub volume_mounts: Vec<VolumeMountInfo>,
}

/// Route between two microservices of an application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RouteInfo {
    /// Route name.
    pub name: String,
    /// Owning application.
    pub application: String,
    /// Source microservice.
    pub from: String,
    /// Destination microservice.
    pub to: String,
}

/// Application (group of microservices and routes).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ApplicationInfo {
    /// Application name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Whether the application is running.
    pub is_activated: bool,
    /// Whether the application is owned by the system.
    pub is_system: bool,
    /// Owner.
    pub user_id: i64,
    /// Numeric identifier.
    pub id: i64,
    /// Member microservices.
    pub microservices: Vec<MicroserviceInfo>,
    /// Member routes.
    pub routes: Vec<RouteInfo>,
}

/// Request body for `PATCH /application/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPatchRequest {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Start or stop the application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_activated: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_requests_omit_unset_fields() {
        let update = ServiceUpdateRequest {
            target_port: Some(8080),
            ..ServiceUpdateRequest::default()
        };
        let value = serde_json::to_value(&update).expect("serialize");
        assert_eq!(value, json!({"targetPort": 8080}));

        let cm = ConfigMapUpdateRequest::default();
        assert_eq!(serde_json::to_value(&cm).expect("serialize"), json!({}));
    }

    #[test]
    fn microservice_info_uses_controller_field_names() {
        let info: MicroserviceInfo = serde_json::from_value(json!({
            "uuid": "u-1",
            "name": "sensor",
            "iofogUuid": "agent-1",
            "applicationID": 7,
            "volumeMappings": [{"hostDestination": "/a", "containerDestination": "/b", "accessMode": "rw"}],
            "cmd": ["run"],
        }))
        .expect("deserialize microservice");
        assert_eq!(info.agent_uuid, "agent-1");
        assert_eq!(info.application_id, 7);
        assert_eq!(info.volumes.len(), 1);
        assert_eq!(info.commands, vec!["run".to_string()]);
        assert!(info.ports.is_empty());
    }

    #[test]
    fn certificate_info_tolerates_null_ca_and_missing_dates() {
        let cert: CertificateInfo = serde_json::from_value(json!({
            "name": "edge",
            "isCA": false,
            "caName": null,
            "validTo": "2030-01-01T00:00:00Z"
        }))
        .expect("deserialize certificate");
        assert_eq!(cert.ca_name, None);
        assert!(cert.valid_from.is_none());
        assert!(cert.valid_to.is_some());
    }

    #[test]
    fn login_request_always_sends_totp() {
        let req = LoginRequest {
            email: "a@b.c".into(),
            password: "pw".into(),
            totp: String::new(),
        };
        let value = serde_json::to_value(&req).expect("serialize");
        assert_eq!(value, json!({"email": "a@b.c", "password": "pw", "totp": ""}));
    }
}
