//! Typed collections over the controller's named resources, plus the
//! resource-specific endpoints that do not fit the plain CRUD shape.

use std::marker::PhantomData;

use common::api::{
    AgentInfo, ApplicationInfo, ApplicationPatchRequest, CaCreateRequest, CaInfo,
    CertificateCreateRequest, CertificateInfo, ConfigMapCreateRequest, ConfigMapInfo,
    ConfigMapUpdateRequest, ControllerStatus, ExecSessionRequest, MicroserviceInfo, RouteInfo,
    SecretCreateRequest, SecretInfo, SecretUpdateRequest, ServiceCreateRequest, ServiceInfo,
    ServiceUpdateRequest, VolumeMountInfo, VolumeMountLinkRequest, VolumeMountRequest,
};
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::ResourceClient;
use crate::error::SdkError;
use crate::list::ListResponse;

/// A controller resource addressed by name under a fixed collection path.
pub trait ControllerResource: DeserializeOwned + Send + 'static {
    /// Body accepted by `POST <PATH>`.
    type Create: Serialize + Sync + ?Sized;
    /// Body accepted by `PATCH <PATH>/<name>`.
    type Update: Serialize + Sync + ?Sized;

    /// Collection path, e.g. `/secrets`.
    const PATH: &'static str;
    /// Key wrapping the list in object-shaped list responses.
    const LIST_FIELD: &'static str;
    /// Multipart part name for `.../yaml` uploads; `None` when unsupported.
    const MANIFEST_FIELD: Option<&'static str>;
}

impl ControllerResource for SecretInfo {
    type Create = SecretCreateRequest;
    type Update = SecretUpdateRequest;
    const PATH: &'static str = "/secrets";
    const LIST_FIELD: &'static str = "secrets";
    const MANIFEST_FIELD: Option<&'static str> = Some("secret");
}

impl ControllerResource for ServiceInfo {
    type Create = ServiceCreateRequest;
    type Update = ServiceUpdateRequest;
    const PATH: &'static str = "/services";
    const LIST_FIELD: &'static str = "services";
    const MANIFEST_FIELD: Option<&'static str> = Some("service");
}

impl ControllerResource for ConfigMapInfo {
    type Create = ConfigMapCreateRequest;
    type Update = ConfigMapUpdateRequest;
    const PATH: &'static str = "/configmaps";
    const LIST_FIELD: &'static str = "configMaps";
    const MANIFEST_FIELD: Option<&'static str> = Some("configMap");
}

impl ControllerResource for VolumeMountInfo {
    type Create = VolumeMountRequest;
    type Update = VolumeMountRequest;
    const PATH: &'static str = "/volumeMounts";
    const LIST_FIELD: &'static str = "volumeMounts";
    const MANIFEST_FIELD: Option<&'static str> = Some("volumeMount");
}

impl ControllerResource for CertificateInfo {
    type Create = CertificateCreateRequest;
    type Update = Value;
    const PATH: &'static str = "/certificates";
    const LIST_FIELD: &'static str = "certificates";
    const MANIFEST_FIELD: Option<&'static str> = Some("certificate");
}

impl ControllerResource for CaInfo {
    type Create = CaCreateRequest;
    type Update = Value;
    const PATH: &'static str = "/certificates/ca";
    const LIST_FIELD: &'static str = "cas";
    const MANIFEST_FIELD: Option<&'static str> = None;
}

impl ControllerResource for AgentInfo {
    type Create = Value;
    type Update = Value;
    const PATH: &'static str = "/iofog";
    const LIST_FIELD: &'static str = "fogs";
    const MANIFEST_FIELD: Option<&'static str> = None;
}

impl ControllerResource for ApplicationInfo {
    type Create = Value;
    type Update = ApplicationPatchRequest;
    const PATH: &'static str = "/application";
    const LIST_FIELD: &'static str = "applications";
    const MANIFEST_FIELD: Option<&'static str> = Some("application");
}

impl ControllerResource for RouteInfo {
    type Create = RouteInfo;
    type Update = RouteInfo;
    const PATH: &'static str = "/routes";
    const LIST_FIELD: &'static str = "routes";
    const MANIFEST_FIELD: Option<&'static str> = None;
}

/// CRUD view of one resource type. Obtain through [`ResourceClient::resource`].
pub struct Collection<'a, T> {
    client: &'a ResourceClient,
    _resource: PhantomData<fn() -> T>,
}

impl<T: ControllerResource> Collection<'_, T> {
    fn item_path(name: &str) -> String {
        format!("{}/{}", T::PATH, name)
    }

    fn manifest_field() -> Result<&'static str, SdkError> {
        T::MANIFEST_FIELD.ok_or_else(|| {
            SdkError::Input(format!("{} does not accept manifest uploads", T::PATH))
        })
    }

    pub async fn create(&self, body: &T::Create) -> Result<(), SdkError> {
        self.client.create(T::PATH, body).await
    }

    pub async fn create_from_yaml(&self, manifest: impl Into<Vec<u8>>) -> Result<(), SdkError> {
        let field = Self::manifest_field()?;
        let path = format!("{}/yaml", T::PATH);
        self.client.create_from_manifest(&path, field, manifest).await
    }

    pub async fn update(&self, name: &str, body: &T::Update) -> Result<(), SdkError> {
        self.client.update(&Self::item_path(name), body).await
    }

    pub async fn update_from_yaml(
        &self,
        name: &str,
        manifest: impl Into<Vec<u8>>,
    ) -> Result<(), SdkError> {
        let field = Self::manifest_field()?;
        let path = format!("{}/yaml/{}", T::PATH, name);
        self.client.update_from_manifest(&path, field, manifest).await
    }

    pub async fn get(&self, name: &str) -> Result<T, SdkError> {
        self.client.get(&Self::item_path(name)).await
    }

    pub async fn list(&self) -> Result<ListResponse<T>, SdkError> {
        self.client.list(T::PATH, T::LIST_FIELD).await
    }

    pub async fn delete(&self, name: &str) -> Result<StatusCode, SdkError> {
        self.client.delete(&Self::item_path(name)).await
    }
}

const MICROSERVICES_FIELD: &str = "microservices";
const MICROSERVICE_MANIFEST_FIELD: &str = "microservice";

impl ResourceClient {
    pub fn resource<T: ControllerResource>(&self) -> Collection<'_, T> {
        Collection {
            client: self,
            _resource: PhantomData,
        }
    }

    pub fn secrets(&self) -> Collection<'_, SecretInfo> {
        self.resource()
    }

    pub fn services(&self) -> Collection<'_, ServiceInfo> {
        self.resource()
    }

    pub fn config_maps(&self) -> Collection<'_, ConfigMapInfo> {
        self.resource()
    }

    pub fn volume_mounts(&self) -> Collection<'_, VolumeMountInfo> {
        self.resource()
    }

    pub fn certificates(&self) -> Collection<'_, CertificateInfo> {
        self.resource()
    }

    pub fn certificate_authorities(&self) -> Collection<'_, CaInfo> {
        self.resource()
    }

    pub fn agents(&self) -> Collection<'_, AgentInfo> {
        self.resource()
    }

    pub fn applications(&self) -> Collection<'_, ApplicationInfo> {
        self.resource()
    }

    pub fn routes(&self) -> Collection<'_, RouteInfo> {
        self.resource()
    }

    // volume mounts

    pub async fn link_volume_mount(&self, request: &VolumeMountLinkRequest) -> Result<(), SdkError> {
        let path = format!("/volumeMounts/{}/link", request.name);
        self.create(&path, request).await
    }

    pub async fn unlink_volume_mount(
        &self,
        request: &VolumeMountLinkRequest,
    ) -> Result<StatusCode, SdkError> {
        let path = format!("/volumeMounts/{}/link", request.name);
        self.delete_with_body(&path, request).await
    }

    // certificates

    pub async fn renew_certificate(&self, name: &str) -> Result<(), SdkError> {
        self.post_empty(&format!("/certificates/{name}/renew")).await
    }

    pub async fn list_expiring_certificates(
        &self,
    ) -> Result<ListResponse<CertificateInfo>, SdkError> {
        self.list("/certificates/expiring", CertificateInfo::LIST_FIELD)
            .await
    }

    // microservices

    pub async fn list_microservices(
        &self,
        application: &str,
    ) -> Result<ListResponse<MicroserviceInfo>, SdkError> {
        self.list_with_query(
            "/microservices",
            &[("application", application)],
            MICROSERVICES_FIELD,
        )
        .await
    }

    pub async fn list_system_microservices(
        &self,
        application: &str,
    ) -> Result<ListResponse<MicroserviceInfo>, SdkError> {
        self.list_with_query(
            "/microservices/system",
            &[("application", application)],
            MICROSERVICES_FIELD,
        )
        .await
    }

    pub async fn get_microservice(&self, uuid: &str) -> Result<MicroserviceInfo, SdkError> {
        self.get(&format!("/microservices/{uuid}")).await
    }

    pub async fn delete_microservice(&self, uuid: &str) -> Result<StatusCode, SdkError> {
        self.delete(&format!("/microservices/{uuid}")).await
    }

    pub async fn create_microservice_from_yaml(
        &self,
        manifest: impl Into<Vec<u8>>,
    ) -> Result<(), SdkError> {
        self.create_from_manifest("/microservices/yaml", MICROSERVICE_MANIFEST_FIELD, manifest)
            .await
    }

    pub async fn update_microservice_from_yaml(
        &self,
        uuid: &str,
        manifest: impl Into<Vec<u8>>,
    ) -> Result<(), SdkError> {
        let path = format!("/microservices/yaml/{uuid}");
        self.update_from_manifest(&path, MICROSERVICE_MANIFEST_FIELD, manifest)
            .await
    }

    pub async fn update_system_microservice_from_yaml(
        &self,
        uuid: &str,
        manifest: impl Into<Vec<u8>>,
    ) -> Result<(), SdkError> {
        let path = format!("/microservices/system/yaml/{uuid}");
        self.update_from_manifest(&path, MICROSERVICE_MANIFEST_FIELD, manifest)
            .await
    }

    // exec sessions

    pub async fn attach_exec_microservice(&self, uuid: &str) -> Result<(), SdkError> {
        let path = format!("/microservices/{uuid}/exec");
        self.create(&path, &exec_request(uuid, None)).await
    }

    pub async fn detach_exec_microservice(&self, uuid: &str) -> Result<StatusCode, SdkError> {
        let path = format!("/microservices/{uuid}/exec");
        self.delete_with_body(&path, &exec_request(uuid, None)).await
    }

    pub async fn attach_exec_system_microservice(&self, uuid: &str) -> Result<(), SdkError> {
        let path = format!("/microservices/system/{uuid}/exec");
        self.create(&path, &exec_request(uuid, None)).await
    }

    pub async fn detach_exec_system_microservice(
        &self,
        uuid: &str,
    ) -> Result<StatusCode, SdkError> {
        let path = format!("/microservices/system/{uuid}/exec");
        self.delete_with_body(&path, &exec_request(uuid, None)).await
    }

    /// `image` selects the debug container image; the controller default is used when `None`.
    pub async fn attach_exec_agent(&self, uuid: &str, image: Option<&str>) -> Result<(), SdkError> {
        let path = format!("/iofog/{uuid}/exec");
        self.create(&path, &exec_request(uuid, image)).await
    }

    pub async fn detach_exec_agent(&self, uuid: &str) -> Result<StatusCode, SdkError> {
        let path = format!("/iofog/{uuid}/exec");
        self.delete_with_body(&path, &exec_request(uuid, None)).await
    }

    // controller

    pub async fn status(&self) -> Result<ControllerStatus, SdkError> {
        self.get("/status").await
    }
}

fn exec_request(uuid: &str, image: Option<&str>) -> ExecSessionRequest {
    ExecSessionRequest {
        uuid: uuid.to_string(),
        image: image.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetrySettings;
    use crate::session::Session;
    use httpmock::Method::{DELETE, GET, PATCH, POST};
    use httpmock::MockServer;
    use serde_json::json;

    fn client_for(server: &MockServer) -> ResourceClient {
        ResourceClient::new(
            Session::with_token(server.url(""), "t"),
            RetrySettings::default(),
        )
    }

    #[tokio::test]
    async fn config_maps_list_uses_camel_case_field() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/configmaps");
            then.status(200)
                .json_body(json!({"configMaps": [{"name": "cm-1", "data": {"k": "v"}}]}));
        });

        let list = client_for(&server)
            .config_maps()
            .list()
            .await
            .expect("list");
        assert_eq!(list.len(), 1);
        assert_eq!(list.items()[0].data.get("k").map(String::as_str), Some("v"));
    }

    #[tokio::test]
    async fn agents_list_accepts_bare_array() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/iofog");
            then.status(200)
                .json_body(json!([{"uuid": "a-1", "name": "edge-1"}, {"uuid": "a-2", "name": "edge-2"}]));
        });

        let agents = client_for(&server).agents().list().await.expect("agents");
        let names: Vec<_> = agents.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["edge-1", "edge-2"]);
    }

    #[tokio::test]
    async fn collection_paths_address_items_by_name() {
        let server = MockServer::start();
        let get = server.mock(|when, then| {
            when.method(GET).path("/certificates/ca/root");
            then.status(200).json_body(json!({"name": "root", "isCA": true}));
        });
        let patch = server.mock(|when, then| {
            when.method(PATCH)
                .path("/services/web")
                .json_body(json!({"targetPort": 8080}));
            then.status(204);
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/secrets/s1");
            then.status(204);
        });

        let client = client_for(&server);
        let ca = client
            .certificate_authorities()
            .get("root")
            .await
            .expect("ca");
        assert!(ca.is_ca);
        client
            .services()
            .update(
                "web",
                &ServiceUpdateRequest {
                    target_port: Some(8080),
                    ..ServiceUpdateRequest::default()
                },
            )
            .await
            .expect("update");
        let status = client.secrets().delete("s1").await.expect("delete");
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(get.calls(), 1);
        assert_eq!(patch.calls(), 1);
        assert_eq!(delete.calls(), 1);
    }

    #[tokio::test]
    async fn create_from_yaml_posts_to_yaml_endpoint() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/volumeMounts/yaml")
                .body_matches(r#"name="volumeMount""#)
                .body_matches(r#"filename="volumeMount\.yaml""#);
            then.status(201);
        });

        client_for(&server)
            .volume_mounts()
            .create_from_yaml("kind: VolumeMount\n")
            .await
            .expect("create from yaml");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn manifest_uploads_rejected_for_resources_without_field() {
        let server = MockServer::start();
        let err = client_for(&server)
            .routes()
            .create_from_yaml("kind: Route\n")
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Input(_)));
    }

    #[tokio::test]
    async fn volume_mount_unlink_sends_body_with_delete() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/volumeMounts/vm-1/link")
                .json_body(json!({"name": "vm-1", "fogUuids": ["a-1"]}));
            then.status(200);
        });

        let request = VolumeMountLinkRequest {
            name: "vm-1".to_string(),
            fog_uuids: vec!["a-1".to_string()],
        };
        client_for(&server)
            .unlink_volume_mount(&request)
            .await
            .expect("unlink");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn agent_exec_attach_carries_image() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/iofog/a-1/exec")
                .json_body(json!({"uuid": "a-1", "image": "busybox"}));
            then.status(200);
        });

        client_for(&server)
            .attach_exec_agent("a-1", Some("busybox"))
            .await
            .expect("attach");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn renew_and_status_hit_expected_paths() {
        let server = MockServer::start();
        let renew = server.mock(|when, then| {
            when.method(POST).path("/certificates/edge/renew");
            then.status(200);
        });
        let _status = server.mock(|when, then| {
            when.method(GET).path("/status");
            then.status(200).json_body(json!({
                "status": "online",
                "uptimeSec": 12.5,
                "versions": {"controller": "3.4.0", "ecnViewer": "3.1.0"}
            }));
        });

        let client = client_for(&server);
        client.renew_certificate("edge").await.expect("renew");
        let status = client.status().await.expect("status");
        assert_eq!(renew.calls(), 1);
        assert_eq!(status.status, "online");
        assert_eq!(status.versions.controller, "3.4.0");
    }
}
