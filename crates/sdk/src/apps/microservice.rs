//! Create-or-update of a single microservice.
//!
//! The executor first resolves whether `<app>/<name>` already exists on the
//! controller, looking in the regular application scope and falling back to
//! the system application scope, then submits a `Microservice` manifest to
//! the matching create or update endpoint.

use async_trait::async_trait;
use common::api::MicroserviceInfo;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::apps::manifest::microservice_manifest;
use crate::client::ResourceClient;
use crate::config::SdkConfig;
use crate::error::SdkError;
use crate::telemetry;

/// Controller message for an application that is not in the regular scope.
/// Seeing it triggers the system application lookup.
pub const APPLICATION_NOT_FOUND_MESSAGE: &str = "Invalid application id";

/// Splits `app/name` (or a bare `name`, which yields an empty application).
pub fn parse_fq_name(fq_name: &str) -> Result<(String, String), SdkError> {
    if fq_name.is_empty() {
        return Err(SdkError::Input(format!(
            "invalid microservice name '{fq_name}'"
        )));
    }
    let parts: Vec<&str> = fq_name.split('/').collect();
    match parts.as_slice() {
        [name] => Ok((String::new(), (*name).to_string())),
        [app, name] => Ok(((*app).to_string(), (*name).to_string())),
        _ => Err(SdkError::Input(format!(
            "invalid microservice name '{fq_name}'"
        ))),
    }
}

/// Controller calls the executor depends on.
#[async_trait]
pub trait MicroserviceApi: Send + Sync {
    async fn authenticate(&self) -> Result<(), SdkError>;

    async fn list_microservices(
        &self,
        application: &str,
    ) -> Result<Vec<MicroserviceInfo>, SdkError>;

    async fn list_system_microservices(
        &self,
        application: &str,
    ) -> Result<Vec<MicroserviceInfo>, SdkError>;

    async fn create_from_yaml(&self, manifest: Vec<u8>) -> Result<(), SdkError>;

    async fn update_from_yaml(&self, uuid: &str, manifest: Vec<u8>) -> Result<(), SdkError>;

    async fn update_system_from_yaml(&self, uuid: &str, manifest: Vec<u8>)
    -> Result<(), SdkError>;
}

#[async_trait]
impl MicroserviceApi for ResourceClient {
    async fn authenticate(&self) -> Result<(), SdkError> {
        self.session().authenticate().await.map(|_| ())
    }

    async fn list_microservices(
        &self,
        application: &str,
    ) -> Result<Vec<MicroserviceInfo>, SdkError> {
        ResourceClient::list_microservices(self, application)
            .await
            .map(|list| list.into_items())
    }

    async fn list_system_microservices(
        &self,
        application: &str,
    ) -> Result<Vec<MicroserviceInfo>, SdkError> {
        ResourceClient::list_system_microservices(self, application)
            .await
            .map(|list| list.into_items())
    }

    async fn create_from_yaml(&self, manifest: Vec<u8>) -> Result<(), SdkError> {
        self.create_microservice_from_yaml(manifest).await
    }

    async fn update_from_yaml(&self, uuid: &str, manifest: Vec<u8>) -> Result<(), SdkError> {
        self.update_microservice_from_yaml(uuid, manifest).await
    }

    async fn update_system_from_yaml(
        &self,
        uuid: &str,
        manifest: Vec<u8>,
    ) -> Result<(), SdkError> {
        self.update_system_microservice_from_yaml(uuid, manifest)
            .await
    }
}

/// What resolution found on the controller. `uuid == None` means "create".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub uuid: Option<String>,
    pub system: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Unresolved,
    Resolving,
    Creating,
    Updating,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated { uuid: String, system: bool },
}

impl ApplyOutcome {
    fn label(&self) -> &'static str {
        match self {
            ApplyOutcome::Created => "created",
            ApplyOutcome::Updated { .. } => "updated",
        }
    }
}

/// Desired microservice keyed by its fully-qualified `app/name`.
#[derive(Debug, Clone)]
pub struct DesiredMicroservice<S> {
    pub fq_name: String,
    pub spec: S,
}

impl<S> DesiredMicroservice<S> {
    pub fn new(fq_name: impl Into<String>, spec: S) -> Self {
        Self {
            fq_name: fq_name.into(),
            spec,
        }
    }
}

pub struct MicroserviceExecutor<A, S> {
    api: A,
    spec: S,
    application: String,
    name: String,
    identity: ResolvedIdentity,
    state: ExecutorState,
}

impl<A, S> MicroserviceExecutor<A, S>
where
    A: MicroserviceApi,
    S: Serialize + Send + Sync,
{
    pub fn new(api: A, fq_name: &str, spec: S) -> Result<Self, SdkError> {
        let (application, name) = parse_fq_name(fq_name)?;
        Ok(Self {
            api,
            spec,
            application,
            name,
            identity: ResolvedIdentity::default(),
            state: ExecutorState::Unresolved,
        })
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn identity(&self) -> &ResolvedIdentity {
        &self.identity
    }

    /// Looks the microservice up and moves to `Creating` or `Updating`.
    pub async fn resolve(&mut self) -> Result<&ResolvedIdentity, SdkError> {
        self.state = ExecutorState::Resolving;
        self.identity = ResolvedIdentity::default();
        match self.lookup().await {
            Ok(identity) => {
                self.state = if identity.uuid.is_some() {
                    ExecutorState::Updating
                } else {
                    ExecutorState::Creating
                };
                self.identity = identity;
                Ok(&self.identity)
            }
            Err(err) => {
                self.state = ExecutorState::Failed;
                Err(err)
            }
        }
    }

    /// Submits the manifest chosen by [`MicroserviceExecutor::resolve`].
    pub async fn apply(&mut self) -> Result<ApplyOutcome, SdkError> {
        let outcome = match self.state {
            ExecutorState::Creating => self.create().await,
            ExecutorState::Updating => self.update().await,
            other => Err(SdkError::Input(format!(
                "microservice {}/{} cannot be applied from state {other:?}",
                self.application, self.name
            ))),
        };
        self.state = if outcome.is_ok() {
            ExecutorState::Done
        } else {
            ExecutorState::Failed
        };
        outcome
    }

    /// `resolve` then `apply`. Nothing is rolled back on failure.
    pub async fn execute(&mut self) -> Result<ApplyOutcome, SdkError> {
        let resolved = self.resolve().await.map(|_| ());
        let result = match resolved {
            Ok(()) => self.apply().await,
            Err(err) => Err(err),
        };
        match &result {
            Ok(outcome) => telemetry::record_reconcile(outcome.label()),
            Err(err) => {
                warn!(
                    application = %self.application,
                    microservice = %self.name,
                    error = %err,
                    "microservice reconcile failed"
                );
                telemetry::record_reconcile("error");
            }
        }
        result
    }

    async fn lookup(&self) -> Result<ResolvedIdentity, SdkError> {
        if self.application.is_empty() {
            return Err(SdkError::Input(format!(
                "application name missing for microservice {}",
                self.name
            )));
        }
        self.api.authenticate().await?;

        let (microservices, system) = match self.api.list_microservices(&self.application).await
        {
            Ok(list) => (list, false),
            Err(err) if err.to_string().contains(APPLICATION_NOT_FOUND_MESSAGE) => {
                debug!(
                    application = %self.application,
                    "application not in regular scope, trying system applications"
                );
                let list = self
                    .api
                    .list_system_microservices(&self.application)
                    .await?;
                if list.is_empty() {
                    return Err(SdkError::NotFound(
                        "no microservices found in system application".to_string(),
                    ));
                }
                (list, true)
            }
            Err(err) => return Err(err),
        };

        if microservices.is_empty() {
            return Err(SdkError::NotFound("no microservices found".to_string()));
        }

        let uuid = microservices
            .into_iter()
            .find(|ms| ms.name == self.name)
            .map(|ms| ms.uuid);
        Ok(ResolvedIdentity { uuid, system })
    }

    async fn create(&self) -> Result<ApplyOutcome, SdkError> {
        if self.identity.system {
            return Err(SdkError::Input(
                "cannot create system microservice".to_string(),
            ));
        }
        let manifest = microservice_manifest(&self.application, &self.name, &self.spec)?;
        self.api.create_from_yaml(manifest).await?;
        info!(
            application = %self.application,
            microservice = %self.name,
            "microservice created"
        );
        Ok(ApplyOutcome::Created)
    }

    async fn update(&self) -> Result<ApplyOutcome, SdkError> {
        let uuid = self.identity.uuid.clone().ok_or_else(|| {
            SdkError::Input(format!(
                "microservice {}/{} has no uuid to update",
                self.application, self.name
            ))
        })?;
        let manifest = microservice_manifest(&self.application, &self.name, &self.spec)?;
        if self.identity.system {
            self.api.update_system_from_yaml(&uuid, manifest).await?;
        } else {
            self.api.update_from_yaml(&uuid, manifest).await?;
        }
        info!(
            application = %self.application,
            microservice = %self.name,
            %uuid,
            system = self.identity.system,
            "microservice updated"
        );
        Ok(ApplyOutcome::Updated {
            uuid,
            system: self.identity.system,
        })
    }
}

/// Connects with `config`, under its retry policy, and converges one microservice.
pub async fn deploy_microservice<S>(
    config: &SdkConfig,
    desired: DesiredMicroservice<S>,
) -> Result<ApplyOutcome, SdkError>
where
    S: Serialize + Send + Sync,
{
    let client = config.client();
    let mut executor = MicroserviceExecutor::new(client, &desired.fq_name, desired.spec)?;
    executor.execute().await
}
