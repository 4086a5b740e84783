//! Desired-state deployment of application components.

pub mod manifest;
pub mod microservice;

pub use common::apps::{Kind, Manifest};
pub use manifest::{encode_manifest, microservice_manifest};
pub use microservice::{
    APPLICATION_NOT_FOUND_MESSAGE, ApplyOutcome, DesiredMicroservice, ExecutorState,
    MicroserviceApi, MicroserviceExecutor, ResolvedIdentity, deploy_microservice, parse_fq_name,
};
