use common::apps::{Kind, Manifest};
use serde::Serialize;

use crate::error::SdkError;

/// Wraps `spec` in a manifest header and renders it as YAML.
pub fn encode_manifest<S: Serialize>(
    kind: Kind,
    name: impl Into<String>,
    spec: &S,
) -> Result<Vec<u8>, SdkError> {
    let manifest = Manifest::new(kind, name, spec);
    Ok(serde_yaml::to_string(&manifest)?.into_bytes())
}

/// `Microservice` manifest named `<app>/<name>`.
pub fn microservice_manifest<S: Serialize>(
    application: &str,
    name: &str,
    spec: &S,
) -> Result<Vec<u8>, SdkError> {
    encode_manifest(Kind::Microservice, format!("{application}/{name}"), spec)
}
