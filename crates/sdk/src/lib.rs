//! Client SDK for the ioFog / Datasance controller REST API.
//!
//! [`Session`] owns the endpoint and credentials, [`ResourceClient`] issues
//! authenticated requests under a hot-swappable [`RetryPolicy`], and
//! [`apps::MicroserviceExecutor`] converges a single microservice onto the
//! controller. [`AgentClient`] is the in-container side: config and message
//! bus calls against the local agent.

pub mod apps;
pub mod client;
pub mod config;
pub mod error;
pub mod list;
pub mod microservices;
pub mod resources;
pub mod retry;
pub mod session;
pub mod telemetry;

pub use client::ResourceClient;
pub use config::{ControllerConfig, RetryConfig, SdkConfig};
pub use error::SdkError;
pub use list::ListResponse;
pub use microservices::AgentClient;
pub use resources::{Collection, ControllerResource};
pub use retry::{ErrorRetry, RetryPolicy, RetrySettings, run_with_retry};
pub use session::{AuthMode, Session};
