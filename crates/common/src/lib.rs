//! Shared wire types for the ioFog controller SDK.
//!
//! Keep controller request/response shapes and manifest documents here so the
//! SDK crate only carries behavior.

#![warn(missing_docs)]

/// Controller REST DTOs (request bodies and resource info payloads).
pub mod api;
/// Manifest documents and the microservice spec payload they wrap.
pub mod apps;
/// Agent-local message bus and config payloads.
pub mod messages;
