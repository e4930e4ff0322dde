//! Backend resource API
//!
//! This module provides:
//! - The [`ResourceClient`] trait the submission layer talks to
//! - Resource model descriptors and object helpers
//! - An HTTP client for Kubernetes-style APIs and an in-memory stand-in
//! - Error handling that tells definitive failures from unknown outcomes

pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod models;
pub mod namespace;

pub use client::{PatchOp, PatchOpKind, ResourceClient};
pub use error::ApiError;
pub use http::HttpResourceClient;
pub use memory::{InMemoryResourceClient, RecordedCall};
pub use models::{
    K8sModel, ResourceRef, APPLICATION_MODEL, COMPONENT_MODEL, CONFIG_MAP_MODEL, PROJECT_MODEL,
};
pub use namespace::{discover_namespace, DEFAULT_NAMESPACE};
