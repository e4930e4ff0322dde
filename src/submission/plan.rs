//! Ordered resource operations derived from a finished draft

use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::api::models::{metadata_name, metadata_namespace, K8sModel, ResourceRef};
use crate::wizard::Draft;

/// The draft cannot be turned into resources
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PlanError(pub String);

/// One resource to create, in submission order
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOperation {
    /// Stable key identifying the operation across attempts
    pub key: String,
    pub model: K8sModel,
    pub name: String,
    pub namespace: Option<String>,
    pub payload: Value,
}

impl PlannedOperation {
    /// Build from a payload; name and namespace come from its metadata
    pub fn new(key: impl Into<String>, model: K8sModel, payload: Value) -> Result<Self, PlanError> {
        let key = key.into();
        let name = metadata_name(&payload)
            .ok_or_else(|| PlanError(format!("{key}: payload has no metadata.name")))?
            .to_string();
        let namespace = metadata_namespace(&payload).map(str::to_string);
        Ok(Self {
            key,
            model,
            name,
            namespace,
            payload,
        })
    }

    /// SHA-256 of the serialized payload, hex encoded
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(&self.payload).unwrap_or_default();
        format!("{:x}", Sha256::digest(&bytes))
    }

    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef::new(&self.model, &self.name, self.namespace.as_deref())
    }

    /// `Kind/name`, used in messages
    pub fn label(&self) -> String {
        format!("{}/{}", self.model.kind, self.name)
    }
}

/// Maps a draft onto the operations that realize it
pub trait SubmissionPlanner: Send + Sync {
    fn plan(&self, draft: &Draft, namespace: &str) -> Result<Vec<PlannedOperation>, PlanError>;
}
