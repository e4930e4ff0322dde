//! Backend resource client trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;
use super::models::K8sModel;

/// JSON patch operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    Add,
    Remove,
    Replace,
    Test,
}

/// One JSON patch (RFC 6902) operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchOpKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOp {
    pub fn replace(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOpKind::Replace,
            path: path.into(),
            value: Some(value.into()),
        }
    }

    pub fn add(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOpKind::Add,
            path: path.into(),
            value: Some(value.into()),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOpKind::Remove,
            path: path.into(),
            value: None,
        }
    }
}

/// Create/read/update/delete access to the backend API.
///
/// Every call is fallible. Implementations must not retry writes.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Create `data`; namespace and name come from its metadata
    async fn create(&self, model: &K8sModel, data: &Value) -> Result<Value, ApiError>;

    async fn get(
        &self,
        model: &K8sModel,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Value, ApiError>;

    /// Replace the named resource with `data`
    async fn update(
        &self,
        model: &K8sModel,
        name: &str,
        namespace: Option<&str>,
        data: &Value,
    ) -> Result<Value, ApiError>;

    /// Apply JSON patch operations to `resource` (located by its metadata)
    async fn patch(
        &self,
        model: &K8sModel,
        resource: &Value,
        ops: &[PatchOp],
    ) -> Result<Value, ApiError>;

    /// Delete `resource` (located by its metadata)
    async fn delete(&self, model: &K8sModel, resource: &Value) -> Result<(), ApiError>;

    /// List resources, scoped to `namespace` for namespaced models
    async fn list(&self, model: &K8sModel, namespace: Option<&str>)
        -> Result<Vec<Value>, ApiError>;
}
