//! In-memory [`ResourceClient`] for dry runs and tests

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::client::{PatchOp, PatchOpKind, ResourceClient};
use super::error::ApiError;
use super::models::{metadata_name, metadata_namespace, K8sModel, PROJECT_MODEL};

type ObjectKey = (String, Option<String>, String);

/// A call made against the in-memory client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: String,
    pub kind: String,
    pub name: Option<String>,
}

/// Failure to inject into a future call
#[derive(Debug, Clone)]
struct InjectedFailure {
    operation: String,
    kind: Option<String>,
    error: ApiError,
    /// Apply the call before failing (response lost after the server acted)
    apply_first: bool,
}

/// Stores objects in a map keyed by (plural, namespace, name)
#[derive(Clone, Default)]
pub struct InMemoryResourceClient {
    objects: Arc<Mutex<BTreeMap<ObjectKey, Value>>>,
    failures: Arc<Mutex<VecDeque<InjectedFailure>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl InMemoryResourceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a project so namespace discovery has something to find
    pub fn with_project(self, name: &str) -> Self {
        self.insert(&PROJECT_MODEL, PROJECT_MODEL.object(name, None));
        self
    }

    /// Store an object directly, bypassing the call log
    pub fn insert(&self, model: &K8sModel, object: Value) {
        if let Some(name) = metadata_name(&object) {
            let key = key_for(model, name, metadata_namespace(&object));
            self.objects.lock().unwrap().insert(key, object);
        }
    }

    /// Fail the next `operation` call (optionally only for `kind`)
    pub fn fail_next(&self, operation: &str, kind: Option<&str>, error: ApiError) {
        self.push_failure(operation, kind, error, false);
    }

    /// Perform the next `operation` call, then report `error` anyway
    pub fn fail_after_applying(&self, operation: &str, kind: Option<&str>, error: ApiError) {
        self.push_failure(operation, kind, error, true);
    }

    fn push_failure(&self, operation: &str, kind: Option<&str>, error: ApiError, apply_first: bool) {
        self.failures.lock().unwrap().push_back(InjectedFailure {
            operation: operation.to_string(),
            kind: kind.map(str::to_string),
            error,
            apply_first,
        });
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls of `operation` against `kind`
    pub fn count(&self, operation: &str, kind: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation && c.kind == kind)
            .count()
    }

    pub fn stored(&self, model: &K8sModel, name: &str, namespace: Option<&str>) -> Option<Value> {
        self.objects
            .lock()
            .unwrap()
            .get(&key_for(model, name, namespace))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, operation: &str, model: &K8sModel, name: Option<&str>) {
        self.calls.lock().unwrap().push(RecordedCall {
            operation: operation.to_string(),
            kind: model.kind.to_string(),
            name: name.map(str::to_string),
        });
    }

    /// Pop the first injected failure matching this call
    fn take_failure(&self, operation: &str, model: &K8sModel) -> Option<InjectedFailure> {
        let mut failures = self.failures.lock().unwrap();
        let index = failures.iter().position(|f| {
            f.operation == operation && f.kind.as_deref().map_or(true, |k| k == model.kind)
        })?;
        failures.remove(index)
    }

    /// Run `apply` unless a failure is injected for this call
    fn guarded<T>(
        &self,
        operation: &str,
        model: &K8sModel,
        apply: impl FnOnce() -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        match self.take_failure(operation, model) {
            Some(failure) if failure.apply_first => {
                let _ = apply();
                Err(failure.error)
            }
            Some(failure) => Err(failure.error),
            None => apply(),
        }
    }
}

fn key_for(model: &K8sModel, name: &str, namespace: Option<&str>) -> ObjectKey {
    let namespace = namespace.filter(|_| model.namespaced).map(str::to_string);
    (model.plural.to_string(), namespace, name.to_string())
}

fn label(model: &K8sModel, name: &str) -> String {
    format!("{}/{}", model.kind, name)
}

fn locate(model: &K8sModel, object: &Value) -> Result<ObjectKey, ApiError> {
    let name = metadata_name(object)
        .ok_or_else(|| ApiError::decode(model.kind, "object has no metadata.name"))?;
    Ok(key_for(model, name, metadata_namespace(object)))
}

/// Apply JSON patch operations in place
fn apply_patch(target: &mut Value, ops: &[PatchOp], resource: &str) -> Result<(), ApiError> {
    for op in ops {
        let (parent_path, last) = match op.path.rfind('/') {
            Some(idx) => (&op.path[..idx], unescape(&op.path[idx + 1..])),
            None => return Err(ApiError::http(resource, 422, format!("bad path {}", op.path))),
        };
        let invalid = || ApiError::http(resource, 422, format!("path {} does not exist", op.path));

        match op.op {
            PatchOpKind::Test => {
                if target.pointer(&op.path) != op.value.as_ref() {
                    return Err(ApiError::http(resource, 422, format!("test failed at {}", op.path)));
                }
            }
            PatchOpKind::Remove => {
                let parent = target.pointer_mut(parent_path).ok_or_else(invalid)?;
                parent
                    .as_object_mut()
                    .and_then(|m| m.remove(&last))
                    .ok_or_else(invalid)?;
            }
            PatchOpKind::Replace => {
                let slot = target.pointer_mut(&op.path).ok_or_else(invalid)?;
                *slot = op.value.clone().unwrap_or(Value::Null);
            }
            PatchOpKind::Add => {
                let parent = target.pointer_mut(parent_path).ok_or_else(invalid)?;
                let map = parent.as_object_mut().ok_or_else(invalid)?;
                map.insert(last, op.value.clone().unwrap_or(Value::Null));
            }
        }
    }
    Ok(())
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

#[async_trait]
impl ResourceClient for InMemoryResourceClient {
    async fn create(&self, model: &K8sModel, data: &Value) -> Result<Value, ApiError> {
        let key = locate(model, data)?;
        self.record("create", model, Some(&key.2));
        self.guarded("create", model, || {
            let mut objects = self.objects.lock().unwrap();
            if objects.contains_key(&key) {
                return Err(ApiError::conflict(
                    label(model, &key.2),
                    format!("{} \"{}\" already exists", model.plural, key.2),
                ));
            }
            let mut stored = data.clone();
            stored["metadata"]["uid"] = Value::String(Uuid::new_v4().to_string());
            stored["metadata"]["resourceVersion"] = Value::String("1".to_string());
            stored["metadata"]["creationTimestamp"] =
                Value::String(chrono::Utc::now().to_rfc3339());
            objects.insert(key.clone(), stored.clone());
            Ok(stored)
        })
    }

    async fn get(
        &self,
        model: &K8sModel,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Value, ApiError> {
        self.record("get", model, Some(name));
        self.guarded("get", model, || {
            self.stored(model, name, namespace)
                .ok_or_else(|| ApiError::not_found(label(model, name)))
        })
    }

    async fn update(
        &self,
        model: &K8sModel,
        name: &str,
        namespace: Option<&str>,
        data: &Value,
    ) -> Result<Value, ApiError> {
        self.record("update", model, Some(name));
        self.guarded("update", model, || {
            let key = key_for(model, name, namespace);
            let mut objects = self.objects.lock().unwrap();
            let existing = objects
                .get(&key)
                .ok_or_else(|| ApiError::not_found(label(model, name)))?;
            let version = existing
                .pointer("/metadata/resourceVersion")
                .and_then(Value::as_str)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);
            let uid = existing.pointer("/metadata/uid").cloned();

            let mut stored = data.clone();
            stored["metadata"]["resourceVersion"] = Value::String((version + 1).to_string());
            if let Some(uid) = uid {
                stored["metadata"]["uid"] = uid;
            }
            objects.insert(key, stored.clone());
            Ok(stored)
        })
    }

    async fn patch(
        &self,
        model: &K8sModel,
        resource: &Value,
        ops: &[PatchOp],
    ) -> Result<Value, ApiError> {
        let key = locate(model, resource)?;
        self.record("patch", model, Some(&key.2));
        self.guarded("patch", model, || {
            let mut objects = self.objects.lock().unwrap();
            let existing = objects
                .get_mut(&key)
                .ok_or_else(|| ApiError::not_found(label(model, &key.2)))?;
            let mut patched = existing.clone();
            apply_patch(&mut patched, ops, &label(model, &key.2))?;
            *existing = patched.clone();
            Ok(patched)
        })
    }

    async fn delete(&self, model: &K8sModel, resource: &Value) -> Result<(), ApiError> {
        let key = locate(model, resource)?;
        self.record("delete", model, Some(&key.2));
        self.guarded("delete", model, || {
            self.objects
                .lock()
                .unwrap()
                .remove(&key)
                .map(|_| ())
                .ok_or_else(|| ApiError::not_found(label(model, &key.2)))
        })
    }

    async fn list(
        &self,
        model: &K8sModel,
        namespace: Option<&str>,
    ) -> Result<Vec<Value>, ApiError> {
        self.record("list", model, None);
        self.guarded("list", model, || {
            let namespace = namespace.filter(|_| model.namespaced);
            Ok(self
                .objects
                .lock()
                .unwrap()
                .iter()
                .filter(|((plural, ns, _), _)| {
                    plural == model.plural && (namespace.is_none() || ns.as_deref() == namespace)
                })
                .map(|(_, object)| object.clone())
                .collect())
        })
    }
}
