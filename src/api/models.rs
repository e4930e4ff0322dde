//! Resource model descriptors and helpers for Kubernetes-style objects

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Describes one kind of API resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct K8sModel {
    /// API group; `None` for the core group
    pub api_group: Option<&'static str>,
    pub api_version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
    pub abbr: &'static str,
    pub label: &'static str,
    pub label_plural: &'static str,
    pub namespaced: bool,
}

pub const APPLICATION_MODEL: K8sModel = K8sModel {
    api_group: Some("appstudio.redhat.com"),
    api_version: "v1alpha1",
    kind: "Application",
    plural: "applications",
    abbr: "A",
    label: "Application",
    label_plural: "Applications",
    namespaced: true,
};

pub const COMPONENT_MODEL: K8sModel = K8sModel {
    api_group: Some("appstudio.redhat.com"),
    api_version: "v1alpha1",
    kind: "Component",
    plural: "components",
    abbr: "C",
    label: "Component",
    label_plural: "Components",
    namespaced: true,
};

pub const PROJECT_MODEL: K8sModel = K8sModel {
    api_group: Some("project.openshift.io"),
    api_version: "v1",
    kind: "Project",
    plural: "projects",
    abbr: "PR",
    label: "Project",
    label_plural: "Projects",
    namespaced: false,
};

pub const CONFIG_MAP_MODEL: K8sModel = K8sModel {
    api_group: None,
    api_version: "v1",
    kind: "ConfigMap",
    plural: "configmaps",
    abbr: "CM",
    label: "ConfigMap",
    label_plural: "ConfigMaps",
    namespaced: true,
};

impl K8sModel {
    /// Value for the `apiVersion` field (`group/version` or `version`)
    pub fn api_version_string(&self) -> String {
        match self.api_group {
            Some(group) => format!("{}/{}", group, self.api_version),
            None => self.api_version.to_string(),
        }
    }

    /// Path of the resource collection, e.g. `/apis/g/v1/namespaces/ns/things`
    pub fn collection_path(&self, namespace: Option<&str>) -> String {
        let prefix = match self.api_group {
            Some(group) => format!("/apis/{}/{}", group, self.api_version),
            None => format!("/api/{}", self.api_version),
        };
        match namespace {
            Some(ns) if self.namespaced => {
                format!("{}/namespaces/{}/{}", prefix, ns, self.plural)
            }
            _ => format!("{}/{}", prefix, self.plural),
        }
    }

    /// Path of a single named resource
    pub fn resource_path(&self, name: &str, namespace: Option<&str>) -> String {
        format!("{}/{}", self.collection_path(namespace), name)
    }

    /// Skeleton object with `apiVersion`, `kind` and metadata filled in
    pub fn object(&self, name: &str, namespace: Option<&str>) -> Value {
        let mut metadata = serde_json::json!({ "name": name });
        if let (true, Some(ns)) = (self.namespaced, namespace) {
            metadata["namespace"] = Value::String(ns.to_string());
        }
        serde_json::json!({
            "apiVersion": self.api_version_string(),
            "kind": self.kind,
            "metadata": metadata,
        })
    }
}

/// Identifies a concrete resource on the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

impl ResourceRef {
    pub fn new(model: &K8sModel, name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            kind: model.kind.to_string(),
            name: name.into(),
            namespace: namespace.filter(|_| model.namespaced).map(str::to_string),
        }
    }

    /// Reference for an object body, from its metadata
    pub fn from_object(model: &K8sModel, object: &Value) -> Option<Self> {
        let name = metadata_name(object)?;
        Some(Self::new(model, name, metadata_namespace(object)))
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} (namespace {})", self.kind, self.name, ns),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

pub fn metadata_name(object: &Value) -> Option<&str> {
    object.pointer("/metadata/name").and_then(Value::as_str)
}

pub fn metadata_namespace(object: &Value) -> Option<&str> {
    object.pointer("/metadata/namespace").and_then(Value::as_str)
}

pub fn annotation<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object
        .get("metadata")?
        .get("annotations")?
        .get(key)?
        .as_str()
}

/// Set `metadata.annotations[key]`, creating the maps as needed
pub fn set_annotation(object: &mut Value, key: &str, value: &str) {
    if !object.is_object() {
        return;
    }
    let metadata = object
        .as_object_mut()
        .map(|o| o.entry("metadata").or_insert_with(|| serde_json::json!({})));
    let Some(Value::Object(metadata)) = metadata else {
        return;
    };
    let annotations = metadata
        .entry("annotations")
        .or_insert_with(|| serde_json::json!({}));
    if let Value::Object(map) = annotations {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
}
