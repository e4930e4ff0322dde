//! HTTP implementation of [`ResourceClient`] for Kubernetes-style APIs

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::client::{PatchOp, ResourceClient};
use super::error::ApiError;
use super::models::{metadata_name, metadata_namespace, K8sModel};
use crate::config::ApiConfig;

const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

/// Talks to the cluster API over HTTP(S)
pub struct HttpResourceClient {
    base_url: String,
    token: Option<String>,
    client: Client,
    /// Retries for reads only; writes are never repeated
    read_retries: usize,
    retry_base_delay: Duration,
}

impl HttpResourceClient {
    /// Create a client with default timeouts and no read retries
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client: Client::new(),
            read_retries: 0,
            retry_base_delay: Duration::from_millis(500),
        }
    }

    /// Create from config; the bearer token is read from `config.token_env`
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        if config.base_url.trim().is_empty() {
            return Err(ApiError::not_configured("api.base_url"));
        }

        let token = env::var(&config.token_env).ok().filter(|t| !t.is_empty());
        if token.is_none() {
            debug!(
                token_env = %config.token_env,
                "no API token in environment, sending unauthenticated requests"
            );
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::network(&config.base_url, e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            client,
            read_retries: config.read_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn retry_strategy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.retry_base_delay)
            .with_max_delay(self.retry_base_delay * 20)
            .with_max_times(self.read_retries)
    }

    /// Send and check the status, returning the raw response
    async fn send(&self, label: &str, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::network(label, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(
            label,
            status.as_u16(),
            status_message(&body),
            retry_after,
        ))
    }

    async fn send_json(&self, label: &str, builder: RequestBuilder) -> Result<Value, ApiError> {
        self.send(label, builder)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::decode(label, e.to_string()))
    }

    /// GET with optional retries on transient failures
    async fn read(&self, label: &str, path: &str) -> Result<Value, ApiError> {
        let op = || async move { self.send_json(label, self.request(Method::GET, path)).await };

        if self.read_retries == 0 {
            return op().await;
        }

        op.retry(self.retry_strategy())
            .when(ApiError::is_transient)
            .notify(|err, dur| {
                warn!("Retrying read of {} after {:?}: {}", label, dur, err);
            })
            .await
    }
}

/// Pull the `message` out of a Kubernetes `Status` body when there is one
fn status_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn label(model: &K8sModel, name: &str) -> String {
    format!("{}/{}", model.kind, name)
}

/// Name and namespace of an object body, or a decode error
fn locate<'a>(model: &K8sModel, object: &'a Value) -> Result<(&'a str, Option<&'a str>), ApiError> {
    let name = metadata_name(object)
        .ok_or_else(|| ApiError::decode(model.kind, "object has no metadata.name"))?;
    Ok((name, metadata_namespace(object)))
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    #[instrument(skip(self, data), fields(kind = model.kind))]
    async fn create(&self, model: &K8sModel, data: &Value) -> Result<Value, ApiError> {
        let (name, namespace) = locate(model, data)?;
        let path = model.collection_path(namespace);
        debug!(%path, "creating resource");
        self.send_json(
            &label(model, name),
            self.request(Method::POST, &path).json(data),
        )
        .await
    }

    async fn get(
        &self,
        model: &K8sModel,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Value, ApiError> {
        self.read(&label(model, name), &model.resource_path(name, namespace))
            .await
    }

    #[instrument(skip(self, data), fields(kind = model.kind))]
    async fn update(
        &self,
        model: &K8sModel,
        name: &str,
        namespace: Option<&str>,
        data: &Value,
    ) -> Result<Value, ApiError> {
        let path = model.resource_path(name, namespace);
        self.send_json(
            &label(model, name),
            self.request(Method::PUT, &path).json(data),
        )
        .await
    }

    #[instrument(skip(self, resource, ops), fields(kind = model.kind))]
    async fn patch(
        &self,
        model: &K8sModel,
        resource: &Value,
        ops: &[PatchOp],
    ) -> Result<Value, ApiError> {
        let (name, namespace) = locate(model, resource)?;
        let path = model.resource_path(name, namespace);
        let body = serde_json::to_vec(ops)
            .map_err(|e| ApiError::decode(label(model, name), e.to_string()))?;
        self.send_json(
            &label(model, name),
            self.request(Method::PATCH, &path)
                .header(header::CONTENT_TYPE, JSON_PATCH_CONTENT_TYPE)
                .body(body),
        )
        .await
    }

    #[instrument(skip(self, resource), fields(kind = model.kind))]
    async fn delete(&self, model: &K8sModel, resource: &Value) -> Result<(), ApiError> {
        let (name, namespace) = locate(model, resource)?;
        let path = model.resource_path(name, namespace);
        self.send(&label(model, name), self.request(Method::DELETE, &path))
            .await
            .map(|_| ())
    }

    async fn list(
        &self,
        model: &K8sModel,
        namespace: Option<&str>,
    ) -> Result<Vec<Value>, ApiError> {
        let list = self
            .read(model.label_plural, &model.collection_path(namespace))
            .await?;
        match list.get("items") {
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(_) => Err(ApiError::decode(model.label_plural, "items is not an array")),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::APPLICATION_MODEL;

    #[test]
    fn test_base_url_is_normalized() {
        let client = HttpResourceClient::new("http://127.0.0.1:8001/", None);
        assert_eq!(client.base_url(), "http://127.0.0.1:8001");
        assert_eq!(
            client.url(&APPLICATION_MODEL.collection_path(Some("ns"))),
            "http://127.0.0.1:8001/apis/appstudio.redhat.com/v1alpha1/namespaces/ns/applications"
        );
    }

    #[test]
    fn test_from_config_requires_base_url() {
        let config = ApiConfig {
            base_url: "  ".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            HttpResourceClient::from_config(&config),
            Err(ApiError::NotConfigured { .. })
        ));
    }

    #[test]
    fn test_status_message_prefers_status_body() {
        let body = r#"{"kind":"Status","message":"applications \"x\" already exists","code":409}"#;
        assert_eq!(status_message(body), "applications \"x\" already exists");
        assert_eq!(status_message(" plain text "), "plain text");
    }

    #[test]
    fn test_locate_requires_name() {
        let err = locate(&APPLICATION_MODEL, &serde_json::json!({"metadata": {}})).unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}
