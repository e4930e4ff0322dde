//! Namespace discovery

use tracing::debug;

use super::client::ResourceClient;
use super::error::ApiError;
use super::models::{metadata_name, PROJECT_MODEL};

/// Namespace used when nothing else is known
pub const DEFAULT_NAMESPACE: &str = "default";

/// First project visible to the caller, if any.
///
/// Projects are cluster scoped, so the list is not filtered by namespace.
pub async fn discover_namespace<C>(client: &C) -> Result<Option<String>, ApiError>
where
    C: ResourceClient + ?Sized,
{
    let projects = client.list(&PROJECT_MODEL, None).await?;
    let found = projects
        .iter()
        .find_map(|p| metadata_name(p).map(str::to_string));
    debug!(count = projects.len(), namespace = ?found, "discovered projects");
    Ok(found)
}
