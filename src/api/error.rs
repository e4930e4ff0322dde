//! Backend API error types

use std::fmt;

/// Errors returned by a [`ResourceClient`](super::ResourceClient)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 401 Unauthorized - token invalid or expired
    Unauthorized { resource: String },
    /// 403 Forbidden - token lacks required permissions
    Forbidden { resource: String },
    /// 404 Not Found
    NotFound { resource: String },
    /// 409 Conflict - usually "already exists"
    Conflict { resource: String, message: String },
    /// 429 Rate Limited
    RateLimited {
        resource: String,
        retry_after_secs: Option<u64>,
    },
    /// Network or timeout error; the server may or may not have acted
    NetworkError { resource: String, message: String },
    /// Other HTTP errors
    HttpError {
        resource: String,
        status: u16,
        message: String,
    },
    /// Response arrived but could not be decoded
    Decode { resource: String, message: String },
    /// Client not configured (missing base URL or token)
    NotConfigured { setting: String },
}

impl ApiError {
    /// Check if this is an authentication error (401 or 403)
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized { .. } | ApiError::Forbidden { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Whether the server definitely did not apply the request.
    ///
    /// Network failures, server errors and undecodable success responses
    /// leave the outcome of a write unknown.
    pub fn is_definitive(&self) -> bool {
        match self {
            ApiError::NetworkError { .. } | ApiError::Decode { .. } => false,
            ApiError::HttpError { status, .. } => *status < 500,
            _ => true,
        }
    }

    /// Whether repeating a read could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::NetworkError { .. } | ApiError::RateLimited { .. } => true,
            ApiError::HttpError { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Get retry-after seconds if rate limited
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::RateLimited {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    /// Map a non-success HTTP status onto an error
    pub fn from_status(
        resource: impl Into<String>,
        status: u16,
        body: impl Into<String>,
        retry_after_secs: Option<u64>,
    ) -> Self {
        let resource = resource.into();
        match status {
            401 => ApiError::Unauthorized { resource },
            403 => ApiError::Forbidden { resource },
            404 => ApiError::NotFound { resource },
            409 => ApiError::Conflict {
                resource,
                message: body.into(),
            },
            429 => ApiError::RateLimited {
                resource,
                retry_after_secs,
            },
            _ => ApiError::HttpError {
                resource,
                status,
                message: body.into(),
            },
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        ApiError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(resource: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn network(resource: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::NetworkError {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn http(resource: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        ApiError::HttpError {
            resource: resource.into(),
            status,
            message: message.into(),
        }
    }

    pub fn decode(resource: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Decode {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn not_configured(setting: impl Into<String>) -> Self {
        ApiError::NotConfigured {
            setting: setting.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized { resource } => {
                write!(f, "{}: Unauthorized (401) - check the API token", resource)
            }
            ApiError::Forbidden { resource } => {
                write!(f, "{}: Forbidden (403) - insufficient permissions", resource)
            }
            ApiError::NotFound { resource } => write!(f, "{}: Not found (404)", resource),
            ApiError::Conflict { resource, message } => {
                if message.is_empty() {
                    write!(f, "{}: Already exists (409)", resource)
                } else {
                    write!(f, "{}: Already exists (409) - {}", resource, message)
                }
            }
            ApiError::RateLimited {
                resource,
                retry_after_secs,
            } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "{}: Rate limited - retry after {}s", resource, secs)
                } else {
                    write!(f, "{}: Rate limited", resource)
                }
            }
            ApiError::NetworkError { resource, message } => {
                write!(f, "{}: Network error - {}", resource, message)
            }
            ApiError::HttpError {
                resource,
                status,
                message,
            } => {
                write!(f, "{}: HTTP {} - {}", resource, status, message)
            }
            ApiError::Decode { resource, message } => {
                write!(f, "{}: Could not decode response - {}", resource, message)
            }
            ApiError::NotConfigured { setting } => {
                write!(f, "API client not configured: {} is not set", setting)
            }
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(ApiError::from_status("x", 401, "", None).is_auth_error());
        assert!(ApiError::from_status("x", 403, "", None).is_auth_error());
        assert!(ApiError::from_status("x", 404, "", None).is_not_found());
        assert!(ApiError::from_status("x", 409, "exists", None).is_conflict());
        assert_eq!(
            ApiError::from_status("x", 429, "", Some(7)).retry_after(),
            Some(7)
        );
        assert_eq!(
            ApiError::from_status("x", 422, "bad spec", None),
            ApiError::http("x", 422, "bad spec")
        );
    }

    #[test]
    fn test_is_definitive() {
        assert!(ApiError::conflict("x", "").is_definitive());
        assert!(ApiError::http("x", 422, "").is_definitive());
        assert!(!ApiError::http("x", 503, "").is_definitive());
        assert!(!ApiError::network("x", "timeout").is_definitive());
        assert!(!ApiError::decode("x", "eof").is_definitive());
    }

    #[test]
    fn test_is_transient() {
        assert!(ApiError::network("x", "reset").is_transient());
        assert!(ApiError::http("x", 503, "").is_transient());
        assert!(!ApiError::http("x", 500, "").is_transient());
        assert!(!ApiError::not_found("x").is_transient());
    }

    #[test]
    fn test_display() {
        let err = ApiError::from_status("Application/my-app", 429, "", Some(30));
        assert_eq!(
            err.to_string(),
            "Application/my-app: Rate limited - retry after 30s"
        );

        let err = ApiError::not_configured("api.base_url");
        assert_eq!(
            err.to_string(),
            "API client not configured: api.base_url is not set"
        );

        let err = ApiError::conflict("Component/backend", "");
        assert_eq!(err.to_string(), "Component/backend: Already exists (409)");
    }
}
