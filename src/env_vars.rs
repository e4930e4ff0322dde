//! Centralized environment variable registry.
//!
//! Single source of truth for the environment variables samples-flow reads.
//! It is printed by `samples-flow env`.
//!
//! Config overrides use the `SAMPLES_FLOW_` prefix with `__` separating
//! nested config paths (e.g., `SAMPLES_FLOW_API__BASE_URL`).

/// An environment variable definition
#[derive(Debug, Clone)]
pub struct EnvVar {
    /// Environment variable name (e.g., "SAMPLES_FLOW_API__BASE_URL")
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Category for grouping in documentation
    pub category: EnvVarCategory,
    /// Whether this variable is required for operation
    pub required: bool,
    /// Default value if not set
    pub default: Option<&'static str>,
    /// Example value for documentation
    pub example: Option<&'static str>,
}

/// Categories for organizing environment variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvVarCategory {
    /// API tokens
    Authentication,
    /// Backend API connection
    Api,
    /// File path configuration
    Paths,
    /// Logging configuration
    Logging,
}

impl EnvVarCategory {
    /// Display name for this category
    pub fn display_name(&self) -> &'static str {
        match self {
            EnvVarCategory::Authentication => "Authentication",
            EnvVarCategory::Api => "API",
            EnvVarCategory::Paths => "Paths",
            EnvVarCategory::Logging => "Logging",
        }
    }

    /// All categories in display order
    pub fn all() -> &'static [EnvVarCategory] {
        &[
            EnvVarCategory::Authentication,
            EnvVarCategory::Api,
            EnvVarCategory::Paths,
            EnvVarCategory::Logging,
        ]
    }
}

/// Static registry of all documented environment variables
pub static ENV_VARS: &[EnvVar] = &[
    // === Authentication ===
    EnvVar {
        name: "SAMPLES_FLOW_API_TOKEN",
        description: "Bearer token for the cluster API (name configurable via api.token_env)",
        category: EnvVarCategory::Authentication,
        required: false,
        default: None,
        example: Some("sha256~..."),
    },
    // === API ===
    EnvVar {
        name: "SAMPLES_FLOW_API__BASE_URL",
        description: "Base URL of the cluster API",
        category: EnvVarCategory::Api,
        required: false,
        default: Some("http://127.0.0.1:8001"),
        example: Some("https://api.cluster.example.com:6443"),
    },
    EnvVar {
        name: "SAMPLES_FLOW_API__TOKEN_ENV",
        description: "Name of the environment variable holding the API token",
        category: EnvVarCategory::Api,
        required: false,
        default: Some("SAMPLES_FLOW_API_TOKEN"),
        example: Some("KUBE_TOKEN"),
    },
    EnvVar {
        name: "SAMPLES_FLOW_API__NAMESPACE",
        description: "Namespace to create resources in (discovered from projects when unset)",
        category: EnvVarCategory::Api,
        required: false,
        default: None,
        example: Some("team-a"),
    },
    EnvVar {
        name: "SAMPLES_FLOW_API__TIMEOUT_SECS",
        description: "Request timeout in seconds",
        category: EnvVarCategory::Api,
        required: false,
        default: Some("30"),
        example: Some("60"),
    },
    EnvVar {
        name: "SAMPLES_FLOW_API__READ_RETRIES",
        description: "Retries for get/list on transient failures; writes are never retried",
        category: EnvVarCategory::Api,
        required: false,
        default: Some("0"),
        example: Some("3"),
    },
    EnvVar {
        name: "SAMPLES_FLOW_API__RETRY_BASE_DELAY_MS",
        description: "Initial delay between read retries in milliseconds",
        category: EnvVarCategory::Api,
        required: false,
        default: Some("500"),
        example: Some("1000"),
    },
    // === Paths ===
    EnvVar {
        name: "SAMPLES_FLOW_PATHS__STATE",
        description: "State directory (log files are written under {state}/logs)",
        category: EnvVarCategory::Paths,
        required: false,
        default: Some(".samples-flow"),
        example: Some("/var/lib/samples-flow"),
    },
    // === Logging ===
    EnvVar {
        name: "SAMPLES_FLOW_LOGGING__LEVEL",
        description: "Log level filter (trace, debug, info, warn, error)",
        category: EnvVarCategory::Logging,
        required: false,
        default: Some("info"),
        example: Some("debug"),
    },
    EnvVar {
        name: "SAMPLES_FLOW_LOGGING__TO_FILE",
        description: "Write logs to a file instead of stderr",
        category: EnvVarCategory::Logging,
        required: false,
        default: Some("false"),
        example: Some("true"),
    },
    EnvVar {
        name: "RUST_LOG",
        description: "Standard tracing filter; replaces the configured log level",
        category: EnvVarCategory::Logging,
        required: false,
        default: None,
        example: Some("samples_flow=debug"),
    },
];

/// Get all environment variables for a given category
pub fn env_vars_for_category(category: EnvVarCategory) -> impl Iterator<Item = &'static EnvVar> {
    ENV_VARS.iter().filter(move |v| v.category == category)
}

/// Get environment variables grouped by category
pub fn env_vars_by_category() -> Vec<(EnvVarCategory, Vec<&'static EnvVar>)> {
    EnvVarCategory::all()
        .iter()
        .map(|cat| {
            let vars: Vec<&EnvVar> = env_vars_for_category(*cat).collect();
            (*cat, vars)
        })
        .filter(|(_, vars)| !vars.is_empty())
        .collect()
}
