use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Inference service configuration
    pub inference: InferenceConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("SF_HEALTH_CONFIG").unwrap_or_else(|_| "config/local.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Load configuration layering embedded defaults, `path` (optional) and
    /// `SF_HEALTH__*` environment variables.
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("SF_HEALTH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            inference: InferenceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

/// Settings for the remote inference service and the agent sandbox it runs
/// queries from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the inference service
    #[serde(default = "default_inference_url")]
    pub base_url: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// API key; when unset it is read from `api_key_env`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variables consulted, in order, for the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Vec<String>,

    /// Application that hosts the agent sandbox
    #[serde(default)]
    pub app_name: Option<String>,

    /// Environment variables consulted, in order, for the application name
    #[serde(default = "default_app_name_env")]
    pub app_name_env: Vec<String>,

    /// Database attachment the agent is allowed to query
    #[serde(default = "default_db_attachment")]
    pub db_attachment: Option<String>,

    /// Whether `db_attachment` is a follower (read-only replica)
    #[serde(default = "default_true")]
    pub attachment_is_follower: bool,

    /// Dyno size for the query sandbox
    #[serde(default = "default_dyno_size")]
    pub dyno_size: String,

    /// Hard timeout for one categorization call (seconds)
    #[serde(default = "default_categorization_timeout")]
    pub categorization_timeout_secs: u64,

    /// Hard timeout for one insights call, request through end of stream (seconds)
    #[serde(default = "default_insights_timeout")]
    pub insights_timeout_secs: u64,

    /// Minimum similarity for a fuzzy category match
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl InferenceConfig {
    /// Explicit key, else the first non-empty variable in `api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve(&self.api_key, &self.api_key_env)
    }

    /// Explicit name, else the first non-empty variable in `app_name_env`.
    pub fn resolve_app_name(&self) -> Option<String> {
        resolve(&self.app_name, &self.app_name_env)
    }
}

fn resolve(explicit: &Option<String>, env_names: &[String]) -> Option<String> {
    explicit
        .as_ref()
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .or_else(|| {
            env_names
                .iter()
                .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
        })
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_inference_url(),
            model_id: default_model_id(),
            api_key: None,
            api_key_env: default_api_key_env(),
            app_name: None,
            app_name_env: default_app_name_env(),
            db_attachment: default_db_attachment(),
            attachment_is_follower: true,
            dyno_size: default_dyno_size(),
            categorization_timeout_secs: default_categorization_timeout(),
            insights_timeout_secs: default_insights_timeout(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_inference_url() -> String {
    "https://us.inference.heroku.com".to_string()
}

fn default_model_id() -> String {
    "claude-4-sonnet".to_string()
}

fn default_api_key_env() -> Vec<String> {
    vec![
        "HEROKU_INFERENCE_API_KEY".to_string(),
        "INFERENCE_API_KEY".to_string(),
        "INFERENCE_KEY".to_string(),
    ]
}

fn default_app_name_env() -> Vec<String> {
    vec!["APP_NAME".to_string(), "HEROKU_APP_NAME".to_string()]
}

fn default_db_attachment() -> Option<String> {
    Some("HEROKU_POSTGRESQL_COBALT".to_string())
}

fn default_dyno_size() -> String {
    "standard-1x".to_string()
}

fn default_categorization_timeout() -> u64 {
    30
}

fn default_insights_timeout() -> u64 {
    120
}

fn default_similarity_threshold() -> f64 {
    crate::ai::normalizer::DEFAULT_SIMILARITY_THRESHOLD
}
