//! Configuration types for comment-sync
//!
//! [`Config`] is an immutable value built once at startup (defaults, then an optional
//! JSON file, then `COMMENT_SYNC_*` environment overrides) and handed to constructors
//! wrapped in an `Arc`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Prefix of all environment overrides
pub const ENV_PREFIX: &str = "COMMENT_SYNC_";

/// Main configuration for [`CommentSync`](crate::CommentSync)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote comment API client settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Retry policy for remote calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Comment store settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// What callers see when the remote API cannot deliver a comment
    #[serde(default)]
    pub fetch_failure_policy: FetchFailurePolicy,
}

/// Remote comment API client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL; the comment id is appended as the last path segment
    /// (default: "https://jsonplaceholder.typicode.com/comments/")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Connection establishment timeout (default: 5000 ms)
    #[serde(default = "default_connect_timeout", with = "duration_millis")]
    pub connect_timeout: Duration,

    /// Whole-response timeout per attempt (default: 10000 ms, must exceed `connect_timeout`)
    #[serde(default = "default_response_timeout", with = "duration_millis")]
    pub response_timeout: Duration,

    /// Maximum response body buffered in memory (default: 16 MiB)
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,

    /// Maximum outbound request body (default: 10 MiB)
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,

    /// Maximum concurrent outbound requests, also the idle pool size per host (default: 32)
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Static User-Agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Static bearer credential sent as `Authorization: Bearer <token>`
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout: default_connect_timeout(),
            response_timeout: default_response_timeout(),
            max_response_bytes: default_max_response_bytes(),
            max_request_bytes: default_max_request_bytes(),
            max_connections: default_max_connections(),
            user_agent: default_user_agent(),
            bearer_token: None,
        }
    }
}

/// Retry configuration for transient remote failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (default: 3, i.e. 4 attempts total)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (default: 500 ms)
    #[serde(default = "default_initial_delay", with = "duration_millis")]
    pub initial_delay: Duration,

    /// Cap on any single delay (default: 2000 ms)
    #[serde(default = "default_max_delay", with = "duration_millis")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Randomize each delay by +/-50%, kept within `[initial_delay, max_delay]` (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Comment store configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "comment-sync.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Pool size (default: 8)
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,

    /// How long to wait for a pooled connection or a locked database (default: 5000 ms)
    #[serde(default = "default_acquire_timeout", with = "duration_millis")]
    pub acquire_timeout: Duration,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_connections: default_db_max_connections(),
            acquire_timeout: default_acquire_timeout(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// How fetch-stage failures are reported to callers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailurePolicy {
    /// Every fetch failure (after retries) is reported as "not found"
    #[default]
    DegradeToNotFound,
    /// Only a remote 404 is "not found"; other failures are "upstream unavailable"
    Surface,
}

impl Config {
    /// Build the startup configuration
    ///
    /// Starts from `path` (a JSON file) when given, otherwise from defaults, then
    /// applies `COMMENT_SYNC_*` environment overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file; missing sections and fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })
    }

    /// Apply overrides from a variable lookup (the environment in production)
    ///
    /// Recognised keys (all prefixed with [`ENV_PREFIX`]): `BASE_URL`, `BEARER_TOKEN`,
    /// `USER_AGENT`, `CONNECT_TIMEOUT_MS`, `RESPONSE_TIMEOUT_MS`, `MAX_RESPONSE_BYTES`,
    /// `MAX_CONNECTIONS`, `MAX_RETRIES`, `INITIAL_DELAY_MS`, `MAX_DELAY_MS`,
    /// `DATABASE_PATH`, `BIND_ADDRESS`, `FETCH_FAILURE_POLICY`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = get("BASE_URL") {
            self.remote.base_url = v;
        }
        if let Some(v) = get("BEARER_TOKEN") {
            self.remote.bearer_token = Some(v);
        }
        if let Some(v) = get("USER_AGENT") {
            self.remote.user_agent = v;
        }
        if let Some(v) = get("CONNECT_TIMEOUT_MS") {
            self.remote.connect_timeout = Duration::from_millis(parse_override("CONNECT_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = get("RESPONSE_TIMEOUT_MS") {
            self.remote.response_timeout =
                Duration::from_millis(parse_override("RESPONSE_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = get("MAX_RESPONSE_BYTES") {
            self.remote.max_response_bytes = parse_override("MAX_RESPONSE_BYTES", &v)?;
        }
        if let Some(v) = get("MAX_CONNECTIONS") {
            self.remote.max_connections = parse_override("MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = get("MAX_RETRIES") {
            self.retry.max_retries = parse_override("MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("INITIAL_DELAY_MS") {
            self.retry.initial_delay = Duration::from_millis(parse_override("INITIAL_DELAY_MS", &v)?);
        }
        if let Some(v) = get("MAX_DELAY_MS") {
            self.retry.max_delay = Duration::from_millis(parse_override("MAX_DELAY_MS", &v)?);
        }
        if let Some(v) = get("DATABASE_PATH") {
            self.persistence.database_path = PathBuf::from(v);
        }
        if let Some(v) = get("BIND_ADDRESS") {
            self.api.bind_address = parse_override("BIND_ADDRESS", &v)?;
        }
        if let Some(v) = get("FETCH_FAILURE_POLICY") {
            self.fetch_failure_policy = match v.to_lowercase().as_str() {
                "degrade_to_not_found" => FetchFailurePolicy::DegradeToNotFound,
                "surface" => FetchFailurePolicy::Surface,
                _ => {
                    return Err(Error::Config {
                        message: format!(
                            "invalid fetch failure policy '{v}' (expected 'degrade_to_not_found' or 'surface')"
                        ),
                        key: Some("fetch_failure_policy".into()),
                    });
                }
            };
        }

        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.remote.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.remote.base_url, e),
            key: Some("remote.base_url".into()),
        })?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(config_error(
                "remote.base_url",
                format!("base URL '{}' must be an http(s) URL", self.remote.base_url),
            ));
        }
        if self.remote.connect_timeout.is_zero() {
            return Err(config_error(
                "remote.connect_timeout",
                "connect timeout must be greater than zero",
            ));
        }
        if self.remote.response_timeout <= self.remote.connect_timeout {
            return Err(config_error(
                "remote.response_timeout",
                format!(
                    "response timeout ({:?}) must be larger than connect timeout ({:?})",
                    self.remote.response_timeout, self.remote.connect_timeout
                ),
            ));
        }
        if self.remote.max_response_bytes == 0 {
            return Err(config_error(
                "remote.max_response_bytes",
                "response buffer limit must be greater than zero",
            ));
        }
        if self.remote.max_connections == 0 {
            return Err(config_error(
                "remote.max_connections",
                "at least one outbound connection is required",
            ));
        }
        if self.retry.backoff_multiplier.is_nan() || self.retry.backoff_multiplier < 1.0 {
            return Err(config_error(
                "retry.backoff_multiplier",
                "backoff multiplier must be at least 1.0",
            ));
        }
        if self.retry.initial_delay > self.retry.max_delay {
            return Err(config_error(
                "retry.initial_delay",
                "initial delay must not exceed max delay",
            ));
        }
        if self.persistence.max_connections == 0 {
            return Err(config_error(
                "persistence.max_connections",
                "at least one database connection is required",
            ));
        }
        Ok(())
    }
}

fn config_error(key: &str, message: impl Into<String>) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.into()),
    }
}

fn parse_override<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| Error::Config {
        message: format!("invalid value '{value}' for {ENV_PREFIX}{name}: {e}"),
        key: Some(format!("{ENV_PREFIX}{name}")),
    })
}

// Default value functions
fn default_base_url() -> String {
    "https://jsonplaceholder.typicode.com/comments/".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_response_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_response_bytes() -> usize {
    16 * 1024 * 1024 // 16 MiB
}

fn default_max_request_bytes() -> usize {
    10 * 1024 * 1024 // 10 MiB
}

fn default_max_connections() -> usize {
    32
}

fn default_user_agent() -> String {
    concat!("comment-sync/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_database_path() -> PathBuf {
    PathBuf::from("comment-sync.db")
}

fn default_db_max_connections() -> u32 {
    8
}

fn default_acquire_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (milliseconds)
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
