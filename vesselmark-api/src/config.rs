/// Configuration management for the API server
///
/// Values are layered, later sources winning:
///
/// 1. Built-in defaults
/// 2. `vesselmark.toml` in the working directory (optional)
/// 3. Environment variables prefixed with `VESSELMARK_`, using `__` between
///    section and key
///
/// A `.env` file is loaded into the environment first, if present.
///
/// # Environment Variables
///
/// - `VESSELMARK_API__HOST`: Host to bind to (default: 0.0.0.0)
/// - `VESSELMARK_API__PORT`: Port to bind to (default: 8080)
/// - `VESSELMARK_API__CORS_ORIGINS`: Comma-separated origins, `*` for any
/// - `VESSELMARK_API__MAX_UPLOAD_BYTES`: Request body limit (default: 20 MiB)
/// - `VESSELMARK_DATABASE__URL`: SQLite URL (default: sqlite://vesselmark.db)
/// - `VESSELMARK_AUTH__JWT_SECRET`: Token signing secret (required)
/// - `VESSELMARK_AUTH__ISSUER`: Expected `iss` claim (required)
/// - `VESSELMARK_AUTH__AUDIENCE`: Expected `aud` claim (optional)
/// - `VESSELMARK_STORAGE__BACKEND`: `filesystem` or `memory`
/// - `VESSELMARK_STORAGE__ROOT`: Blob directory for the filesystem backend
/// - `VESSELMARK_LOGGING__FORMAT`: `pretty` or `json`
/// - `RUST_LOG`: Log filter override
///
/// # Example
///
/// ```no_run
/// use vesselmark_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use vesselmark_shared::storage::StorageBackend;

/// Minimum accepted length of the token signing secret
pub const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Token validation
    pub auth: AuthConfig,

    /// Blob storage
    pub storage: StorageConfig,

    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Comma-separated list of allowed origins; `*` allows any
    pub cors_origins: String,

    /// Enables HSTS
    pub production: bool,

    /// Largest accepted request body
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: "*".to_string(),
            production: false,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ApiConfig {
    /// Configured origins, trimmed, without empty entries
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://vesselmark.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Token validation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret shared with the identity provider for HS256 tokens
    ///
    /// Must be at least 32 characters. Generate with: `openssl rand -hex 32`
    pub jwt_secret: String,

    /// Expected `iss` claim
    pub issuer: String,

    /// Expected `aud` claim; not checked when unset
    pub audience: Option<String>,
}

/// Blob storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Directory for the filesystem backend
    pub root: PathBuf,

    /// Upper bound on a single blob read
    pub read_timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Filesystem,
            root: PathBuf::from("./data/images"),
            read_timeout_seconds: 30,
        }
    }
}

impl StorageConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,

    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Config {
    /// Loads configuration from defaults, `vesselmark.toml` and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A source cannot be parsed
    /// - A value has the wrong type
    /// - [`validate`](Self::validate) fails
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let config: Config = config::Config::builder()
            .add_source(config::File::with_name("vesselmark").required(false))
            .add_source(
                config::Environment::with_prefix("VESSELMARK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks values that have no usable default
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.jwt_secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!(
                "auth.jwt_secret must be at least {} characters long",
                MIN_SECRET_LENGTH
            );
        }

        if self.auth.issuer.trim().is_empty() {
            anyhow::bail!("auth.issuer is required");
        }

        if self.database.url.trim().is_empty() {
            anyhow::bail!("database.url is required");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be greater than zero");
        }

        if self.api.max_upload_bytes == 0 {
            anyhow::bail!("api.max_upload_bytes must be greater than zero");
        }

        if self.storage.read_timeout_seconds == 0 {
            anyhow::bail!("storage.read_timeout_seconds must be greater than zero");
        }

        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
