/// Configuration management for MediaVault services
use crate::{
    auth::client::AuthClientConfig,
    auth::TokenConfig,
    error::{VaultError, VaultResult},
    image::Interpolator,
    media::MediaConfig,
};
use std::env;
use std::path::PathBuf;

/// HTTP listener configuration shared by both services.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub hostname: String,
    pub port: u16,
    /// Per-request timeout in seconds.
    pub request_timeout: u64,
    /// Maximum accepted request body in bytes.
    pub body_limit: usize,
}

/// Image service configuration.
#[derive(Debug, Clone)]
pub struct ImageServerConfig {
    pub http: HttpConfig,
    /// Root directory of the blob storage tree.
    pub blob_basedir: PathBuf,
    pub media: MediaConfig,
    pub interpolator: Interpolator,
    pub auth_client: AuthClientConfig,
    /// Serve downloads with a Content-Disposition attachment header.
    pub content_disposition_download: bool,
}

impl ImageServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> VaultResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("MV_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = parse_var("MV_PORT", 8081u16)?;
        let request_timeout = parse_var("MV_REQUEST_TIMEOUT", 30u64)?;
        let body_limit = parse_var("MV_BODY_LIMIT", 64 * 1024 * 1024usize)?;

        let blob_basedir: PathBuf = env::var("MV_BLOB_BASEDIR")
            .unwrap_or_else(|_| "./data/blobs".to_string())
            .into();

        let max_size = parse_var("MV_MEDIA_MAX_SIZE", MediaConfig::default().max_size)?;

        let interpolator = Interpolator::parse(
            &env::var("MV_IMAGE_INTERPOLATOR").unwrap_or_else(|_| "catmullrom".to_string()),
        )?;

        let auth_url = env::var("MV_AUTH_URL")
            .unwrap_or_else(|_| "http://localhost:8080/auth/validate".to_string());

        let content_disposition_download = parse_var("MV_CONTENT_DISPOSITION_DOWNLOAD", false)?;

        Ok(Self {
            http: HttpConfig {
                hostname,
                port,
                request_timeout,
                body_limit,
            },
            blob_basedir,
            media: MediaConfig { max_size },
            interpolator,
            auth_client: AuthClientConfig { auth_url },
            content_disposition_download,
        })
    }
}

/// Auth service configuration.
#[derive(Debug, Clone)]
pub struct AuthServerConfig {
    pub http: HttpConfig,
    /// SQLite database file for the user store.
    pub database_path: PathBuf,
    pub token: TokenConfig,
}

impl AuthServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> VaultResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("MV_AUTH_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = parse_var("MV_AUTH_PORT", 8080u16)?;
        let request_timeout = parse_var("MV_AUTH_REQUEST_TIMEOUT", 30u64)?;
        let body_limit = parse_var("MV_AUTH_BODY_LIMIT", 64 * 1024usize)?;

        let database_path: PathBuf = env::var("MV_AUTH_DB")
            .unwrap_or_else(|_| "./data/auth.sqlite".to_string())
            .into();

        let secret = env::var("MV_AUTH_JWT_SECRET")
            .map_err(|_| VaultError::InvalidInput("MV_AUTH_JWT_SECRET is required".to_string()))?;

        let ttl_seconds = parse_var("MV_AUTH_TOKEN_TTL", 3600i64)?;

        let config = Self {
            http: HttpConfig {
                hostname,
                port,
                request_timeout,
                body_limit,
            },
            database_path,
            token: TokenConfig {
                secret,
                ttl_seconds,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> VaultResult<()> {
        if self.token.secret.len() < 32 {
            return Err(VaultError::InvalidInput(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.token.ttl_seconds <= 0 {
            return Err(VaultError::InvalidInput(
                "token TTL must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> VaultResult<T> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| VaultError::InvalidInput(format!("invalid value for {name}"))),
        Err(_) => Ok(default),
    }
}
