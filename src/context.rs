/// Application context and dependency wiring
use crate::{
    auth::{AuthService, HttpAuthClient, TokenValidator},
    blob_store::BlobStoreConfig,
    config::{AuthServerConfig, ImageServerConfig},
    db,
    error::VaultResult,
    image::{ImageConfig, ImageStore},
    media::MediaStore,
    users::UserStore,
};
use std::sync::Arc;

/// Shared state of the image service.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ImageServerConfig>,
    pub images: Arc<ImageStore>,
    pub auth_client: Arc<dyn TokenValidator>,
}

impl AppContext {
    /// Build the image service context from configuration.
    pub fn new(config: ImageServerConfig) -> VaultResult<Self> {
        let store_cfg = BlobStoreConfig::Disk {
            basedir: config.blob_basedir.clone(),
        };

        let media = MediaStore::open(&store_cfg, config.media.clone())?;
        let images = Arc::new(ImageStore::open(
            &store_cfg,
            media,
            ImageConfig {
                interpolator: config.interpolator,
            },
        )?);

        let auth_client: Arc<dyn TokenValidator> =
            Arc::new(HttpAuthClient::new(config.auth_client.clone()));

        Ok(Self {
            config: Arc::new(config),
            images,
            auth_client,
        })
    }

    /// Swap the token validator; used by tests and in-process embeddings.
    pub fn with_validator(mut self, validator: Arc<dyn TokenValidator>) -> Self {
        self.auth_client = validator;
        self
    }
}

/// Shared state of the auth service.
#[derive(Clone)]
pub struct AuthContext {
    pub config: Arc<AuthServerConfig>,
    pub auth: Arc<AuthService>,
}

impl AuthContext {
    /// Build the auth service context from configuration.
    pub async fn new(config: AuthServerConfig) -> VaultResult<Self> {
        let pool = db::create_pool(&config.database_path, db::DatabaseOptions::default()).await?;
        db::test_connection(&pool).await?;

        let users = Arc::new(UserStore::new(pool).await?);
        let auth = Arc::new(AuthService::new(users, config.token.clone()));

        Ok(Self {
            config: Arc::new(config),
            auth,
        })
    }
}

/// Authenticated caller attached to media requests by the authorizing
/// middleware.
#[derive(Debug, Clone)]
pub struct Identity {
    pub username: String,
}

/// Request trace id attached by the tracing middleware.
#[derive(Debug, Clone)]
pub struct TraceId(pub String);
