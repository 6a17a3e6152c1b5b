/// MediaVault auth service
///
/// User registration, login and token validation backed by a SQLite user
/// store.
use mediavault::{config::AuthServerConfig, context::AuthContext, error::VaultResult, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> VaultResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediavault=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AuthServerConfig::from_env()?;
    let ctx = AuthContext::new(config).await?;

    server::serve_auth(ctx).await
}
