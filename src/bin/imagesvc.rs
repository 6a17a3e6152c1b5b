/// MediaVault image service
///
/// Authenticated media upload, download and delete with on-demand image
/// derivatives over a content-addressed blob store.
use mediavault::{config::ImageServerConfig, context::AppContext, error::VaultResult, server};
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

    let config = ImageServerConfig::from_env()?;
    let ctx = AppContext::new(config)?;

    server::serve_image(ctx).await
}
