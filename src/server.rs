/// HTTP server setup and routing
use crate::{
    api,
    config::HttpConfig,
    context::{AppContext, AuthContext},
    error::{VaultError, VaultResult},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Build the image service router.
///
/// Media routes sit behind the token-authorizing middleware; the health
/// endpoint stays open.
pub fn image_router(ctx: AppContext) -> Router {
    let protected = api::media_routes().route_layer(middleware::from_fn_with_state(
        ctx.clone(),
        api::middleware::authorize,
    ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .with_state(ctx.clone())
        .layer(middleware::from_fn(api::middleware::trace_id))
        .layer(cors_layer())
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            ctx.config.http.request_timeout,
        )))
        .layer(DefaultBodyLimit::max(ctx.config.http.body_limit))
        .fallback(not_found)
}

/// Build the auth service router.
pub fn auth_router(ctx: AuthContext) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(api::auth_routes())
        .with_state(ctx.clone())
        .layer(middleware::from_fn(api::middleware::trace_id))
        .layer(cors_layer())
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            ctx.config.http.request_timeout,
        )))
        .layer(DefaultBodyLimit::max(ctx.config.http.body_limit))
        .fallback(not_found)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "NotFound",
            "message": "Endpoint not found"
        })),
    )
}

/// Start the image service.
pub async fn serve_image(ctx: AppContext) -> VaultResult<()> {
    let http = ctx.config.http.clone();
    let app = image_router(ctx);

    serve(app, &http, "image service").await
}

/// Start the auth service.
pub async fn serve_auth(ctx: AuthContext) -> VaultResult<()> {
    let http = ctx.config.http.clone();
    let app = auth_router(ctx);

    serve(app, &http, "auth service").await
}

async fn serve(app: Router, http: &HttpConfig, name: &str) -> VaultResult<()> {
    let addr = format!("{}:{}", http.hostname, http.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| VaultError::Internal(format!("failed to bind to {addr}: {e}")))?;

    info!("{name} listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| VaultError::Internal(format!("server error: {e}")))?;

    Ok(())
}
