/// API routes and handlers
pub mod auth;
pub mod media;
pub mod middleware;

use crate::context::{AppContext, AuthContext};
use axum::{
    routing::{get, post},
    Router,
};

/// Media routes of the image service; callers attach the authorizing
/// middleware before serving these.
pub fn media_routes() -> Router<AppContext> {
    Router::new()
        .route("/media", post(media::upload))
        .route(
            "/media/:media_id",
            get(media::download).delete(media::remove),
        )
}

/// Routes of the auth service.
pub fn auth_routes() -> Router<AuthContext> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/validate", post(auth::validate))
}
