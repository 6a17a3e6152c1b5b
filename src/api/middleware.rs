/// Request tracing and token-authorizing middleware
use crate::{
    auth::client::{AUTHORIZATION_HEADER, TRACE_ID_HEADER},
    context::{AppContext, Identity, TraceId},
    encoding,
    error::VaultError,
    uuid::Uuid,
};
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

/// Attach a trace id to the request and echo it on the response.
///
/// Reuses an incoming `X-Request-ID` header; otherwise a fresh
/// time-ordered id is generated and Base32-encoded.
pub async fn trace_id(mut req: Request, next: Next) -> Response {
    let trace = req
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| encoding::encode(Uuid::now_v7().as_bytes()));

    req.extensions_mut().insert(TraceId(trace.clone()));

    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&trace) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }

    response
}

/// Validate the caller's token and attach their identity.
///
/// Requests without an Authorization header are rejected as invalid
/// input. A rejected token is answered with NotFound so the media API
/// never confirms that an id exists to an unauthenticated caller.
pub async fn authorize(
    State(ctx): State<AppContext>,
    mut req: Request,
    next: Next,
) -> Result<Response, VaultError> {
    let token = req
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if token.is_empty() {
        return Err(VaultError::InvalidInput(
            "missing authorization header".to_string(),
        ));
    }

    let trace = req.extensions().get::<TraceId>().map(|t| t.0.clone());

    let username = ctx
        .auth_client
        .validate(&token, trace.as_deref())
        .await?
        .ok_or_else(|| {
            tracing::debug!("token rejected");
            VaultError::NotFound("media".to_string())
        })?;

    req.extensions_mut().insert(Identity { username });

    Ok(next.run(req).await)
}
