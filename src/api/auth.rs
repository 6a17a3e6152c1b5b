/// Registration, login and token-validation endpoints
use crate::{
    auth::client::AUTHORIZATION_HEADER,
    context::AuthContext,
    error::{VaultError, VaultResult},
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Form, Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    username: Option<String>,
    password: Option<String>,
}

impl Credentials {
    fn unpack(self) -> VaultResult<(String, String)> {
        let username = self
            .username
            .filter(|u| !u.is_empty())
            .ok_or_else(|| VaultError::InvalidInput("missing username".to_string()))?;

        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| VaultError::InvalidInput("missing password".to_string()))?;

        Ok((username, password))
    }
}

/// Response carrying a freshly issued token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Register a new user.
pub async fn register(
    State(ctx): State<AuthContext>,
    Form(credentials): Form<Credentials>,
) -> VaultResult<StatusCode> {
    let (username, password) = credentials.unpack()?;

    ctx.auth.register(&username, &password).await?;

    Ok(StatusCode::OK)
}

/// Authenticate and issue a token.
pub async fn login(
    State(ctx): State<AuthContext>,
    Form(credentials): Form<Credentials>,
) -> VaultResult<Json<TokenResponse>> {
    let (username, password) = credentials.unpack()?;

    let token = ctx.auth.login(&username, &password).await?;

    Ok(Json(TokenResponse { token }))
}

/// Validate a token; 200 with the username as plain text body.
///
/// The token travels in the Authorization header; a `Bearer ` prefix is
/// accepted and stripped.
pub async fn validate(
    State(ctx): State<AuthContext>,
    headers: HeaderMap,
) -> VaultResult<String> {
    let header = headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if header.is_empty() {
        return Err(VaultError::InvalidInput("no auth token".to_string()));
    }

    let token = header.strip_prefix("Bearer").unwrap_or(header).trim();

    let username = ctx.auth.validate(token)?;

    Ok(username)
}
