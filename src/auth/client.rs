/// Token-validation client used by the image service
use crate::error::{VaultError, VaultResult};
use async_trait::async_trait;

pub const TRACE_ID_HEADER: &str = "X-Request-ID";
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Validates authentication tokens.
///
/// The only contract: a returned username is trustworthy and may be
/// attached to the request for downstream ownership checks. `Ok(None)`
/// means the token was rejected.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str, trace_id: Option<&str>) -> VaultResult<Option<String>>;
}

/// Configuration for the HTTP auth client.
#[derive(Debug, Clone)]
pub struct AuthClientConfig {
    /// Endpoint for token validation requests.
    pub auth_url: String,
}

/// TokenValidator over an HTTP POST to the auth service.
///
/// Sends the token in the Authorization header; a 200 response carries the
/// username as its body.
pub struct HttpAuthClient {
    http: reqwest::Client,
    cfg: AuthClientConfig,
}

impl HttpAuthClient {
    pub fn new(cfg: AuthClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            cfg,
        }
    }
}

#[async_trait]
impl TokenValidator for HttpAuthClient {
    async fn validate(&self, token: &str, trace_id: Option<&str>) -> VaultResult<Option<String>> {
        let mut request = self
            .http
            .post(&self.cfg.auth_url)
            .header(AUTHORIZATION_HEADER, token);

        if let Some(trace_id) = trace_id {
            request = request.header(TRACE_ID_HEADER, trace_id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VaultError::Internal(format!("validate request: {e}")))?;

        if response.status() != reqwest::StatusCode::OK {
            return Ok(None);
        }

        let username = response
            .text()
            .await
            .map_err(|e| VaultError::Internal(format!("read validate response: {e}")))?;

        Ok(Some(username))
    }
}

/// TokenValidator that validates against an in-process auth service.
///
/// Lets the image service run without a separate auth deployment when both
/// share one process (and keeps tests away from the network).
pub struct LocalAuthClient {
    auth: std::sync::Arc<crate::auth::AuthService>,
}

impl LocalAuthClient {
    pub fn new(auth: std::sync::Arc<crate::auth::AuthService>) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl TokenValidator for LocalAuthClient {
    async fn validate(&self, token: &str, _trace_id: Option<&str>) -> VaultResult<Option<String>> {
        match self.auth.validate(token) {
            Ok(username) => Ok(Some(username)),
            Err(VaultError::InvalidToken(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
