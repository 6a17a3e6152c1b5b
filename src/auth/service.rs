/// Authentication: registration, login, token issuance and validation
use crate::{
    error::{VaultError, VaultResult},
    users::UserStore,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Token issuance configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC secret for token signatures.
    pub secret: String,
    /// Validity duration of issued tokens in seconds.
    pub ttl_seconds: i64,
}

/// Signed token claims.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Authentication service over the user store.
pub struct AuthService {
    users: Arc<UserStore>,
    cfg: TokenConfig,
}

impl AuthService {
    pub fn new(users: Arc<UserStore>, cfg: TokenConfig) -> Self {
        Self { users, cfg }
    }

    /// Register a new user; Conflict when the username is taken.
    pub async fn register(&self, username: &str, password: &str) -> VaultResult<()> {
        let password_hash = hash_password(password);

        self.users.create_user(username, &password_hash).await?;

        tracing::debug!(username, "user registered");

        Ok(())
    }

    /// Authenticate a user and issue a signed token.
    pub async fn login(&self, username: &str, password: &str) -> VaultResult<String> {
        let user = match self.users.get_by_username(username).await {
            Ok(user) => user,
            // Same error for unknown user and wrong password
            Err(VaultError::NotFound(_)) => {
                return Err(VaultError::Unauthorized("invalid credentials".to_string()))
            }
            Err(e) => return Err(e),
        };

        if hash_password(password) != user.password_hash {
            return Err(VaultError::Unauthorized("invalid credentials".to_string()));
        }

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: username.to_string(),
            iat: now,
            exp: now + self.cfg.ttl_seconds,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.cfg.secret.as_bytes()),
        )
        .map_err(|e| VaultError::Internal(format!("sign token: {e}")))?;

        tracing::debug!(username, exp = claims.exp, "login successful");

        Ok(token)
    }

    /// Verify a token's signature and expiry; returns the username.
    pub fn validate(&self, token: &str) -> VaultResult<String> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.cfg.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| VaultError::InvalidToken(e.to_string()))?;

        Ok(data.claims.sub)
    }
}

fn hash_password(password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn test_service(ttl_seconds: i64) -> AuthService {
        let pool = db::create_memory_pool().await.unwrap();
        let users = Arc::new(UserStore::new(pool).await.unwrap());

        AuthService::new(
            users,
            TokenConfig {
                secret: "test-secret-test-secret-test-secret".to_string(),
                ttl_seconds,
            },
        )
    }

    #[tokio::test]
    async fn test_register_login_validate() {
        let service = test_service(3600).await;

        service.register("alice", "hunter2").await.unwrap();

        let token = service.login("alice", "hunter2").await.unwrap();
        assert_eq!(service.validate(&token).unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let service = test_service(3600).await;
        service.register("alice", "hunter2").await.unwrap();

        let err = service.login("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, VaultError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_unknown_user_rejected_like_wrong_password() {
        let service = test_service(3600).await;

        let err = service.login("nobody", "hunter2").await.unwrap_err();
        assert!(matches!(err, VaultError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let service = test_service(3600).await;
        service.register("alice", "hunter2").await.unwrap();

        let err = service.register("alice", "other").await.unwrap_err();
        assert!(matches!(err, VaultError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let service = test_service(3600).await;

        let err = service.validate("not-a-token").unwrap_err();
        assert!(matches!(err, VaultError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        // Tokens issued already past their expiry window
        let service = test_service(-120).await;
        service.register("alice", "hunter2").await.unwrap();

        let token = service.login("alice", "hunter2").await.unwrap();

        let err = service.validate(&token).unwrap_err();
        assert!(matches!(err, VaultError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_rejected() {
        let service = test_service(3600).await;
        let other = test_service(3600).await;

        other.register("alice", "hunter2").await.unwrap();
        let foreign_token = other.login("alice", "hunter2").await.unwrap();

        // Same secret in both test services, so tamper with the signature
        let mut tampered = foreign_token.clone();
        let flipped = if tampered.ends_with('A') { 'B' } else { 'A' };
        tampered.pop();
        tampered.push(flipped);

        assert!(service.validate(&tampered).is_err());
    }
}
