/// Authentication Service
///
/// Login, refresh and revoke flows, plus request authorization.
///
/// Every refusal is reported as `AppError::Auth`, which renders as the same
/// 401 response whatever the underlying reason was. The reason is only logged.

use actix_web::http::header::HeaderMap;
use chrono::{Duration, Utc};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::auth::credentials::{api_key, bearer_token};
use crate::auth::jwt::{generate_access_token, validate_access_token};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::refresh_token::{RefreshTokenStore, TokenState};
use crate::configuration::{JwtSettings, PolkaSettings};
use crate::error::{AppError, AuthError, DatabaseError, PasswordError, ValidationError};
use crate::users::{UserProfile, UserStore};

/// Access tokens are valid for one hour
pub fn access_token_ttl() -> Duration {
    Duration::hours(1)
}

/// Tokens handed out by a successful login
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    jwt_secret: Arc<[u8]>,
    api_key: Arc<str>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        jwt: &JwtSettings,
        polka: &PolkaSettings,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            jwt_secret: Arc::from(jwt.secret.as_bytes()),
            api_key: Arc::from(polka.api_key.as_str()),
        }
    }

    /// Create an account, storing only the password hash.
    ///
    /// # Errors
    /// - `Validation`: empty email or password
    /// - `Database(UniqueConstraintViolation)`: the email is already taken
    pub async fn register(&self, email: &str, password: &str) -> Result<UserProfile, AppError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ValidationError::EmptyField("email".to_string()).into());
        }
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password".to_string()).into());
        }

        let hashed_password = hash_password(password)?;
        let user = self.users.create(email, &hashed_password).await?;

        Ok(user.profile())
    }

    /// Check email and password, then hand out an access and a refresh token.
    ///
    /// Unknown email, wrong password and a corrupt stored hash are
    /// indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::info!("Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        match verify_password(password, &user.hashed_password) {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(user_id = %user.id, "Login attempt with wrong password");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(PasswordError::MalformedHash) => {
                tracing::error!(user_id = %user.id, "Stored password hash is malformed");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e.into()),
        }

        let access_token = generate_access_token(&user.id, &self.jwt_secret, access_token_ttl())?;
        let refresh_token = self.refresh_tokens.issue(user.id).await?;

        Ok(Session {
            access_token,
            refresh_token,
            user: user.profile(),
        })
    }

    /// Exchange the bearer refresh token for a new access token.
    ///
    /// The refresh token is left untouched and can be used again.
    pub async fn refresh(&self, headers: &HeaderMap) -> Result<String, AppError> {
        let token = bearer_token(headers)?;

        let record = match self.refresh_tokens.lookup(&token).await {
            Ok(record) => record,
            Err(DatabaseError::NotFound(_)) => {
                tracing::warn!("Refresh token not found");
                return Err(AuthError::TokenInvalid.into());
            }
            Err(e) => return Err(e.into()),
        };

        match record.state(Utc::now()) {
            TokenState::Active => {}
            TokenState::Expired => {
                tracing::info!(user_id = %record.user_id, "Refresh token expired");
                return Err(AuthError::TokenExpired.into());
            }
            TokenState::Revoked => {
                tracing::warn!(user_id = %record.user_id, "Attempt to use revoked refresh token");
                return Err(AuthError::TokenRevoked.into());
            }
        }

        let access_token =
            generate_access_token(&record.user_id, &self.jwt_secret, access_token_ttl())?;
        Ok(access_token)
    }

    /// Revoke the bearer refresh token.
    ///
    /// Succeeds whether or not the token exists, so the response does not
    /// reveal which tokens are valid.
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let token = bearer_token(headers)?;

        match self.refresh_tokens.revoke(&token).await {
            Ok(()) => Ok(()),
            Err(DatabaseError::NotFound(_)) => {
                tracing::debug!("Revoke requested for unknown refresh token");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Revoke every session of `user_id`
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AppError> {
        Ok(self.refresh_tokens.revoke_all_for_user(user_id).await?)
    }

    /// Identify the caller from the bearer access token
    pub fn authorize(&self, headers: &HeaderMap) -> Result<Uuid, AppError> {
        let token = bearer_token(headers)?;
        Ok(validate_access_token(&token, &self.jwt_secret)?)
    }

    /// Check the `ApiKey` header against the configured webhook key
    pub fn authorize_api_key(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let key = api_key(headers)?;

        if bool::from(key.as_bytes().ct_eq(self.api_key.as_bytes())) {
            Ok(())
        } else {
            Err(AuthError::InvalidApiKey.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::validate_access_token_claims;
    use crate::auth::password::hash_password;
    use crate::auth::refresh_token::InMemoryRefreshTokenStore;
    use crate::users::{InMemoryUserStore, User};
    use actix_web::http::header::{HeaderValue, AUTHORIZATION};

    const SECRET: &str = "test-secret";
    const API_KEY: &str = "polka-key";

    struct TestContext {
        service: AuthService,
        users: Arc<InMemoryUserStore>,
        refresh_tokens: Arc<InMemoryRefreshTokenStore>,
        user: User,
    }

    async fn setup_with_lifetime(lifetime: Duration) -> TestContext {
        let users = Arc::new(InMemoryUserStore::new());
        let refresh_tokens = Arc::new(InMemoryRefreshTokenStore::new(lifetime));
        let user = User::new("a@b.com", hash_password("pw").unwrap());
        users.insert(user.clone()).await;

        let jwt = JwtSettings {
            secret: SECRET.to_string(),
            refresh_token_expiry: lifetime.num_seconds(),
        };
        let polka = PolkaSettings {
            api_key: API_KEY.to_string(),
        };
        let service = AuthService::new(users.clone(), refresh_tokens.clone(), &jwt, &polka);

        TestContext {
            service,
            users,
            refresh_tokens,
            user,
        }
    }

    async fn setup() -> TestContext {
        setup_with_lifetime(Duration::days(60)).await
    }

    fn authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn bearer(token: &str) -> HeaderMap {
        authorization(&format!("Bearer {}", token))
    }

    fn assert_unauthorized<T: std::fmt::Debug>(result: Result<T, AppError>) {
        assert!(
            matches!(result, Err(AppError::Auth(_))),
            "Expected unauthorized, got {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let ctx = setup().await;

        let profile = ctx
            .service
            .register(" new@b.com ", "hunter2")
            .await
            .expect("Registration failed");
        assert_eq!(profile.email, "new@b.com");

        let stored = ctx.users.get(profile.id).await.unwrap();
        assert_ne!(stored.hashed_password, "hunter2");

        let session = ctx.service.login("new@b.com", "hunter2").await.unwrap();
        assert_eq!(session.user.id, profile.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let ctx = setup().await;

        let result = ctx.service.register("a@b.com", "other").await;

        assert!(matches!(
            result,
            Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_)))
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_empty_fields() {
        let ctx = setup().await;

        assert!(matches!(
            ctx.service.register("  ", "pw").await,
            Err(AppError::Validation(ValidationError::EmptyField(_)))
        ));
        assert!(matches!(
            ctx.service.register("x@b.com", "").await,
            Err(AppError::Validation(ValidationError::EmptyField(_)))
        ));
    }

    #[tokio::test]
    async fn test_login_returns_tokens_and_profile() {
        let ctx = setup().await;

        let session = ctx.service.login("a@b.com", "pw").await.expect("Login failed");

        let claims = validate_access_token_claims(&session.access_token, SECRET.as_bytes())
            .expect("Access token should validate");
        assert_eq!(claims.user_id().unwrap(), ctx.user.id);
        assert_eq!(claims.exp - claims.iat, 3600);

        let record = ctx.refresh_tokens.lookup(&session.refresh_token).await.unwrap();
        assert_eq!(record.user_id, ctx.user.id);
        assert!(record.is_usable(Utc::now()));

        assert_eq!(session.user, ctx.user.profile());
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let ctx = setup().await;
        let corrupt = User::new("corrupt@b.com", "not-a-valid-hash");
        ctx.users.insert(corrupt).await;

        for (email, password) in [
            ("a@b.com", "wrong"),
            ("nobody@b.com", "pw"),
            ("corrupt@b.com", "pw"),
        ] {
            let result = ctx.service.login(email, password).await;
            assert!(
                matches!(result, Err(AppError::Auth(AuthError::InvalidCredentials))),
                "Expected invalid credentials for {}",
                email
            );
        }
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_independent() {
        let ctx = setup().await;

        let first = ctx.service.login("a@b.com", "pw").await.unwrap();
        let second = ctx.service.login("a@b.com", "pw").await.unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        ctx.service.revoke(&bearer(&first.refresh_token)).await.unwrap();

        assert_unauthorized(ctx.service.refresh(&bearer(&first.refresh_token)).await);
        assert!(ctx.service.refresh(&bearer(&second.refresh_token)).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_mints_access_token_for_owner() {
        let ctx = setup().await;
        let session = ctx.service.login("a@b.com", "pw").await.unwrap();

        let access_token = ctx
            .service
            .refresh(&bearer(&session.refresh_token))
            .await
            .expect("Refresh failed");

        let claims = validate_access_token_claims(&access_token, SECRET.as_bytes()).unwrap();
        assert_eq!(claims.user_id().unwrap(), ctx.user.id);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_rotated() {
        let ctx = setup().await;
        let session = ctx.service.login("a@b.com", "pw").await.unwrap();
        let headers = bearer(&session.refresh_token);

        assert!(ctx.service.refresh(&headers).await.is_ok());
        assert!(ctx.service.refresh(&headers).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_then_refresh_is_unauthorized() {
        let ctx = setup().await;
        let session = ctx.service.login("a@b.com", "pw").await.unwrap();
        let headers = bearer(&session.refresh_token);

        ctx.service.revoke(&headers).await.expect("Revoke failed");

        let result = ctx.service.refresh(&headers).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::TokenRevoked))));
    }

    #[tokio::test]
    async fn test_refresh_with_expired_token() {
        let ctx = setup_with_lifetime(Duration::seconds(-1)).await;
        let session = ctx.service.login("a@b.com", "pw").await.unwrap();

        let record = ctx.refresh_tokens.lookup(&session.refresh_token).await.unwrap();
        assert!(record.revoked_at.is_none());

        let result = ctx.service.refresh(&bearer(&session.refresh_token)).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::TokenExpired))));
    }

    #[tokio::test]
    async fn test_refresh_with_unknown_token() {
        let ctx = setup().await;

        assert_unauthorized(ctx.service.refresh(&bearer("definitely_not_issued")).await);
    }

    #[tokio::test]
    async fn test_refresh_without_header() {
        let ctx = setup().await;

        assert_unauthorized(ctx.service.refresh(&HeaderMap::new()).await);
        assert_unauthorized(ctx.service.refresh(&authorization("abc")).await);
    }

    #[tokio::test]
    async fn test_revoke_unknown_token_succeeds() {
        let ctx = setup().await;

        assert!(ctx.service.revoke(&bearer("never_issued")).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_without_header_is_unauthorized() {
        let ctx = setup().await;

        assert_unauthorized(ctx.service.revoke(&HeaderMap::new()).await);
        assert_unauthorized(ctx.service.revoke(&authorization("Bearer   ")).await);
    }

    #[tokio::test]
    async fn test_revoke_all_ends_every_session() {
        let ctx = setup().await;
        let first = ctx.service.login("a@b.com", "pw").await.unwrap();
        let second = ctx.service.login("a@b.com", "pw").await.unwrap();

        assert_eq!(ctx.service.revoke_all(ctx.user.id).await.unwrap(), 2);

        assert_unauthorized(ctx.service.refresh(&bearer(&first.refresh_token)).await);
        assert_unauthorized(ctx.service.refresh(&bearer(&second.refresh_token)).await);
    }

    #[tokio::test]
    async fn test_authorize_with_access_token() {
        let ctx = setup().await;
        let session = ctx.service.login("a@b.com", "pw").await.unwrap();

        let user_id = ctx
            .service
            .authorize(&bearer(&session.access_token))
            .expect("Authorize failed");
        assert_eq!(user_id, ctx.user.id);
    }

    #[tokio::test]
    async fn test_authorize_rejects_foreign_and_expired_tokens() {
        let ctx = setup().await;
        let foreign = generate_access_token(&ctx.user.id, b"other-secret", access_token_ttl())
            .unwrap();
        let expired =
            generate_access_token(&ctx.user.id, SECRET.as_bytes(), Duration::hours(-1)).unwrap();

        assert_unauthorized(ctx.service.authorize(&bearer(&foreign)));
        assert_unauthorized(ctx.service.authorize(&bearer(&expired)));
        assert_unauthorized(ctx.service.authorize(&HeaderMap::new()));
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let ctx = setup().await;
        let session = ctx.service.login("a@b.com", "pw").await.unwrap();

        assert_unauthorized(ctx.service.authorize(&bearer(&session.refresh_token)));
    }

    #[tokio::test]
    async fn test_authorize_api_key() {
        let ctx = setup().await;

        assert!(ctx
            .service
            .authorize_api_key(&authorization("ApiKey polka-key"))
            .is_ok());
        assert_unauthorized(ctx.service.authorize_api_key(&authorization("ApiKey wrong")));
        assert_unauthorized(ctx.service.authorize_api_key(&authorization("Bearer polka-key")));
        assert_unauthorized(ctx.service.authorize_api_key(&HeaderMap::new()));
    }
}
