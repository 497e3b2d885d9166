/// Authentication Routes
///
/// Login, access token refresh, refresh token revocation and the
/// authenticated caller's identity.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AuthService, Session};
use crate::error::{AppError, ErrorContext};
use crate::logger::RequestId;
use crate::middleware::AuthenticatedUser;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public profile plus both tokens
#[derive(Serialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub is_chirpy_red: bool,
    pub token: String,
    pub refresh_token: String,
}

impl From<Session> for LoginResponse {
    fn from(session: Session) -> Self {
        Self {
            id: session.user.id,
            created_at: session.user.created_at,
            updated_at: session.user.updated_at,
            email: session.user.email,
            is_chirpy_red: session.user.is_chirpy_red,
            token: session.access_token,
            refresh_token: session.refresh_token,
        }
    }
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Serialize)]
pub struct CurrentUserResponse {
    pub id: Uuid,
}

/// POST /api/login
///
/// # Errors
/// - 401: unknown email or wrong password (indistinguishable)
/// - 500: storage or signing failure
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new(&request_id, "user_login");

    let session = auth.login(&form.email, &form.password).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %session.user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(LoginResponse::from(session)))
}

/// POST /api/refresh
///
/// Expects `Authorization: Bearer <refresh_token>`. The refresh token stays
/// valid; only a new access token is returned.
///
/// # Errors
/// - 401: missing, unknown, expired or revoked refresh token
pub async fn refresh(
    req: HttpRequest,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let token = auth.refresh(req.headers()).await?;

    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

/// POST /api/revoke
///
/// Expects `Authorization: Bearer <refresh_token>`. Answers 204 whether or
/// not the token existed.
///
/// # Errors
/// - 401: missing or malformed authorization header
pub async fn revoke(
    req: HttpRequest,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    auth.revoke(req.headers()).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/revoke_all
///
/// **Requires valid JWT access token.** Ends every session of the caller.
pub async fn revoke_all(
    user: web::ReqData<AuthenticatedUser>,
    auth: web::Data<AuthService>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new(&request_id, "revoke_all_sessions");
    let AuthenticatedUser(user_id) = user.into_inner();

    let revoked = auth.revoke_all(user_id).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %user_id,
        revoked = revoked,
        "All sessions revoked"
    );

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/me
///
/// **Requires valid JWT access token.**
pub async fn get_current_user(user: web::ReqData<AuthenticatedUser>) -> HttpResponse {
    let AuthenticatedUser(id) = user.into_inner();
    HttpResponse::Ok().json(CurrentUserResponse { id })
}
