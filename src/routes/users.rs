use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::AuthService;
use crate::error::{AppError, ErrorContext};
use crate::logger::RequestId;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/users
///
/// Returns the new user's public profile.
///
/// # Errors
/// - 400: empty email or password
/// - 409: email already registered
pub async fn create_user(
    form: web::Json<CreateUserRequest>,
    auth: web::Data<AuthService>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new(&request_id, "user_registration");

    let profile = auth.register(&form.email, &form.password).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %profile.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(profile))
}
