/// Payment Provider Webhooks
///
/// Polka notifies the service when a user buys Chirpy Red.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthService;
use crate::error::{AppError, ValidationError};
use crate::users::UserStore;

const USER_UPGRADED: &str = "user.upgraded";

#[derive(Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookData,
}

#[derive(Deserialize)]
pub struct WebhookData {
    pub user_id: Uuid,
}

/// POST /api/polka/webhooks
///
/// The API key is checked before the body is even parsed.
///
/// # Errors
/// - 401: missing or wrong `ApiKey` authorization
/// - 400: body is not a webhook event
/// - 404: upgraded user does not exist
pub async fn polka_webhook(
    req: HttpRequest,
    body: web::Bytes,
    auth: web::Data<AuthService>,
    users: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    auth.authorize_api_key(req.headers())?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ValidationError::InvalidFormat(format!("webhook body ({})", e)))?;

    if event.event != USER_UPGRADED {
        tracing::debug!(event = %event.event, "Ignoring webhook event");
        return Ok(HttpResponse::NoContent().finish());
    }

    users.upgrade_to_red(event.data.user_id).await?;
    tracing::info!(user_id = %event.data.user_id, "User upgraded to Chirpy Red");

    Ok(HttpResponse::NoContent().finish())
}
