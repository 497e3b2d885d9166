use actix_web::{web, HttpResponse};

use crate::auth::RefreshTokenStore;
use crate::chirps::ChirpStore;
use crate::configuration::ApplicationSettings;
use crate::error::AppError;
use crate::metrics::HitCounter;
use crate::users::UserStore;

/// GET /admin/metrics
pub async fn metrics(counter: web::Data<HitCounter>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(format!("Hits: {}\n", counter.hits()))
}

/// POST /admin/reset
///
/// Development only: wipes every refresh token, chirp and user, and zeroes
/// the hit counter.
pub async fn reset(
    application: web::Data<ApplicationSettings>,
    users: web::Data<dyn UserStore>,
    refresh_tokens: web::Data<dyn RefreshTokenStore>,
    chirps: web::Data<dyn ChirpStore>,
    counter: web::Data<HitCounter>,
) -> Result<HttpResponse, AppError> {
    if !application.is_dev() {
        return Err(AppError::Forbidden("reset is only allowed in dev".to_string()));
    }

    let tokens = refresh_tokens.delete_all().await?;
    let removed_chirps = chirps.delete_all().await?;
    let removed = users.delete_all().await?;
    counter.reset();
    tracing::warn!(
        users = removed,
        chirps = removed_chirps,
        refresh_tokens = tokens,
        "Accounts reset"
    );

    Ok(HttpResponse::Ok().body("Users reset to 0"))
}
