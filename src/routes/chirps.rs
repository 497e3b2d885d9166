/// Chirp Routes
///
/// Reading is public. Posting and deleting need a bearer access token, and
/// only the author may delete a chirp.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthService;
use crate::chirps::{clean_body, ChirpStore, SortOrder};
use crate::error::{AppError, ErrorContext, ValidationError};
use crate::logger::RequestId;

#[derive(Deserialize)]
pub struct CreateChirpRequest {
    pub body: String,
}

#[derive(Deserialize)]
pub struct ListChirpsQuery {
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub sort: SortOrder,
}

fn parse_chirp_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|_| ValidationError::InvalidFormat("chirp id".to_string()).into())
}

/// POST /api/chirps
///
/// # Errors
/// - 401: missing or invalid access token
/// - 400: empty body or longer than 140 characters
pub async fn create_chirp(
    req: HttpRequest,
    form: web::Json<CreateChirpRequest>,
    auth: web::Data<AuthService>,
    chirps: web::Data<dyn ChirpStore>,
) -> Result<HttpResponse, AppError> {
    let user_id = auth.authorize(req.headers())?;
    let body = clean_body(&form.body)?;

    let chirp = chirps.create(user_id, &body).await?;
    tracing::info!(user_id = %user_id, chirp_id = %chirp.id, "Chirp created");

    Ok(HttpResponse::Created().json(chirp))
}

/// GET /api/chirps?author_id=<uuid>&sort=asc|desc
pub async fn list_chirps(
    query: web::Query<ListChirpsQuery>,
    chirps: web::Data<dyn ChirpStore>,
) -> Result<HttpResponse, AppError> {
    let chirps = chirps.list(query.author_id, query.sort).await?;

    Ok(HttpResponse::Ok().json(chirps))
}

/// GET /api/chirps/{chirp_id}
///
/// # Errors
/// - 400: the id is not a UUID
/// - 404: no such chirp
pub async fn get_chirp(
    path: web::Path<String>,
    chirps: web::Data<dyn ChirpStore>,
) -> Result<HttpResponse, AppError> {
    let chirp_id = parse_chirp_id(&path)?;
    let chirp = chirps.get(chirp_id).await?;

    Ok(HttpResponse::Ok().json(chirp))
}

/// DELETE /api/chirps/{chirp_id}
///
/// # Errors
/// - 400: the id is not a UUID
/// - 401: missing or invalid access token
/// - 403: the caller is not the author
/// - 404: no such chirp
pub async fn delete_chirp(
    req: HttpRequest,
    path: web::Path<String>,
    auth: web::Data<AuthService>,
    chirps: web::Data<dyn ChirpStore>,
    request_id: RequestId,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new(&request_id, "delete_chirp");
    let chirp_id = parse_chirp_id(&path)?;
    let user_id = auth.authorize(req.headers())?;

    let chirp = chirps.get(chirp_id).await?;
    if chirp.user_id != user_id {
        tracing::warn!(
            request_id = %context.request_id,
            user_id = %user_id,
            chirp_id = %chirp_id,
            "Attempt to delete another user's chirp"
        );
        return Err(AppError::Forbidden(
            "You can only delete your own chirps".to_string(),
        ));
    }

    chirps.delete(chirp_id).await?;
    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        chirp_id = %chirp_id,
        "Chirp deleted"
    );

    Ok(HttpResponse::NoContent().finish())
}
