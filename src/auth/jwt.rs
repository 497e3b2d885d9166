/// JWT Token Generation and Validation
///
/// Access tokens are compact HS256 JWS strings. They are never stored; the
/// server re-validates the signature and expiry on every request.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::error::TokenError;

pub const ISSUER: &str = "chirpy";

/// Mint a signed access token for `user_id`, valid for `ttl`
///
/// A zero or negative `ttl` is allowed and yields a token that is already
/// expired when validated.
///
/// # Errors
/// Returns `Signing` if the token cannot be encoded
pub fn generate_access_token(
    user_id: &Uuid,
    secret: &[u8],
    ttl: chrono::Duration,
) -> Result<String, TokenError> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims::new(*user_id, now, ttl, ISSUER);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Validate an access token and return its subject
///
/// # Errors
/// - `Malformed`: not a three-part token, undecodable, foreign issuer or bad subject
/// - `InvalidSignature`: signed with a different secret or tampered with
/// - `Expired`: the current time has reached `exp`
pub fn validate_access_token(token: &str, secret: &[u8]) -> Result<Uuid, TokenError> {
    validate_access_token_claims(token, secret)?.user_id()
}

/// Validate an access token and return all of its claims
pub fn validate_access_token_claims(token: &str, secret: &[u8]) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);
    // exp is checked below without leeway, `now >= exp` is already expired
    validation.validate_exp = false;
    validation.leeway = 0;

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("JWT validation error: {}", e);
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            }
        })?;

    if claims.is_expired_at(chrono::Utc::now().timestamp()) {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}
