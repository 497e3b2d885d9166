/// Credential Extraction
///
/// Pulls bearer tokens and static API keys out of the `Authorization` header.
/// Scheme keywords are matched case-sensitively.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use std::fmt;

use crate::error::CredentialError;

/// Authorization schemes understood by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    ApiKey,
}

impl AuthScheme {
    fn prefix(self) -> &'static str {
        match self {
            AuthScheme::Bearer => "Bearer ",
            AuthScheme::ApiKey => "ApiKey ",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScheme::Bearer => write!(f, "Bearer"),
            AuthScheme::ApiKey => write!(f, "ApiKey"),
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<String, CredentialError> {
    credential(headers, AuthScheme::Bearer)
}

/// Extract the key from `Authorization: ApiKey <key>`.
pub fn api_key(headers: &HeaderMap) -> Result<String, CredentialError> {
    credential(headers, AuthScheme::ApiKey)
}

fn credential(headers: &HeaderMap, scheme: AuthScheme) -> Result<String, CredentialError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(CredentialError::MissingHeader(scheme))?
        .to_str()
        .map_err(|_| CredentialError::MalformedHeader(scheme))?
        .trim_start();

    let token = value
        .strip_prefix(scheme.prefix())
        .ok_or(CredentialError::MalformedHeader(scheme))?
        .trim();

    if token.is_empty() {
        return Err(CredentialError::MalformedHeader(scheme));
    }

    Ok(token.to_string())
}
