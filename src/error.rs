/// Error Handling Module
///
/// Every fallible operation in the service reports a closed set of error kinds:
/// 1. Component errors (password hashing, token signing, header parsing)
/// 2. Storage errors shared by the user and refresh-token stores
/// 3. Authentication errors, all rendered to clients as one uniform 401
/// 4. The unified `AppError` that maps onto HTTP responses

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::auth::AuthScheme;
use crate::logger::RequestId;

/// ============================================================================
/// 1. COMPONENT ERRORS
/// ============================================================================

/// Password hashing and verification errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// The stored hash is not a parseable self-describing hash string
    MalformedHash,
    HashingFailed(String),
}

impl fmt::Display for PasswordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordError::MalformedHash => write!(f, "stored password hash is malformed"),
            PasswordError::HashingFailed(msg) => write!(f, "password hashing failed: {}", msg),
        }
    }
}

impl StdError for PasswordError {}

/// Access token errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    InvalidSignature,
    Expired,
    Signing(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "token is malformed"),
            TokenError::InvalidSignature => write!(f, "token signature is invalid"),
            TokenError::Expired => write!(f, "token has expired"),
            TokenError::Signing(msg) => write!(f, "token signing failed: {}", msg),
        }
    }
}

impl StdError for TokenError {}

/// Authorization header errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    MissingHeader(AuthScheme),
    MalformedHeader(AuthScheme),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::MissingHeader(scheme) => {
                write!(f, "missing authorization header ({})", scheme)
            }
            CredentialError::MalformedHeader(scheme) => {
                write!(f, "malformed authorization header, expected {}", scheme)
            }
        }
    }
}

impl StdError for CredentialError {}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooLong(String, usize),
    InvalidFormat(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

impl StdError for ValidationError {}

/// ============================================================================
/// 2. STORAGE ERRORS
/// ============================================================================

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    NotFound(String),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Postgres SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DatabaseError::ConnectionPool(err.to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                DatabaseError::ConnectionPool(err.to_string())
            }
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                DatabaseError::UniqueConstraintViolation(db.message().to_string())
            }
            sqlx::Error::Database(_) => DatabaseError::QueryExecution(err.to_string()),
            _ => DatabaseError::UnexpectedError(err.to_string()),
        }
    }
}

/// Configuration errors, fatal at startup
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// ============================================================================
/// 3. AUTHENTICATION ERRORS
/// ============================================================================

/// Reasons a request was refused. Clients only ever see a single
/// "unauthorized" outcome; the variant is kept for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    MissingToken,
    TokenInvalid,
    TokenExpired,
    TokenRevoked,
    InvalidApiKey,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenRevoked => write!(f, "Token has been revoked"),
            AuthError::InvalidApiKey => write!(f, "Invalid API key"),
        }
    }
}

impl StdError for AuthError {}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::MissingHeader(_) => AuthError::MissingToken,
            CredentialError::MalformedHeader(_) => AuthError::TokenInvalid,
        }
    }
}

/// ============================================================================
/// 4. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Database(DatabaseError),
    Auth(AuthError),
    Forbidden(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        AppError::Auth(err.into())
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Auth(AuthError::TokenExpired),
            TokenError::Malformed | TokenError::InvalidSignature => {
                AppError::Auth(AuthError::TokenInvalid)
            }
            TokenError::Signing(msg) => AppError::Internal(msg),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::MalformedHash => AppError::Auth(AuthError::InvalidCredentials),
            PasswordError::HashingFailed(msg) => AppError::Internal(msg),
        }
    }
}

// ============================================================================
// HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".to_string(),
                e.to_string(),
            ),

            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => (
                    StatusCode::CONFLICT,
                    "DUPLICATE_ENTRY".to_string(),
                    "Resource already exists".to_string(),
                ),
                DatabaseError::NotFound(_) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND".to_string(),
                    e.to_string(),
                ),
                DatabaseError::ConnectionPool(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE".to_string(),
                    "Database service temporarily unavailable".to_string(),
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR".to_string(),
                    "Database error occurred".to_string(),
                ),
            },

            // Never tell the caller which check failed
            AppError::Auth(_) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED".to_string(),
                "Unauthorized".to_string(),
            ),

            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN".to_string(),
                msg.clone(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
                "Internal server error".to_string(),
            ),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code,
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                tracing::warn!(request_id = request_id, error = %self, "Duplicate entry attempt");
            }
            AppError::Database(DatabaseError::NotFound(_)) => {
                tracing::info!(request_id = request_id, error = %self, "Record not found");
            }
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, reason = %e, "Unauthorized request");
            }
            AppError::Forbidden(msg) => {
                tracing::warn!(request_id = request_id, error = %msg, "Forbidden request");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl AppError {
    /// Log and render this error under the id of the request that caused it
    pub fn render(&self, request_id: &str) -> HttpResponse {
        self.log_error(request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, request_id);

        HttpResponse::build(status).json(error_response)
    }
}

/// Rendered without logging: `LoggerMiddleware` re-renders every `AppError`
/// through `AppError::render` with the request's own id.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
                DatabaseError::NotFound(_) => StatusCode::NOT_FOUND,
                DatabaseError::ConnectionPool(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// ERROR CONTEXT
// ============================================================================

/// Per-request context attached to flow logs
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(request_id: &RequestId, operation: impl Into<String>) -> Self {
        Self {
            request_id: request_id.as_str().to_string(),
            operation: operation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_auth_errors_render_the_same_response() {
        let reasons = [
            AuthError::InvalidCredentials,
            AuthError::MissingToken,
            AuthError::TokenInvalid,
            AuthError::TokenExpired,
            AuthError::TokenRevoked,
            AuthError::InvalidApiKey,
        ];

        for reason in reasons {
            let (status, body) =
                <AppError as ErrorHandler>::error_response(&AppError::Auth(reason), "req-1");
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body.code, "UNAUTHORIZED");
            assert_eq!(body.message, "Unauthorized");
        }
    }

    #[test]
    fn test_token_error_conversion() {
        assert!(matches!(
            AppError::from(TokenError::Expired),
            AppError::Auth(AuthError::TokenExpired)
        ));
        assert!(matches!(
            AppError::from(TokenError::InvalidSignature),
            AppError::Auth(AuthError::TokenInvalid)
        ));
        assert!(matches!(
            AppError::from(TokenError::Signing("boom".to_string())),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn test_malformed_hash_is_unauthorized() {
        assert!(matches!(
            AppError::from(PasswordError::MalformedHash),
            AppError::Auth(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_credential_error_conversion() {
        let missing: AuthError = CredentialError::MissingHeader(AuthScheme::Bearer).into();
        let malformed: AuthError = CredentialError::MalformedHeader(AuthScheme::ApiKey).into();

        assert_eq!(missing, AuthError::MissingToken);
        assert_eq!(malformed, AuthError::TokenInvalid);
    }

    #[test]
    fn test_sqlx_row_not_found_maps_to_not_found() {
        let err: DatabaseError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[test]
    fn test_not_found_status_code() {
        let err = AppError::Database(DatabaseError::NotFound("user".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_error_response_creation() {
        let response = ErrorResponse::new(
            "test-123".to_string(),
            "Test error".to_string(),
            "TEST_ERROR".to_string(),
            400,
        );

        assert_eq!(response.error_id, "test-123");
        assert_eq!(response.code, "TEST_ERROR");
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_error_context_carries_request_id() {
        let request_id = RequestId("req-42".to_string());
        let ctx = ErrorContext::new(&request_id, "user_login");

        assert_eq!(ctx.operation, "user_login");
        assert_eq!(ctx.request_id, "req-42");
    }

    #[test]
    fn test_render_uses_given_request_id() {
        let err = AppError::Auth(AuthError::TokenExpired);
        let response = err.render("req-7");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_duplicate_entry_is_conflict() {
        let err = AppError::Database(DatabaseError::UniqueConstraintViolation(
            "users_email_key".to_string(),
        ));

        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        let (_, body) = <AppError as ErrorHandler>::error_response(&err, "req-1");
        assert_eq!(body.code, "DUPLICATE_ENTRY");
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::TooLong("Chirp".to_string(), 140).to_string(),
            "Chirp is too long (maximum 140 characters)"
        );
        assert_eq!(
            ValidationError::EmptyField("email".to_string()).to_string(),
            "email is empty"
        );
    }
}
