/// Authentication module
///
/// Password hashing, access token minting/validation, credential extraction
/// from request headers, the refresh token store, and the flows built on them.

mod claims;
mod credentials;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use claims::Claims;
pub use credentials::{api_key, bearer_token, AuthScheme};
pub use jwt::{generate_access_token, validate_access_token, validate_access_token_claims, ISSUER};
pub use password::{hash_password, verify_password};
pub use refresh_token::{
    generate_refresh_token, InMemoryRefreshTokenStore, PgRefreshTokenStore, RefreshToken,
    RefreshTokenStore, TokenState,
};
pub use service::{access_token_ttl, AuthService, Session};
