/// Password Hashing and Verification
///
/// Passwords are hashed with Argon2id into PHC strings
/// (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`), so every stored hash
/// carries its own parameters and salt.

use argon2::{
    password_hash::{
        rand_core::OsRng, Error as PasswordHashError, PasswordHash, PasswordHasher,
        PasswordVerifier, SaltString,
    },
    Argon2,
};

use crate::error::PasswordError;

/// Hash a password with a fresh random salt
///
/// Any input is accepted, including the empty string.
///
/// # Errors
/// Returns `HashingFailed` only if the hasher itself fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Verify a password against a stored hash
///
/// Returns `Ok(false)` for a wrong password.
///
/// # Errors
/// Returns `MalformedHash` if `hash` is not a usable Argon2 PHC string
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::MalformedHash)?;
    if parsed.salt.is_none() || parsed.hash.is_none() {
        return Err(PasswordError::MalformedHash);
    }

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be used");
            Err(PasswordError::MalformedHash)
        }
    }
}
