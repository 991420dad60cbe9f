/// Password hashing and verification using Argon2id
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use thiserror::Error;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters")]
    InvalidLength,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Hash a password using Argon2id
/// Returns the PHC string suitable for storage in the database
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
        return Err(PasswordError::InvalidLength);
    }

    let salt = SaltString::generate(rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::Hashing(e.to_string()))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| PasswordError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
    }

    #[test]
    fn test_wrong_password() {
        let hash = hash_password("correct horse").unwrap();
        assert_eq!(
            verify_password("battery staple", &hash),
            Err(PasswordError::InvalidCredentials)
        );
    }

    #[test]
    fn test_too_short() {
        assert_eq!(hash_password("short"), Err(PasswordError::InvalidLength));
    }

    #[test]
    fn test_malformed_hash() {
        assert!(matches!(
            verify_password("whatever1", "not-a-phc-string"),
            Err(PasswordError::Hashing(_))
        ));
    }
}
