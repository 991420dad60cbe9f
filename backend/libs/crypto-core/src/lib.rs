//! Shared security primitives for Pinwall services.
//!
//! - `jwt`: RS256 access tokens carrying the caller's id and role
//! - `password`: Argon2id hashing for stored credentials
//! - `hash`: content digests and entity tags for served media

pub mod hash;
pub mod jwt;
pub mod password;

pub use password::{hash_password, verify_password, PasswordError};
