/// Shared JWT module for Pinwall services
///
/// Tokens are signed with RS256 only. Keys are loaded once at startup from
/// PEM strings and are immutable afterwards.
///
/// ## Usage
///
/// ```rust,no_run
/// use crypto_core::jwt;
///
/// let private_key = std::env::var("JWT_PRIVATE_KEY_PEM").unwrap();
/// let public_key = std::env::var("JWT_PUBLIC_KEY_PEM").unwrap();
///
/// jwt::initialize_jwt_keys(&private_key, &public_key).unwrap();
/// ```
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ACCESS_TOKEN_EXPIRY_HOURS: i64 = 24;
const ACCESS_TOKEN_TYPE: &str = "access";

const JWT_ALGORITHM: Algorithm = Algorithm::RS256;

/// JWT Claims structure - standard claims plus the caller's role
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token type, always "access" for tokens issued here
    pub token_type: String,
    pub username: String,
    /// Role name as stored on the user ("user", "admin", "root")
    pub role: String,
}

/// Token returned to clients after register/login
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

static JWT_ENCODING_KEY: OnceCell<EncodingKey> = OnceCell::new();
static JWT_DECODING_KEY: OnceCell<DecodingKey> = OnceCell::new();

/// Initialize JWT keys from PEM-formatted strings
///
/// Must be called once during startup before any token is issued or
/// validated. Subsequent calls return an error.
pub fn initialize_jwt_keys(private_key_pem: &str, public_key_pem: &str) -> Result<()> {
    let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
        .map_err(|e| anyhow!("Failed to parse RSA private key: {e}"))?;

    let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
        .map_err(|e| anyhow!("Failed to parse RSA public key: {e}"))?;

    JWT_ENCODING_KEY
        .set(encoding_key)
        .map_err(|_| anyhow!("JWT encoding key already initialized"))?;

    JWT_DECODING_KEY
        .set(decoding_key)
        .map_err(|_| anyhow!("JWT decoding key already initialized"))?;

    Ok(())
}

/// Initialize JWT keys for validation-only deployments
///
/// Instances started this way can authenticate requests but cannot issue
/// tokens; register/login will fail with a key error.
pub fn initialize_jwt_validation_only(public_key_pem: &str) -> Result<()> {
    let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
        .map_err(|e| anyhow!("Failed to parse RSA public key: {e}"))?;

    JWT_DECODING_KEY
        .set(decoding_key)
        .map_err(|_| anyhow!("JWT decoding key already initialized"))?;

    Ok(())
}

/// Whether a decoding key has been installed
pub fn is_initialized() -> bool {
    JWT_DECODING_KEY.get().is_some()
}

fn get_encoding_key() -> Result<&'static EncodingKey> {
    JWT_ENCODING_KEY.get().ok_or_else(|| {
        anyhow!("JWT signing key not initialized. Call initialize_jwt_keys() during startup.")
    })
}

fn get_decoding_key() -> Result<&'static DecodingKey> {
    JWT_DECODING_KEY
        .get()
        .ok_or_else(|| anyhow!("JWT keys not initialized. Call initialize_jwt_keys() or initialize_jwt_validation_only() during startup."))
}

/// Generate a new access token for a user
pub fn generate_access_token(user_id: Uuid, username: &str, role: &str) -> Result<String> {
    let now = Utc::now();
    let expiry = now + Duration::hours(ACCESS_TOKEN_EXPIRY_HOURS);

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: expiry.timestamp(),
        token_type: ACCESS_TOKEN_TYPE.to_string(),
        username: username.to_string(),
        role: role.to_string(),
    };

    let encoding_key = get_encoding_key()?;
    encode(&Header::new(JWT_ALGORITHM), &claims, encoding_key)
        .map_err(|e| anyhow!("Failed to generate access token: {e}"))
}

/// Generate an access token wrapped in the client-facing response shape
pub fn issue_token(user_id: Uuid, username: &str, role: &str) -> Result<TokenResponse> {
    Ok(TokenResponse {
        access_token: generate_access_token(user_id, username, role)?,
        token_type: "Bearer".to_string(),
        expires_in: ACCESS_TOKEN_EXPIRY_HOURS * 3600,
    })
}

/// Validate and decode a JWT token
///
/// Verifies the RS256 signature, expiry and that the token is an access
/// token. There is no fallback to other algorithms.
pub fn validate_token(token: &str) -> Result<TokenData<Claims>> {
    let decoding_key = get_decoding_key()?;

    let mut validation = Validation::new(JWT_ALGORITHM);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, decoding_key, &validation)
        .map_err(|e| anyhow!("Token validation failed: {e}"))?;

    if data.claims.token_type != ACCESS_TOKEN_TYPE {
        return Err(anyhow!(
            "Unexpected token type: {}",
            data.claims.token_type
        ));
    }

    Ok(data)
}

/// Extract user ID from a validated token
pub fn get_user_id_from_token(token: &str) -> Result<Uuid> {
    let token_data = validate_token(token)?;
    Uuid::parse_str(&token_data.claims.sub)
        .map_err(|e| anyhow!("Invalid user ID format in token: {e}"))
}
