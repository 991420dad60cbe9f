/// Configuration management for Post Service
///
/// Loaded from environment variables (a `.env` file is honoured by `main`).
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    /// Post cache; `None` when `REDIS_URL` is unset
    pub cache: Option<CacheConfig>,
    pub media: MediaConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Cache (Redis) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub url: String,
    pub post_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory uploaded post images are written to
    pub upload_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let cors = {
            let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                Ok(value) => value,
                Err(_) if production => {
                    return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                }
                Err(_) => "http://localhost:3000".to_string(),
            };

            if production && allowed_origins.trim() == "*" {
                return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
            }

            CorsConfig { allowed_origins }
        };

        let backend = match std::env::var("STORAGE_BACKEND") {
            Ok(value) => parse_storage_backend(&value)?,
            Err(_) => StorageBackend::Postgres,
        };

        if production && backend == StorageBackend::Memory {
            return Err("STORAGE_BACKEND=memory is not allowed in production".to_string());
        }

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("POST_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("POST_SERVICE_PORT", 8080)?,
            },
            cors,
            storage: StorageConfig { backend },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/pinwall".to_string()),
                max_connections: parse_env_or_default("DB_MAX_CONNECTIONS", 10)?,
                min_connections: parse_env_or_default("DB_MIN_CONNECTIONS", 2)?,
            },
            cache: match std::env::var("REDIS_URL") {
                Ok(url) if !url.trim().is_empty() => Some(CacheConfig {
                    url,
                    post_ttl_secs: parse_env_or_default("POST_CACHE_TTL_SECS", 300)?,
                }),
                _ => None,
            },
            media: MediaConfig {
                upload_dir: std::env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./uploads")),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

fn parse_storage_backend(value: &str) -> Result<StorageBackend, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
        "memory" => Ok(StorageBackend::Memory),
        other => Err(format!("Unknown STORAGE_BACKEND '{}'", other)),
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
