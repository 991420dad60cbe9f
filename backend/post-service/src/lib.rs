/// Post Service Library
///
/// Social feed backend for Pinwall: posts with likes, saves and comments,
/// a follower feed and notifications, behind a JSON REST API.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `models`: Users, posts, follows, notifications and pagination
/// - `services`: Business logic layer
/// - `db`: Repository traits with PostgreSQL and in-memory backends
/// - `cache`: Optional Redis post cache
/// - `middleware`: Authentication, ownership checks and request metrics
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
/// - `state`: Shared application state
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
