/// User service - registration, login and profiles
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{FollowRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::{NewUser, Role, User, UserProfile};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Body returned by register and login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
}

fn issue(user: User) -> Result<AuthResponse> {
    let token = crypto_core::jwt::issue_token(user.id, &user.username, user.role.as_str())?;
    Ok(AuthResponse {
        user,
        token: token.access_token,
        token_type: token.token_type,
        expires_in: token.expires_in,
    })
}

/// Argon2 is CPU bound; keep it off the async workers
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, crypto_core::PasswordError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("password task failed: {}", e)))?
        .map_err(AppError::from)
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, follows: Arc<dyn FollowRepository>) -> Self {
        Self { users, follows }
    }

    pub async fn register(
        &self,
        username: String,
        email: String,
        password: String,
    ) -> Result<AuthResponse> {
        let password_hash = run_blocking(move || crypto_core::hash_password(&password)).await?;

        let user = self
            .users
            .create_user(NewUser {
                username,
                email: email.trim().to_lowercase(),
                password_hash,
                role: Role::User,
            })
            .await?;

        tracing::info!(user_id = %user.id, "user registered");
        issue(user)
    }

    /// Unknown email and wrong password produce the same 401
    pub async fn login(&self, email: &str, password: String) -> Result<AuthResponse> {
        let user = self
            .users
            .find_user_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        let hash = user.password_hash.clone();
        run_blocking(move || crypto_core::verify_password(&password, &hash)).await?;

        tracing::info!(user_id = %user.id, "user logged in");
        issue(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        self.users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile> {
        let user = self.get_user(user_id).await?;
        let (followers_count, following_count) = self.follows.follow_counts(user_id).await?;

        Ok(UserProfile {
            user,
            followers_count,
            following_count,
        })
    }
}
