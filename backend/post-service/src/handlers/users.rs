use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 30, message = "username must be 3-30 characters"))]
    pub username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "password must be 8-128 characters"))]
    pub password: String,
}

impl RegisterRequest {
    /// Length rules apply to the name as it will be stored
    fn trimmed(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// POST /api/users/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let req = body.into_inner().trimmed();
    req.validate()?;

    let response = state
        .user_service()
        .register(req.username, req.email, req.password)
        .await?;

    Ok(HttpResponse::Created().json(response))
}

/// POST /api/users/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let req = body.into_inner();

    let response = state.user_service().login(&req.email, req.password).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/users/me
pub async fn get_me(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let me = state.user_service().get_user(user.id).await?;
    Ok(HttpResponse::Ok().json(me))
}

/// GET /api/users/{user_id}
pub async fn get_profile(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let profile = state.user_service().profile(user_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}
