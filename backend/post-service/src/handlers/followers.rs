use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::PaginationParams;
use crate::state::AppState;

/// PUT /api/followers/{user_id}
pub async fn toggle_follow(
    state: web::Data<AppState>,
    user: AuthUser,
    target: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let toggle = state
        .follow_service()
        .toggle_follow(user.id, target.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(toggle))
}

/// GET /api/followers/{user_id}/following
pub async fn get_following(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let pagination = query.resolve()?;
    let page = state
        .follow_service()
        .following(user_id.into_inner(), pagination)
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/followers/{user_id}/followers
pub async fn get_followers(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let pagination = query.resolve()?;
    let page = state
        .follow_service()
        .followers(user_id.into_inner(), pagination)
        .await?;
    Ok(HttpResponse::Ok().json(page))
}
