use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::PaginationParams;
use crate::state::AppState;

/// GET /api/notifications
pub async fn list_notifications(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let pagination = query.resolve()?;
    let (notifications, unread) = state
        .notification_service()
        .list(user.id, pagination)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "notifications": notifications,
        "unread": unread,
    })))
}

/// PUT /api/notifications/{notification_id}/read
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthUser,
    notification_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let notification = state
        .notification_service()
        .mark_read(notification_id.into_inner(), user.id)
        .await?;
    Ok(HttpResponse::Ok().json(notification))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let updated = state.notification_service().mark_all_read(user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}

/// DELETE /api/notifications/{notification_id}
pub async fn delete_notification(
    state: web::Data<AppState>,
    user: AuthUser,
    notification_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state
        .notification_service()
        .delete(notification_id.into_inner(), user.id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
