/// HTTP handlers for post-service
///
/// [`configure`] mounts every route under `/api` together with the
/// extractor error handlers, so the binary and the integration tests build
/// the same app.
pub mod followers;
pub mod health;
pub mod media;
pub mod notifications;
pub mod posts;
pub mod users;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{web, HttpRequest};

use crate::error::AppError;
use crate::metrics::serve_metrics;
use crate::middleware::{JwtAuthMiddleware, MetricsMiddleware};

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid JSON body: {}", err)).into()
}

fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid path parameter: {}", err)).into()
}

fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid query string: {}", err)).into()
}

/// Reject blank text and return it trimmed
pub(crate) fn require_text(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .route("/metrics", web::get().to(serve_metrics))
        .route(
            "/uploads/{post_id}/{file_name}",
            web::get().to(media::serve_upload),
        )
        .service(
            web::scope("/api")
                .wrap(JwtAuthMiddleware)
                .wrap(MetricsMiddleware)
                .route("/health", web::get().to(health::health_summary))
                .route("/health/ready", web::get().to(health::readiness_summary))
                .route("/health/live", web::get().to(health::liveness_check))
                .service(
                    web::scope("/users")
                        .route("/register", web::post().to(users::register))
                        .route("/login", web::post().to(users::login))
                        .route("/me", web::get().to(users::get_me))
                        .route("/{user_id}", web::get().to(users::get_profile)),
                )
                .service(
                    web::scope("/posts")
                        .service(
                            web::resource("")
                                .route(web::get().to(posts::list_posts))
                                .route(web::post().to(posts::create_post)),
                        )
                        .route("/feed", web::get().to(posts::get_feed))
                        .route("/saved", web::get().to(posts::get_saved_posts))
                        .route("/liked", web::get().to(posts::get_liked_posts))
                        .route("/user/{user_id}", web::get().to(posts::get_user_posts))
                        .route("/like/{post_id}", web::put().to(posts::toggle_like))
                        .route("/save/{post_id}", web::put().to(posts::toggle_save))
                        .route("/comment/{post_id}", web::post().to(posts::add_comment))
                        .route(
                            "/comment/{post_id}/{comment_id}",
                            web::delete().to(posts::delete_comment),
                        )
                        .route("/{post_id}/images", web::post().to(posts::upload_images))
                        .service(
                            web::resource("/{post_id}")
                                .route(web::get().to(posts::get_post))
                                .route(web::put().to(posts::update_post))
                                .route(web::delete().to(posts::delete_post)),
                        ),
                )
                .service(
                    web::scope("/followers")
                        .route("/{user_id}", web::put().to(followers::toggle_follow))
                        .route("/{user_id}/following", web::get().to(followers::get_following))
                        .route("/{user_id}/followers", web::get().to(followers::get_followers)),
                )
                .service(
                    web::scope("/notifications")
                        .route("", web::get().to(notifications::list_notifications))
                        .route("/read-all", web::put().to(notifications::mark_all_read))
                        .route("/{notification_id}/read", web::put().to(notifications::mark_read))
                        .route(
                            "/{notification_id}",
                            web::delete().to(notifications::delete_notification),
                        ),
                ),
        );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("text", "  hi  ").unwrap(), "hi");
        assert!(matches!(
            require_text("text", " \n\t "),
            Err(AppError::Validation(_))
        ));
    }
}
