/// HTTP handlers for yatube-service
///
/// Every page handler builds a Tera context that always carries `user`
/// (the session user or null) and renders one template, or redirects.
pub mod auth;
pub mod follow;
pub mod health;
pub mod media;
pub mod posts;

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use tera::Context;

use crate::error::{AppError, Result};
use crate::metrics::serve_metrics;
use crate::middleware::{full_path, AuthUser};
use crate::templates;

/// Context with the current user filled in
pub(crate) fn base_context(user: Option<&AuthUser>) -> Context {
    let mut context = Context::new();
    context.insert("user", &user);
    context
}

pub(crate) fn render_html(template: &str, context: &Context) -> Result<HttpResponse> {
    let body = templates::render(template, context)?;
    Ok(html(body))
}

pub(crate) fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

pub(crate) fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

async fn not_found(req: HttpRequest) -> Result<HttpResponse> {
    Err(AppError::not_found(full_path(&req)))
}

/// Register every route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(posts::index))
        .route("/group/{slug}/", web::get().to(posts::group_posts))
        .route("/profile/{username}/", web::get().to(posts::profile))
        .service(
            web::resource("/profile/{username}/follow/")
                .route(web::get().to(follow::profile_follow))
                .route(web::post().to(follow::profile_follow)),
        )
        .service(
            web::resource("/profile/{username}/unfollow/")
                .route(web::get().to(follow::profile_unfollow))
                .route(web::post().to(follow::profile_unfollow)),
        )
        .route("/follow/", web::get().to(follow::follow_index))
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::post_create_form))
                .route(web::post().to(posts::post_create)),
        )
        .service(
            web::resource("/posts/{post_id}/")
                .route(web::get().to(posts::post_detail))
                .route(web::post().to(posts::add_comment)),
        )
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(posts::post_edit_form))
                .route(web::post().to(posts::post_edit)),
        )
        .route("/posts/{post_id}/delete/", web::post().to(posts::post_delete))
        .route("/posts/{post_id}/comment/", web::post().to(posts::add_comment))
        .service(
            web::resource("/auth/signup/")
                .route(web::get().to(auth::signup_form))
                .route(web::post().to(auth::signup)),
        )
        .service(
            web::resource("/auth/login/")
                .route(web::get().to(auth::login_form))
                .route(web::post().to(auth::login)),
        )
        .service(
            web::resource("/auth/logout/")
                .route(web::get().to(auth::logout))
                .route(web::post().to(auth::logout)),
        )
        .route("/media/{path:.*}", web::get().to(media::serve_media))
        .route("/health", web::get().to(health::liveness))
        .route("/health/ready", web::get().to(health::readiness))
        .route("/metrics", web::get().to(serve_metrics))
        .default_service(web::to(not_found));
}
