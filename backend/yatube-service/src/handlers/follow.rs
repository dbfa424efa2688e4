/// Follow feed and follow / unfollow handlers
use actix_web::{web, HttpResponse};

use super::{base_context, redirect, render_html};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::PostFilter;
use crate::pagination::PageQuery;
use crate::AppState;

/// GET /follow/ - posts by authors the user follows
pub async fn follow_index(
    user: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = state
        .posts
        .list(PostFilter::FollowedBy(user.id), query.page.as_deref())
        .await?;

    let mut context = base_context(Some(&user));
    context.insert("page_obj", &page);
    render_html("posts/follow.html", &context)
}

/// GET|POST /profile/{username}/follow/
pub async fn profile_follow(
    user: AuthUser,
    state: web::Data<AppState>,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    state.follows.follow(user.id, &username).await?;
    Ok(redirect(format!("/profile/{}/", username)))
}

/// GET|POST /profile/{username}/unfollow/
pub async fn profile_unfollow(
    user: AuthUser,
    state: web::Data<AppState>,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    state.follows.unfollow(user.id, &username).await?;
    Ok(redirect(format!("/profile/{}/", username)))
}
