/// Post handlers - listings, detail, comments, create / edit / delete
use actix_web::{web, HttpRequest, HttpResponse};
use std::collections::BTreeMap;
use tera::Context;
use tracing::warn;

use super::{base_context, html, redirect, render_html};
use crate::cache::CacheKey;
use crate::error::Result;
use crate::forms::{read_post_form, read_urlencoded, CommentForm, FormErrors, PostForm};
use crate::middleware::{full_path, AuthUser};
use crate::models::{FieldMeta, Post, PostFilter};
use crate::pagination::PageQuery;
use crate::services::{DeleteOutcome, EditOutcome, FormOutcome};
use crate::templates;
use crate::AppState;

fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

fn profile_url(username: &str) -> String {
    format!("/profile/{}/", username)
}

/// Labels and help texts for the post form
fn post_fields() -> BTreeMap<&'static str, FieldMeta> {
    ["text", "group", "image"]
        .into_iter()
        .filter_map(|name| Post::field_meta(name).map(|meta| (name, meta)))
        .collect()
}

/// GET / - all posts; the rendered page is cached per path + query
pub async fn index(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: Option<AuthUser>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let key = CacheKey::page(&full_path(&req));
    match state.page_cache.get(&key).await {
        Ok(Some(body)) => return Ok(html(body)),
        Ok(None) => {}
        Err(e) => warn!(key = %key, "page cache unavailable, rendering uncached: {}", e),
    }

    let page = state.posts.list(PostFilter::All, query.page.as_deref()).await?;
    let mut context = base_context(user.as_ref());
    context.insert("page_obj", &page);
    let body = templates::render("posts/index.html", &context)?;

    if let Err(e) = state.page_cache.set(&key, &body).await {
        warn!(key = %key, "failed to cache index page: {}", e);
    }
    Ok(html(body))
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    user: Option<AuthUser>,
    slug: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let group = state.groups.get_by_slug(&slug).await?;
    let page = state
        .posts
        .list(PostFilter::Group(group.id), query.page.as_deref())
        .await?;

    let mut context = base_context(user.as_ref());
    context.insert("group", &group);
    context.insert("page_obj", &page);
    render_html("posts/group_list.html", &context)
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    user: Option<AuthUser>,
    username: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let author = state.users.get_by_username(&username).await?;
    let page = state
        .posts
        .list(PostFilter::Author(author.id), query.page.as_deref())
        .await?;
    let following = match &user {
        Some(u) => state.follows.is_following(u.id, author.id).await?,
        None => false,
    };

    let mut context = base_context(user.as_ref());
    context.insert("author", &author.to_ref());
    context.insert("posts_count", &page.count);
    context.insert("following", &following);
    context.insert("page_obj", &page);
    render_html("posts/profile.html", &context)
}

/// Post, its comments and the comment form
async fn detail_context(
    state: &AppState,
    user: Option<&AuthUser>,
    post_id: i64,
    form: &CommentForm,
    errors: &FormErrors,
) -> Result<Context> {
    let post = state.posts.get_view(post_id).await?;
    let comments = state.comments.list(post_id).await?;
    let posts_count = state.posts.count_by_author(post.author.id).await?;

    let mut context = base_context(user);
    context.insert("post", &post);
    context.insert("comments", &comments);
    context.insert("posts_count", &posts_count);
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(context)
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    user: Option<AuthUser>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let context = detail_context(
        &state,
        user.as_ref(),
        post_id.into_inner(),
        &CommentForm::default(),
        &FormErrors::new(),
    )
    .await?;
    render_html("posts/post_detail.html", &context)
}

/// POST /posts/{post_id}/comment/
pub async fn add_comment(
    user: AuthUser,
    req: HttpRequest,
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
    payload: web::Payload,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let mut form: CommentForm = read_urlencoded(&req, payload, state.max_upload_bytes).await?;

    match state.comments.add(post_id, user.id, &mut form).await? {
        FormOutcome::Saved(_) => Ok(redirect(post_url(post_id))),
        FormOutcome::Invalid(errors) => {
            let context = detail_context(&state, Some(&user), post_id, &form, &errors).await?;
            render_html("posts/includes/comments.html", &context)
        }
    }
}

async fn post_form_context(
    state: &AppState,
    user: &AuthUser,
    form: &PostForm,
    errors: &FormErrors,
    editing: Option<&Post>,
) -> Result<Context> {
    let groups = state.posts.groups().await?;
    let mut context = base_context(Some(user));
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("fields", &post_fields());
    context.insert("groups", &groups);
    context.insert("is_edit", &editing.is_some());
    if let Some(post) = editing {
        context.insert("post_id", &post.id);
        context.insert("current_image", &post.image);
    }
    Ok(context)
}

/// GET /create/
pub async fn post_create_form(
    user: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let context =
        post_form_context(&state, &user, &PostForm::default(), &FormErrors::new(), None).await?;
    render_html("posts/create_post.html", &context)
}

/// POST /create/
pub async fn post_create(
    user: AuthUser,
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Payload,
) -> Result<HttpResponse> {
    let mut form = read_post_form(&req, payload, state.max_upload_bytes).await?;

    match state.posts.create(user.id, &mut form).await? {
        FormOutcome::Saved(_) => Ok(redirect(profile_url(&user.username))),
        FormOutcome::Invalid(errors) => {
            let context = post_form_context(&state, &user, &form, &errors, None).await?;
            render_html("posts/create_post.html", &context)
        }
    }
}

/// GET /posts/{post_id}/edit/
pub async fn post_edit_form(
    user: AuthUser,
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post = state.posts.get(post_id.into_inner()).await?;
    if post.author_id != user.id {
        return Ok(redirect(post_url(post.id)));
    }

    let form = PostForm::initial(&post.text, post.group_id);
    let context = post_form_context(&state, &user, &form, &FormErrors::new(), Some(&post)).await?;
    render_html("posts/create_post.html", &context)
}

/// POST /posts/{post_id}/edit/
pub async fn post_edit(
    user: AuthUser,
    req: HttpRequest,
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
    payload: web::Payload,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let mut form = read_post_form(&req, payload, state.max_upload_bytes).await?;

    match state.posts.edit(post_id, user.id, &mut form).await? {
        EditOutcome::Saved(_) | EditOutcome::NotAuthor => Ok(redirect(post_url(post_id))),
        EditOutcome::Invalid(errors) => {
            let post = state.posts.get(post_id).await?;
            let context = post_form_context(&state, &user, &form, &errors, Some(&post)).await?;
            render_html("posts/create_post.html", &context)
        }
    }
}

/// POST /posts/{post_id}/delete/
pub async fn post_delete(
    user: AuthUser,
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    match state.posts.delete(post_id, user.id).await? {
        DeleteOutcome::Deleted { .. } => Ok(redirect(profile_url(&user.username))),
        DeleteOutcome::NotAuthor => Ok(redirect(post_url(post_id))),
    }
}
