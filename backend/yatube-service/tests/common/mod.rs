//! Shared fixtures for the HTTP integration tests
#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::web;
use std::sync::Arc;
use tempfile::TempDir;

use yatube_service::cache::MemoryPageCache;
use yatube_service::db::{BlogRepository, InMemoryBlogRepository};
use yatube_service::models::{Group, NewGroup, NewPost, NewUser, Post, User};
use yatube_service::security::{hash_password, SESSION_COOKIE};
use yatube_service::{AppState, Config};

pub const PASSWORD: &str = "very-secret-password";

/// 2x1 GIF
pub const SMALL_GIF: &[u8] = b"GIF89a\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\xff\xff\xff\
!\xf9\x04\x00\x00\x00\x00\x00,\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0c\n\x00;";

pub struct TestContext {
    pub repo: Arc<dyn BlogRepository>,
    pub state: web::Data<AppState>,
    pub media_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let media_dir = tempfile::tempdir().expect("create media dir");
        let config = Config::for_tests(media_dir.path().to_path_buf());
        let repo: Arc<dyn BlogRepository> = Arc::new(InMemoryBlogRepository::new());
        let page_cache = Arc::new(MemoryPageCache::with_ttl_secs(config.cache.index_ttl_secs));
        let state = AppState::new(repo.clone(), page_cache, &config).expect("build app state");

        Self {
            repo,
            state: web::Data::new(state),
            media_dir,
        }
    }

    /// User without a usable password (session cookie only)
    pub async fn user(&self, username: &str) -> User {
        self.repo
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: String::new(),
                first_name: String::new(),
                last_name: String::new(),
            })
            .await
            .expect("create user")
    }

    /// User that can log in with `PASSWORD`
    pub async fn user_with_password(&self, username: &str) -> User {
        self.repo
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: hash_password(PASSWORD).expect("hash password"),
                first_name: String::new(),
                last_name: String::new(),
            })
            .await
            .expect("create user")
    }

    pub async fn group(&self, title: &str, slug: &str) -> Group {
        self.repo
            .create_group(NewGroup {
                title: title.to_string(),
                slug: slug.to_string(),
                description: "Тестовое описание".to_string(),
            })
            .await
            .expect("create group")
    }

    pub async fn post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        self.repo
            .create_post(NewPost {
                text: text.to_string(),
                author_id: author.id,
                group_id: group.map(|g| g.id),
                image: None,
            })
            .await
            .expect("create post")
    }

    pub fn cookie(&self, user: &User) -> Cookie<'static> {
        let token = self.state.session_keys.issue(user).expect("issue token");
        Cookie::new(SESSION_COOKIE, token)
    }
}

/// Build the service under test the same way `main` does
#[macro_export]
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.state.clone())
                .wrap(yatube_service::middleware::SessionAuth::new(
                    $ctx.state.session_keys.clone(),
                ))
                .configure(yatube_service::handlers::configure),
        )
        .await
    };
}

/// Number of post cards on a rendered listing
pub fn post_cards(body: &str) -> usize {
    body.matches("<article class=\"post-card\"").count()
}

pub fn body_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

pub fn location(resp: &actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>) -> String {
    resp.headers()
        .get(actix_web::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Hand-built multipart body: `(name, filename, bytes)`
pub fn multipart_body(boundary: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}
