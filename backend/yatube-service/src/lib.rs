/// Yatube Service Library
///
/// Server-rendered blog: posts, groups, comments, follows and a personal
/// feed of followed authors.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and the route table
/// - `models`: Users, groups, posts, comments, follows
/// - `services`: Business logic layer
/// - `db`: Repository trait with PostgreSQL and in-memory implementations
/// - `cache`: Full-page cache for the index
/// - `forms`: Form binding and validation
/// - `middleware`: Session authentication
/// - `security`: Password hashing and session tokens
/// - `media`: Uploaded image storage
/// - `pagination`: Page-number pagination
/// - `templates`: Compiled-in Tera templates
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod media;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod security;
pub mod services;
pub mod templates;

pub use config::Config;
pub use error::{AppError, Result};

use std::sync::Arc;

use cache::PageCache;
use db::BlogRepository;
use media::MediaStorage;
use pagination::Paginator;
use security::SessionKeys;
use services::{CommentService, FollowService, GroupService, PostService, UserService};

/// Shared, immutable state handed to every handler
pub struct AppState {
    pub posts: PostService,
    pub comments: CommentService,
    pub follows: FollowService,
    pub users: UserService,
    pub groups: GroupService,
    pub repo: Arc<dyn BlogRepository>,
    pub page_cache: Arc<dyn PageCache>,
    pub session_keys: Arc<SessionKeys>,
    pub media: MediaStorage,
    pub max_upload_bytes: usize,
    /// Mark the session cookie `Secure` (production only)
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn BlogRepository>,
        page_cache: Arc<dyn PageCache>,
        config: &Config,
    ) -> Result<Self> {
        let media = MediaStorage::new(config.media.root.clone());
        let paginator = Paginator::new(config.feed.posts_per_page);
        let session_keys = Arc::new(SessionKeys::new(
            &config.session.secret,
            config.session.ttl_hours,
        )?);

        Ok(Self {
            posts: PostService::new(repo.clone(), media.clone(), paginator),
            comments: CommentService::new(repo.clone()),
            follows: FollowService::new(repo.clone()),
            users: UserService::new(repo.clone()),
            groups: GroupService::new(repo.clone()),
            repo,
            page_cache,
            session_keys,
            media,
            max_upload_bytes: config.media.max_upload_bytes,
            secure_cookies: config.app.is_production(),
        })
    }
}
