/// Database access layer
///
/// `BlogRepository` is the one seam between services and storage. Two
/// implementations exist:
/// - `PgBlogRepository`: PostgreSQL via sqlx (production)
/// - `InMemoryBlogRepository`: process-local tables (tests, local development)
pub mod memory;
pub mod pool;
pub mod postgres;

pub use memory::InMemoryBlogRepository;
pub use pool::{create_pool, run_migrations, DbConfig};
pub use postgres::PgBlogRepository;

use crate::error::Result;
use crate::models::{
    Comment, CommentView, Follow, Group, NewComment, NewGroup, NewPost, NewUser, Post,
    PostChanges, PostFilter, PostView, User,
};

/// Every query the views need.
///
/// Listings are always newest first (`created_at DESC, id DESC`).
#[async_trait::async_trait]
pub trait BlogRepository: Send + Sync {
    // ---- users ----
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    // ---- groups ----
    async fn create_group(&self, group: NewGroup) -> Result<Group>;

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>>;

    async fn find_group_by_id(&self, group_id: i64) -> Result<Option<Group>>;

    async fn list_groups(&self) -> Result<Vec<Group>>;

    // ---- posts ----
    async fn create_post(&self, post: NewPost) -> Result<Post>;

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>>;

    async fn find_post_view(&self, post_id: i64) -> Result<Option<PostView>>;

    /// Returns the updated post, or `None` if it does not exist
    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>>;

    /// Returns true if a row was removed
    async fn delete_post(&self, post_id: i64) -> Result<bool>;

    async fn count_posts(&self, filter: PostFilter) -> Result<u64>;

    async fn list_posts(&self, filter: PostFilter, limit: u64, offset: u64)
        -> Result<Vec<PostView>>;

    // ---- comments ----
    async fn create_comment(&self, comment: NewComment) -> Result<Comment>;

    /// Comments on a post, oldest first
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>>;

    // ---- follows ----
    /// Idempotent; returns the edge and whether it was newly created
    async fn get_or_create_follow(&self, user_id: i64, author_id: i64) -> Result<(Follow, bool)>;

    async fn find_follow(&self, user_id: i64, author_id: i64) -> Result<Option<Follow>>;

    /// Returns true if a row was removed
    async fn delete_follow(&self, follow_id: i64) -> Result<bool>;

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        Ok(self.find_follow(user_id, author_id).await?.is_some())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
