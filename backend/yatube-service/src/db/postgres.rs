use super::BlogRepository;
use crate::error::Result;
use crate::models::{
    Comment, CommentView, Follow, Group, GroupRef, NewComment, NewGroup, NewPost, NewUser, Post,
    PostChanges, PostFilter, PostView, User, UserRef,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

const POST_VIEW_SELECT: &str = r#"
    SELECT p.id, p.text, p.created_at, p.image,
           u.id AS author_id, u.username AS author_username,
           u.first_name AS author_first_name, u.last_name AS author_last_name,
           g.id AS group_id, g.title AS group_title, g.slug AS group_slug
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN groups g ON g.id = p.group_id
"#;

/// Flat row for the posts/users/groups join
#[derive(sqlx::FromRow)]
struct PostViewRow {
    id: i64,
    text: String,
    created_at: DateTime<Utc>,
    image: Option<String>,
    author_id: i64,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
    group_id: Option<i64>,
    group_title: Option<String>,
    group_slug: Option<String>,
}

fn author_ref(id: i64, username: String, first_name: &str, last_name: &str) -> UserRef {
    let full = format!("{} {}", first_name, last_name).trim().to_string();
    UserRef {
        id,
        display_name: if full.is_empty() {
            username.clone()
        } else {
            full
        },
        username,
    }
}

impl From<PostViewRow> for PostView {
    fn from(row: PostViewRow) -> Self {
        let group = match (row.group_id, row.group_title, row.group_slug) {
            (Some(id), Some(title), Some(slug)) => Some(GroupRef { id, title, slug }),
            _ => None,
        };
        PostView {
            id: row.id,
            text: row.text,
            created_at: row.created_at,
            image: row.image,
            author: author_ref(
                row.author_id,
                row.author_username,
                &row.author_first_name,
                &row.author_last_name,
            ),
            group,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentViewRow {
    id: i64,
    post_id: i64,
    text: String,
    created_at: DateTime<Utc>,
    author_id: i64,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
}

/// WHERE clause for a listing filter; the bound value (if any) is `$1`
fn filter_clause(filter: PostFilter) -> (&'static str, Option<i64>) {
    match filter {
        PostFilter::All => ("", None),
        PostFilter::Group(group_id) => ("WHERE p.group_id = $1", Some(group_id)),
        PostFilter::Author(author_id) => ("WHERE p.author_id = $1", Some(author_id)),
        PostFilter::FollowedBy(user_id) => (
            "WHERE p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = $1)",
            Some(user_id),
        ),
    }
}

/// PostgreSQL repository (source of truth)
#[derive(Clone)]
pub struct PgBlogRepository {
    pool: PgPool,
}

impl PgBlogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BlogRepository for PgBlogRepository {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password_hash, first_name, last_name, date_joined
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&self.pool)
        .await?;

        debug!(user_id = created.id, username = %created.username, "Created user");
        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, first_name, last_name, date_joined
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        let created = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, slug, description
            "#,
        )
        .bind(&group.title)
        .bind(&group.slug)
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn find_group_by_id(&self, group_id: i64) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups ORDER BY title, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let created = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (text, author_id, group_id, image)
            VALUES ($1, $2, $3, $4)
            RETURNING id, text, created_at, author_id, group_id, image
            "#,
        )
        .bind(&post.text)
        .bind(post.author_id)
        .bind(post.group_id)
        .bind(&post.image)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, text, created_at, author_id, group_id, image
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn find_post_view(&self, post_id: i64) -> Result<Option<PostView>> {
        let sql = format!("{} WHERE p.id = $1", POST_VIEW_SELECT);
        let row = sqlx::query_as::<_, PostViewRow>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(PostView::from))
    }

    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET text = $1, group_id = $2, image = COALESCE($3, image)
            WHERE id = $4
            RETURNING id, text, created_at, author_id, group_id, image
            "#,
        )
        .bind(&changes.text)
        .bind(changes.group_id)
        .bind(&changes.image)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn delete_post(&self, post_id: i64) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(affected > 0)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<u64> {
        let (clause, param) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM posts p {}", clause);
        let mut query = sqlx::query_as::<_, (i64,)>(&sql);
        if let Some(value) = param {
            query = query.bind(value);
        }
        let (count,) = query.fetch_one(&self.pool).await?;

        Ok(count.max(0) as u64)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostView>> {
        let (clause, param) = filter_clause(filter);
        let (limit_idx, offset_idx) = if param.is_some() { (2, 3) } else { (1, 2) };
        let sql = format!(
            "{} {} ORDER BY p.created_at DESC, p.id DESC LIMIT ${} OFFSET ${}",
            POST_VIEW_SELECT, clause, limit_idx, offset_idx
        );

        let mut query = sqlx::query_as::<_, PostViewRow>(&sql);
        if let Some(value) = param {
            query = query.bind(value);
        }
        let rows = query
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PostView::from).collect())
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let created = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, author_id, text, created_at
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>> {
        let rows = sqlx::query_as::<_, CommentViewRow>(
            r#"
            SELECT c.id, c.post_id, c.text, c.created_at,
                   u.id AS author_id, u.username AS author_username,
                   u.first_name AS author_first_name, u.last_name AS author_last_name
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CommentView {
                id: row.id,
                post_id: row.post_id,
                text: row.text,
                created_at: row.created_at,
                author: author_ref(
                    row.author_id,
                    row.author_username,
                    &row.author_first_name,
                    &row.author_last_name,
                ),
            })
            .collect())
    }

    async fn get_or_create_follow(&self, user_id: i64, author_id: i64) -> Result<(Follow, bool)> {
        let inserted = sqlx::query_as::<_, Follow>(
            r#"
            INSERT INTO follows (user_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, author_id) DO NOTHING
            RETURNING id, user_id, author_id
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(follow) = inserted {
            debug!(user_id, author_id, "Created follow edge");
            return Ok((follow, true));
        }

        let existing = sqlx::query_as::<_, Follow>(
            "SELECT id, user_id, author_id FROM follows WHERE user_id = $1 AND author_id = $2",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((existing, false))
    }

    async fn find_follow(&self, user_id: i64, author_id: i64) -> Result<Option<Follow>> {
        let follow = sqlx::query_as::<_, Follow>(
            "SELECT id, user_id, author_id FROM follows WHERE user_id = $1 AND author_id = $2",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(follow)
    }

    async fn delete_follow(&self, follow_id: i64) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM follows WHERE id = $1")
            .bind(follow_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(affected > 0)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
