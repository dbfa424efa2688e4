/// Data models for yatube-service
///
/// Persistent entities (`User`, `Group`, `Post`, `Comment`, `Follow`) map one
/// to one onto the tables created by the migrations. The `*View` structs are
/// the denormalized shapes handed to templates.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of characters of a post shown by its `Display` impl.
pub const POST_PREVIEW_CHARS: usize = 15;

/// Verbose name and help text of a model field, used for form labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldMeta {
    pub verbose_name: &'static str,
    pub help_text: &'static str,
}

impl FieldMeta {
    const fn new(verbose_name: &'static str, help_text: &'static str) -> Self {
        Self {
            verbose_name,
            help_text,
        }
    }
}

fn lookup_field(fields: &[(&str, FieldMeta)], name: &str) -> Option<FieldMeta> {
    fields
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, meta)| *meta)
}

// ============================================================================
// User
// ============================================================================

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// "First Last", or the username when no name was given
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name(),
        }
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Author reference embedded in post and comment views
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: i64,
    pub username: String,
    pub display_name: String,
}

// ============================================================================
// Group
// ============================================================================

/// Named category posts can be filed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl Group {
    pub const TITLE_MAX_LEN: usize = 200;
    pub const SLUG_MAX_LEN: usize = 50;

    const FIELDS: [(&'static str, FieldMeta); 3] = [
        ("title", FieldMeta::new("Название", "Дайте короткое название")),
        ("slug", FieldMeta::new("slug", "Укажите slug")),
        ("description", FieldMeta::new("Описание", "Добавьте описание")),
    ];

    pub fn field_meta(name: &str) -> Option<FieldMeta> {
        lookup_field(&Self::FIELDS, name)
    }

    pub fn to_ref(&self) -> GroupRef {
        GroupRef {
            id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// Group reference embedded in post views
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRef {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

// ============================================================================
// Post
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub group_id: Option<i64>,
    /// Path relative to the media root, e.g. `posts/3f2c....gif`
    pub image: Option<String>,
}

impl Post {
    const FIELDS: [(&'static str, FieldMeta); 3] = [
        ("text", FieldMeta::new("Текст поста", "Введите текст поста")),
        (
            "group",
            FieldMeta::new("Группа", "Группа, к которой будет относиться пост"),
        ),
        ("image", FieldMeta::new("Картинка", "Загрузите картинку")),
    ];

    pub fn field_meta(name: &str) -> Option<FieldMeta> {
        lookup_field(&Self::FIELDS, name)
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&preview(&self.text))
    }
}

/// First `POST_PREVIEW_CHARS` characters of `text`
pub fn preview(text: &str) -> String {
    text.chars().take(POST_PREVIEW_CHARS).collect()
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub author_id: i64,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// Fields an author may change on an existing post
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<i64>,
    /// `None` keeps the current image
    pub image: Option<String>,
}

/// Post joined with its author and group, as rendered on listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub image: Option<String>,
    pub author: UserRef,
    pub group: Option<GroupRef>,
}

impl PostView {
    pub fn from_parts(post: Post, author: UserRef, group: Option<GroupRef>) -> Self {
        Self {
            id: post.id,
            text: post.text,
            created_at: post.created_at,
            image: post.image,
            author,
            group,
        }
    }
}

impl fmt::Display for PostView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&preview(&self.text))
    }
}

/// Which posts a listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(i64),
    /// Posts whose author is followed by this user
    FollowedBy(i64),
}

// ============================================================================
// Comment
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: UserRef,
}

// ============================================================================
// Follow
// ============================================================================

/// Directed subscription edge: `user_id` follows `author_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub id: i64,
    pub user_id: i64,
    pub author_id: i64,
}
