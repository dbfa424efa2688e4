//! Process-local repository
//!
//! Same contract as `PgBlogRepository`, including uniqueness of usernames,
//! group slugs and follow edges, and the cascade / set-null rules of the
//! foreign keys. Used by the test-suite and by `STORAGE_BACKEND=memory`.

use super::BlogRepository;
use crate::error::{AppError, Result};
use crate::models::{
    Comment, CommentView, Follow, Group, NewComment, NewGroup, NewPost, NewUser, Post,
    PostChanges, PostFilter, PostView, User,
};
use chrono::Utc;
use std::cmp::Reverse;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    follows: Vec<Follow>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn matches(&self, post: &Post, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id),
        }
    }

    fn view(&self, post: &Post) -> Option<PostView> {
        let author = self.users.iter().find(|u| u.id == post.author_id)?;
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|g| g.id == id))
            .map(Group::to_ref);
        Some(PostView::from_parts(post.clone(), author.to_ref(), group))
    }
}

#[derive(Default)]
pub struct InMemoryBlogRepository {
    tables: RwLock<Tables>,
}

impl InMemoryBlogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BlogRepository for InMemoryBlogRepository {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "username '{}' already exists",
                user.username
            )));
        }
        let created = User {
            id: tables.next_id(),
            username: user.username,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            date_joined: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        let mut tables = self.tables.write().await;
        if tables.groups.iter().any(|g| g.slug == group.slug) {
            return Err(AppError::Conflict(format!(
                "group slug '{}' already exists",
                group.slug
            )));
        }
        let created = Group {
            id: tables.next_id(),
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        tables.groups.push(created.clone());
        Ok(created)
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn find_group_by_id(&self, group_id: i64) -> Result<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.id == group_id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let tables = self.tables.read().await;
        let mut groups = tables.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == post.author_id) {
            return Err(AppError::Database(format!(
                "author {} does not exist",
                post.author_id
            )));
        }
        if let Some(group_id) = post.group_id {
            if !tables.groups.iter().any(|g| g.id == group_id) {
                return Err(AppError::Database(format!(
                    "group {} does not exist",
                    group_id
                )));
            }
        }
        let created = Post {
            id: tables.next_id(),
            text: post.text,
            created_at: Utc::now(),
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
        };
        tables.posts.push(created.clone());
        Ok(created)
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == post_id).cloned())
    }

    async fn find_post_view(&self, post_id: i64) -> Result<Option<PostView>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.id == post_id)
            .and_then(|p| tables.view(p)))
    }

    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let mut tables = self.tables.write().await;
        let Some(post) = tables.posts.iter_mut().find(|p| p.id == post_id) else {
            return Ok(None);
        };
        post.text = changes.text;
        post.group_id = changes.group_id;
        if changes.image.is_some() {
            post.image = changes.image;
        }
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != post_id);
        let removed = tables.posts.len() != before;
        if removed {
            tables.comments.retain(|c| c.post_id != post_id);
        }
        Ok(removed)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .filter(|p| tables.matches(p, filter))
            .count() as u64)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostView>> {
        let tables = self.tables.read().await;
        let mut posts: Vec<&Post> = tables
            .posts
            .iter()
            .filter(|p| tables.matches(p, filter))
            .collect();
        posts.sort_by_key(|p| (Reverse(p.created_at), Reverse(p.id)));

        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|p| tables.view(p))
            .collect())
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(AppError::Database(format!(
                "post {} does not exist",
                comment.post_id
            )));
        }
        let created = Comment {
            id: tables.next_id(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created_at: Utc::now(),
        };
        tables.comments.push(created.clone());
        Ok(created)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<&Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));

        Ok(comments
            .into_iter()
            .filter_map(|c| {
                let author = tables.users.iter().find(|u| u.id == c.author_id)?;
                Some(CommentView {
                    id: c.id,
                    post_id: c.post_id,
                    text: c.text.clone(),
                    created_at: c.created_at,
                    author: author.to_ref(),
                })
            })
            .collect())
    }

    async fn get_or_create_follow(&self, user_id: i64, author_id: i64) -> Result<(Follow, bool)> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .follows
            .iter()
            .find(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Ok((existing.clone(), false));
        }
        let follow = Follow {
            id: tables.next_id(),
            user_id,
            author_id,
        };
        tables.follows.push(follow.clone());
        Ok((follow, true))
    }

    async fn find_follow(&self, user_id: i64, author_id: i64) -> Result<Option<Follow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .find(|f| f.user_id == user_id && f.author_id == author_id)
            .cloned())
    }

    async fn delete_follow(&self, follow_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables.follows.retain(|f| f.id != follow_id);
        Ok(tables.follows.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(repo: &InMemoryBlogRepository, name: &str) -> User {
        repo.create_user(NewUser {
            username: name.to_string(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let repo = InMemoryBlogRepository::new();
        user(&repo, "leo").await;
        let err = repo
            .create_user(NewUser {
                username: "leo".into(),
                password_hash: String::new(),
                first_name: String::new(),
                last_name: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_listing_is_newest_first() {
        let repo = InMemoryBlogRepository::new();
        let author = user(&repo, "author").await;
        for n in 0..3 {
            repo.create_post(NewPost {
                text: format!("post {}", n),
                author_id: author.id,
                group_id: None,
                image: None,
            })
            .await
            .unwrap();
        }

        let texts: Vec<String> = repo
            .list_posts(PostFilter::All, 10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.text)
            .collect();
        assert_eq!(texts, vec!["post 2", "post 1", "post 0"]);
    }

    #[tokio::test]
    async fn test_follow_is_unique_per_pair() {
        let repo = InMemoryBlogRepository::new();
        let reader = user(&repo, "reader").await;
        let author = user(&repo, "author").await;

        let (first, created) = repo.get_or_create_follow(reader.id, author.id).await.unwrap();
        assert!(created);
        let (second, created) = repo.get_or_create_follow(reader.id, author.id).await.unwrap();
        assert!(!created);
        assert_eq!(first, second);

        assert!(repo.delete_follow(first.id).await.unwrap());
        assert!(!repo.is_following(reader.id, author.id).await.unwrap());
        assert!(!repo.delete_follow(first.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_post_cascades_comments() {
        let repo = InMemoryBlogRepository::new();
        let author = user(&repo, "author").await;
        let post = repo
            .create_post(NewPost {
                text: "hello".into(),
                author_id: author.id,
                group_id: None,
                image: None,
            })
            .await
            .unwrap();
        repo.create_comment(NewComment {
            post_id: post.id,
            author_id: author.id,
            text: "first".into(),
        })
        .await
        .unwrap();

        assert!(repo.delete_post(post.id).await.unwrap());
        assert!(repo.list_comments(post.id).await.unwrap().is_empty());
    }
}
