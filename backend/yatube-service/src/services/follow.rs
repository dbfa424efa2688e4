use std::sync::Arc;
use tracing::{debug, info};

use crate::db::BlogRepository;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// Following yourself is silently ignored
    SelfFollow,
}

#[derive(Clone)]
pub struct FollowService {
    repo: Arc<dyn BlogRepository>,
}

impl FollowService {
    pub fn new(repo: Arc<dyn BlogRepository>) -> Self {
        Self { repo }
    }

    async fn author(&self, username: &str) -> Result<User> {
        self.repo
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("/profile/{}/", username)))
    }

    /// Idempotent get-or-create of the (user, author) edge.
    pub async fn follow(&self, user_id: i64, author_username: &str) -> Result<FollowOutcome> {
        let author = self.author(author_username).await?;
        if author.id == user_id {
            debug!(user_id, "ignoring self-follow");
            return Ok(FollowOutcome::SelfFollow);
        }

        let (_, created) = self.repo.get_or_create_follow(user_id, author.id).await?;
        if !created {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        metrics::record_write("follow_created");
        info!(user_id, author = %author.username, "follow created");
        Ok(FollowOutcome::Created)
    }

    /// Remove the exact (user, author) edge; a missing edge is not found.
    pub async fn unfollow(&self, user_id: i64, author_username: &str) -> Result<()> {
        let author = self.author(author_username).await?;
        let follow = self
            .repo
            .find_follow(user_id, author.id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("/profile/{}/unfollow/", author_username))
            })?;

        if !self.repo.delete_follow(follow.id).await? {
            return Err(AppError::not_found(format!(
                "/profile/{}/unfollow/",
                author_username
            )));
        }

        metrics::record_write("follow_deleted");
        info!(user_id, author = %author.username, "follow removed");
        Ok(())
    }

    pub async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        self.repo.is_following(user_id, author_id).await
    }
}
