/// Comment service
use std::sync::Arc;
use tracing::info;

use super::FormOutcome;
use crate::db::BlogRepository;
use crate::error::{AppError, Result};
use crate::forms::CommentForm;
use crate::metrics;
use crate::models::{Comment, CommentView, NewComment};

#[derive(Clone)]
pub struct CommentService {
    repo: Arc<dyn BlogRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn BlogRepository>) -> Self {
        Self { repo }
    }

    /// Comments on a post, oldest first
    pub async fn list(&self, post_id: i64) -> Result<Vec<CommentView>> {
        self.repo.list_comments(post_id).await
    }

    pub async fn add(
        &self,
        post_id: i64,
        author_id: i64,
        form: &mut CommentForm,
    ) -> Result<FormOutcome<Comment>> {
        if self.repo.find_post(post_id).await?.is_none() {
            return Err(AppError::not_found(format!("/posts/{}/", post_id)));
        }

        let text = match form.check() {
            Ok(text) => text,
            Err(errors) => {
                metrics::record_rejection("comment");
                return Ok(FormOutcome::Invalid(errors));
            }
        };

        let comment = self
            .repo
            .create_comment(NewComment {
                post_id,
                author_id,
                text,
            })
            .await?;

        metrics::record_write("comment_created");
        info!(comment_id = comment.id, post_id, user_id = author_id, "comment added");
        Ok(FormOutcome::Saved(comment))
    }
}
