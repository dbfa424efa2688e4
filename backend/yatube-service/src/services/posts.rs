/// Post service - listings, detail, create / edit / delete
use std::sync::Arc;
use tracing::{info, warn};

use super::FormOutcome;
use crate::db::BlogRepository;
use crate::error::{AppError, Result};
use crate::forms::{CheckedPost, FormErrors, PostForm, MSG_INVALID_CHOICE};
use crate::media::MediaStorage;
use crate::metrics;
use crate::models::{Group, NewPost, Post, PostChanges, PostFilter, PostView};
use crate::pagination::{Page, Paginator};

/// Outcome of an edit submission
#[derive(Debug)]
pub enum EditOutcome {
    Saved(Post),
    Invalid(FormErrors),
    /// Requester is not the author; nothing was changed
    NotAuthor,
}

#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { author_id: i64 },
    NotAuthor,
}

#[derive(Clone)]
pub struct PostService {
    repo: Arc<dyn BlogRepository>,
    media: MediaStorage,
    paginator: Paginator,
}

impl PostService {
    pub fn new(repo: Arc<dyn BlogRepository>, media: MediaStorage, paginator: Paginator) -> Self {
        Self {
            repo,
            media,
            paginator,
        }
    }

    /// One page of posts matching `filter`, newest first
    pub async fn list(&self, filter: PostFilter, raw_page: Option<&str>) -> Result<Page<PostView>> {
        let count = self.repo.count_posts(filter).await?;
        let number = self.paginator.page_number(raw_page, count);
        let (limit, offset) = self.paginator.bounds(number);
        let posts = self.repo.list_posts(filter, limit, offset).await?;
        Ok(self.paginator.page(posts, number, count))
    }

    pub async fn count_by_author(&self, author_id: i64) -> Result<u64> {
        self.repo.count_posts(PostFilter::Author(author_id)).await
    }

    pub async fn get(&self, post_id: i64) -> Result<Post> {
        self.repo
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("/posts/{}/", post_id)))
    }

    pub async fn get_view(&self, post_id: i64) -> Result<PostView> {
        self.repo
            .find_post_view(post_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("/posts/{}/", post_id)))
    }

    /// Groups offered by the post form
    pub async fn groups(&self) -> Result<Vec<Group>> {
        self.repo.list_groups().await
    }

    /// Remove an image written for a save that did not happen
    async fn discard_upload(&self, path: &str) {
        if let Err(e) = self.media.remove(path).await {
            warn!(path = %path, "failed to remove orphaned upload: {}", e);
        }
    }

    /// Field checks plus the group lookup
    async fn check(&self, form: &mut PostForm) -> Result<std::result::Result<CheckedPost, FormErrors>> {
        let checked = match form.check() {
            Ok(checked) => checked,
            Err(errors) => return Ok(Err(errors)),
        };
        if let Some(group_id) = checked.group_id {
            if self.repo.find_group_by_id(group_id).await?.is_none() {
                let mut errors = FormErrors::new();
                errors.add("group", MSG_INVALID_CHOICE);
                return Ok(Err(errors));
            }
        }
        Ok(Ok(checked))
    }

    pub async fn create(&self, author_id: i64, form: &mut PostForm) -> Result<FormOutcome<Post>> {
        let checked = match self.check(form).await? {
            Ok(checked) => checked,
            Err(errors) => {
                metrics::record_rejection("post");
                return Ok(FormOutcome::Invalid(errors));
            }
        };

        let image = match &checked.image {
            Some(upload) => Some(self.media.save_post_image(upload).await?),
            None => None,
        };

        let written = image.clone();
        let post = match self
            .repo
            .create_post(NewPost {
                text: checked.text,
                author_id,
                group_id: checked.group_id,
                image,
            })
            .await
        {
            Ok(post) => post,
            Err(e) => {
                if let Some(path) = &written {
                    self.discard_upload(path).await;
                }
                return Err(e);
            }
        };

        metrics::record_write("post_created");
        info!(post_id = post.id, user_id = author_id, group_id = ?post.group_id, "post created");
        Ok(FormOutcome::Saved(post))
    }

    /// Only the author may edit; anyone else gets `NotAuthor` before the
    /// form is even looked at.
    pub async fn edit(&self, post_id: i64, user_id: i64, form: &mut PostForm) -> Result<EditOutcome> {
        let post = self.get(post_id).await?;
        if post.author_id != user_id {
            warn!(post_id, user_id, "edit attempt by non-author");
            return Ok(EditOutcome::NotAuthor);
        }

        let checked = match self.check(form).await? {
            Ok(checked) => checked,
            Err(errors) => {
                metrics::record_rejection("post");
                return Ok(EditOutcome::Invalid(errors));
            }
        };

        let image = match &checked.image {
            Some(upload) => Some(self.media.save_post_image(upload).await?),
            None => None,
        };
        let replaced = image.as_ref().and(post.image.clone());
        let written = image.clone();

        let updated = match self
            .repo
            .update_post(
                post_id,
                PostChanges {
                    text: checked.text,
                    group_id: checked.group_id,
                    image,
                },
            )
            .await
            .and_then(|updated| {
                updated.ok_or_else(|| AppError::not_found(format!("/posts/{}/", post_id)))
            }) {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(path) = &written {
                    self.discard_upload(path).await;
                }
                return Err(e);
            }
        };

        if let Some(old) = replaced {
            if let Err(e) = self.media.remove(&old).await {
                warn!(post_id, path = %old, "failed to remove replaced image: {}", e);
            }
        }

        metrics::record_write("post_edited");
        info!(post_id, user_id, "post edited");
        Ok(EditOutcome::Saved(updated))
    }

    pub async fn delete(&self, post_id: i64, user_id: i64) -> Result<DeleteOutcome> {
        let post = self.get(post_id).await?;
        if post.author_id != user_id {
            warn!(post_id, user_id, "delete attempt by non-author");
            return Ok(DeleteOutcome::NotAuthor);
        }

        self.repo.delete_post(post_id).await?;
        if let Some(image) = &post.image {
            if let Err(e) = self.media.remove(image).await {
                warn!(post_id, path = %image, "failed to remove post image: {}", e);
            }
        }

        metrics::record_write("post_deleted");
        info!(post_id, user_id, "post deleted");
        Ok(DeleteOutcome::Deleted {
            author_id: post.author_id,
        })
    }
}
