/// Group administration (used by the `create-group` subcommand)
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::info;

use crate::db::BlogRepository;
use crate::error::{AppError, Result};
use crate::models::{Group, NewGroup};

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug regex is valid"));

#[derive(Clone)]
pub struct GroupService {
    repo: Arc<dyn BlogRepository>,
}

impl GroupService {
    pub fn new(repo: Arc<dyn BlogRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Group> {
        self.repo
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found(format!("/group/{}/", slug)))
    }

    pub async fn create(&self, title: &str, slug: &str, description: &str) -> Result<Group> {
        let title = title.trim();
        let slug = slug.trim();

        if title.is_empty() || title.chars().count() > Group::TITLE_MAX_LEN {
            return Err(AppError::BadRequest(format!(
                "title must be 1..={} characters",
                Group::TITLE_MAX_LEN
            )));
        }
        if slug.len() > Group::SLUG_MAX_LEN || !SLUG_RE.is_match(slug) {
            return Err(AppError::BadRequest(format!(
                "slug '{}' must be at most {} of [-a-zA-Z0-9_]",
                slug,
                Group::SLUG_MAX_LEN
            )));
        }

        let group = self
            .repo
            .create_group(NewGroup {
                title: title.to_string(),
                slug: slug.to_string(),
                description: description.trim().to_string(),
            })
            .await?;

        info!(group_id = group.id, slug = %group.slug, "group created");
        Ok(group)
    }
}
