/// User service - signup, login, profile lookup
use std::sync::Arc;
use tracing::info;

use super::FormOutcome;
use crate::db::BlogRepository;
use crate::error::{AppError, Result};
use crate::forms::{
    FormErrors, LoginForm, SignupForm, MSG_INVALID_LOGIN, MSG_USERNAME_TAKEN, NON_FIELD_ERRORS,
};
use crate::metrics;
use crate::models::{NewUser, User};
use crate::security::{hash_password, verify_password};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn BlogRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn BlogRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        self.repo
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("/profile/{}/", username)))
    }

    pub async fn signup(&self, form: &mut SignupForm) -> Result<FormOutcome<User>> {
        let checked = match form.check() {
            Ok(checked) => checked,
            Err(errors) => {
                metrics::record_rejection("signup");
                return Ok(FormOutcome::Invalid(errors));
            }
        };

        let taken = || {
            let mut errors = FormErrors::new();
            errors.add("username", MSG_USERNAME_TAKEN);
            metrics::record_rejection("signup");
            FormOutcome::Invalid(errors)
        };

        if self
            .repo
            .find_user_by_username(&checked.username)
            .await?
            .is_some()
        {
            return Ok(taken());
        }

        let new_user = NewUser {
            username: checked.username,
            password_hash: hash_password(&checked.password)?,
            first_name: checked.first_name,
            last_name: checked.last_name,
        };

        match self.repo.create_user(new_user).await {
            Ok(user) => {
                metrics::record_write("user_created");
                info!(user_id = user.id, username = %user.username, "user signed up");
                Ok(FormOutcome::Saved(user))
            }
            // lost a race with a concurrent signup
            Err(AppError::Conflict(_)) => Ok(taken()),
            Err(e) => Err(e),
        }
    }

    pub async fn authenticate(&self, form: &mut LoginForm) -> Result<FormOutcome<User>> {
        if let Err(errors) = form.check() {
            return Ok(FormOutcome::Invalid(errors));
        }

        let user = match self.repo.find_user_by_username(&form.username).await? {
            Some(user) if verify_password(&form.password, &user.password_hash)? => user,
            _ => {
                metrics::record_rejection("login");
                let mut errors = FormErrors::new();
                errors.add(NON_FIELD_ERRORS, MSG_INVALID_LOGIN);
                return Ok(FormOutcome::Invalid(errors));
            }
        };

        info!(user_id = user.id, "user logged in");
        Ok(FormOutcome::Saved(user))
    }
}
