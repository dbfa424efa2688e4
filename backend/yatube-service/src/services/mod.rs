/// Business layer between the HTTP handlers and `BlogRepository`
///
/// Services own the rules that are not plain storage: authorship checks,
/// self-follow, form validation that needs the database, image storage.
pub mod comments;
pub mod follow;
pub mod groups;
pub mod posts;
pub mod users;

pub use comments::CommentService;
pub use follow::{FollowOutcome, FollowService};
pub use groups::GroupService;
pub use posts::{DeleteOutcome, EditOutcome, PostService};
pub use users::UserService;

use crate::forms::FormErrors;

/// Result of a form submission that reached the business layer
#[derive(Debug)]
pub enum FormOutcome<T> {
    Saved(T),
    /// Re-render the form with these errors
    Invalid(FormErrors),
}

