//! Services - the page-independent logic behind every view.

mod accounts;
mod posts;

pub use accounts::AccountService;
pub use posts::{EditOutcome, Editable, GroupFeed, PostDetail, PostService, ProfileFeed};
