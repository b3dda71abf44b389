//! # Quill Shared
//!
//! Plain serializable types handed to the page templates and JSON endpoints.
//! Nothing here knows about storage or the domain crate.

pub mod dto;
pub mod response;

pub use dto::{AuthorView, GroupOption, GroupView, HealthResponse, PagerView, PostView};
pub use response::ErrorResponse;
