//! # Quill Core
//!
//! The domain layer of Quill, a small community blogging platform.
//! This crate contains the entities, pagination and form rules, and the
//! services that drive every page. It has zero infrastructure dependencies:
//! storage and authentication are reached through the traits in [`ports`].

pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod ports;
pub mod services;

pub use error::DomainError;
pub use pagination::{POSTS_PER_PAGE, Page, PageWindow, Paginator};
