//! In-memory storage - used when no database is configured, and by tests.
//!
//! All repositories share one [`InMemoryStore`], so the relational rules hold
//! across them: deleting a user deletes their posts, deleting a group leaves
//! its posts group-less. Data is lost on process restart.

mod store;

pub use store::{InMemoryGroupRepository, InMemoryPostRepository, InMemoryStore, InMemoryUserRepository};
