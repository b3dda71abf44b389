//! # Quill Infrastructure
//!
//! Concrete implementations of the ports defined in `quill-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL storage via SeaORM
//! - `auth` - JWT sessions + Argon2 password hashing

pub mod database;
pub mod memory;

#[cfg(feature = "auth")]
pub mod auth;

pub use database::{DatabaseConfig, DatabaseConnections};
pub use memory::{InMemoryGroupRepository, InMemoryPostRepository, InMemoryStore, InMemoryUserRepository};

#[cfg(feature = "auth")]
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
