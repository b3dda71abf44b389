//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{GroupRepository, PostRepository, TokenService, UserRepository};
use quill_core::services::{AccountService, PostService};
use quill_infra::auth::{Argon2PasswordService, JwtTokenService};
use quill_infra::database::{DatabaseConfig, DatabaseConnections};
use quill_infra::memory::InMemoryStore;
use tera::Tera;

#[cfg(feature = "postgres")]
use quill_infra::database::{PostgresGroupRepository, PostgresPostRepository, PostgresUserRepository};

use crate::templates;

/// Where posts, groups and users live.
#[derive(Clone)]
pub enum Storage {
    Database(Arc<DatabaseConnections>),
    Memory(Arc<InMemoryStore>),
}

impl Storage {
    pub fn name(&self) -> &'static str {
        match self {
            Storage::Database(_) => "postgres",
            Storage::Memory(_) => "memory",
        }
    }

    /// Whether the backing store answers.
    pub async fn ping(&self) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Storage::Database(conn) => match conn.ping().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Database ping failed");
                    false
                }
            },
            #[cfg(not(feature = "postgres"))]
            Storage::Database(_) => false,
            Storage::Memory(_) => true,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub accounts: AccountService,
    pub tokens: Arc<dyn TokenService>,
    pub templates: Arc<Tera>,
    pub storage: Storage,
    pub cookie_secure: bool,
}

struct Repositories {
    users: Arc<dyn UserRepository>,
    groups: Arc<dyn GroupRepository>,
    posts: Arc<dyn PostRepository>,
}

impl Repositories {
    fn memory(store: &Arc<InMemoryStore>) -> Self {
        Self {
            users: Arc::new(store.users()),
            groups: Arc::new(store.groups()),
            posts: Arc::new(store.posts()),
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres(conn: &DatabaseConnections) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(conn.main.clone())),
            groups: Arc::new(PostgresGroupRepository::new(conn.main.clone())),
            posts: Arc::new(PostgresPostRepository::new(conn.main.clone())),
        }
    }
}

impl AppState {
    /// Build the application state, falling back to in-memory storage when
    /// no database is configured or reachable.
    pub async fn new(
        db_config: Option<&DatabaseConfig>,
        auto_migrate: bool,
        cookie_secure: bool,
    ) -> Result<Self, tera::Error> {
        let storage = Self::connect(db_config, auto_migrate).await;
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::from_env());

        let state = Self::assemble(storage, tokens, cookie_secure)?;
        tracing::info!(storage = state.storage.name(), "Application state initialized");
        Ok(state)
    }

    /// State over a fresh in-memory store.
    pub fn in_memory(
        store: Arc<InMemoryStore>,
        tokens: Arc<dyn TokenService>,
    ) -> Result<Self, tera::Error> {
        Self::assemble(Storage::Memory(store), tokens, false)
    }

    fn assemble(
        storage: Storage,
        tokens: Arc<dyn TokenService>,
        cookie_secure: bool,
    ) -> Result<Self, tera::Error> {
        let repos = match &storage {
            Storage::Memory(store) => Repositories::memory(store),
            #[cfg(feature = "postgres")]
            Storage::Database(conn) => Repositories::postgres(conn),
            #[cfg(not(feature = "postgres"))]
            Storage::Database(_) => unreachable!("database storage requires the postgres feature"),
        };

        Ok(Self {
            posts: PostService::new(repos.posts, repos.groups, repos.users.clone()),
            accounts: AccountService::new(repos.users, Arc::new(Argon2PasswordService::new())),
            tokens,
            templates: Arc::new(templates::load()?),
            storage,
            cookie_secure,
        })
    }

    #[cfg(feature = "postgres")]
    async fn connect(db_config: Option<&DatabaseConfig>, auto_migrate: bool) -> Storage {
        let Some(config) = db_config else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Storage::Memory(InMemoryStore::new());
        };

        match DatabaseConnections::init(config).await {
            Ok(conn) => {
                if auto_migrate {
                    use migration::MigratorTrait;

                    if let Err(e) = migration::Migrator::up(conn.main.as_ref(), None).await {
                        tracing::error!("Failed to apply migrations: {}", e);
                    } else {
                        tracing::info!("Migrations applied");
                    }
                }
                Storage::Database(Arc::new(conn))
            }
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                Storage::Memory(InMemoryStore::new())
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn connect(_db_config: Option<&DatabaseConfig>, _auto_migrate: bool) -> Storage {
        tracing::info!("Running without postgres feature - using in-memory storage");
        Storage::Memory(InMemoryStore::new())
    }
}
