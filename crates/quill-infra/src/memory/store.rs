use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Group, Post, User};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, GroupRepository, PostFilter, PostRepository, UserRepository};

#[derive(Default)]
struct Tables {
    users: BTreeMap<Uuid, User>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, Post>,
    last_group_id: i64,
    last_post_id: i64,
}

impl Tables {
    /// Posts matching `filter`, newest first.
    fn posts_matching(&self, filter: PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self.posts.values().filter(|p| filter.matches(p)).collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }
}

/// Shared tables behind the in-memory repositories.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn users(self: &Arc<Self>) -> InMemoryUserRepository {
        InMemoryUserRepository {
            store: Arc::clone(self),
        }
    }

    pub fn groups(self: &Arc<Self>) -> InMemoryGroupRepository {
        InMemoryGroupRepository {
            store: Arc::clone(self),
        }
    }

    pub fn posts(self: &Arc<Self>) -> InMemoryPostRepository {
        InMemoryPostRepository {
            store: Arc::clone(self),
        }
    }
}

pub struct InMemoryUserRepository {
    store: Arc<InMemoryStore>,
}

pub struct InMemoryGroupRepository {
    store: Arc<InMemoryStore>,
}

pub struct InMemoryPostRepository {
    store: Arc<InMemoryStore>,
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.store.tables.read().await.users.get(&id).cloned())
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.store.tables.write().await;

        let taken = tables
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id);
        if taken {
            return Err(RepoError::Constraint(format!(
                "duplicate username: {}",
                user.username
            )));
        }

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Cascades to the user's posts.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.users.remove(&id).ok_or(RepoError::NotFound)?;

        let before = tables.posts.len();
        tables.posts.retain(|_, post| post.author_id != id);
        tracing::debug!(user_id = %id, removed = before - tables.posts.len(), "Cascaded user delete");

        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }
}

#[async_trait]
impl BaseRepository<Group, i64> for InMemoryGroupRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Group>, RepoError> {
        Ok(self.store.tables.read().await.groups.get(&id).cloned())
    }

    async fn save(&self, mut group: Group) -> Result<Group, RepoError> {
        let mut tables = self.store.tables.write().await;

        let taken = tables
            .groups
            .values()
            .any(|g| g.slug == group.slug && g.id != group.id);
        if taken {
            return Err(RepoError::Constraint(format!("duplicate slug: {}", group.slug)));
        }

        if group.id == 0 {
            tables.last_group_id += 1;
            group.id = tables.last_group_id;
        } else {
            tables.last_group_id = tables.last_group_id.max(group.id);
        }

        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    /// Posts of the deleted group stay, without a group.
    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.groups.remove(&id).ok_or(RepoError::NotFound)?;

        for post in tables.posts.values_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.groups.get(id).cloned()).collect())
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let tables = self.store.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl BaseRepository<Post, i64> for InMemoryPostRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, RepoError> {
        Ok(self.store.tables.read().await.posts.get(&id).cloned())
    }

    async fn save(&self, mut post: Post) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;

        if !tables.users.contains_key(&post.author_id) {
            return Err(RepoError::Constraint(format!(
                "foreign key: author {} does not exist",
                post.author_id
            )));
        }
        if let Some(group_id) = post.group_id {
            if !tables.groups.contains_key(&group_id) {
                return Err(RepoError::Constraint(format!(
                    "foreign key: group {group_id} does not exist"
                )));
            }
        }

        if post.is_new() {
            tables.last_post_id += 1;
            post.id = tables.last_post_id;
        } else {
            tables.last_post_id = tables.last_post_id.max(post.id);
            // pub_date is write-once.
            if let Some(existing) = tables.posts.get(&post.id) {
                post.pub_date = existing.pub_date;
            }
        }

        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.posts.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.posts.values().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn fetch(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .posts_matching(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
