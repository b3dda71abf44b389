use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{AuthorSummary, Group, Post, PostCard, User};
use crate::error::DomainError;
use crate::forms::{FormErrors, INVALID_CHOICE, PostForm, PostFormInput};
use crate::pagination::{Page, Paginator};
use crate::ports::{GroupRepository, PostFilter, PostRepository, UserRepository};

/// A group together with one page of its posts.
#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: Group,
    pub page: Page<PostCard>,
}

/// An author together with one page of their posts.
#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: AuthorSummary,
    pub page: Page<PostCard>,
}

/// A single post and how many posts its author has written.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub card: PostCard,
    pub author_posts: u64,
}

/// Whether the acting user may edit a post.
#[derive(Debug, Clone)]
pub enum Editable {
    Allowed(Post),
    Forbidden { post_id: i64 },
}

/// Result of an edit submission.
#[derive(Debug, Clone)]
pub enum EditOutcome {
    Saved(Post),
    /// The actor is not the author; nothing was changed.
    Forbidden { post_id: i64 },
    Invalid { post: Post, errors: FormErrors },
}

/// Listing, detail and authoring of posts.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    groups: Arc<dyn GroupRepository>,
    users: Arc<dyn UserRepository>,
    paginator: Paginator,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        groups: Arc<dyn GroupRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            paginator: Paginator::default(),
        }
    }

    /// Global feed, newest first.
    pub async fn feed(&self, page: Option<&str>) -> Result<Page<PostCard>, DomainError> {
        self.page_of(PostFilter::All, page).await
    }

    pub async fn group_feed(&self, slug: &str, page: Option<&str>) -> Result<GroupFeed, DomainError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("group", slug))?;

        let page = self.page_of(PostFilter::Group(group.id), page).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile_feed(
        &self,
        username: &str,
        page: Option<&str>,
    ) -> Result<ProfileFeed, DomainError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("user", username))?;

        let page = self.page_of(PostFilter::Author(author.id), page).await?;
        Ok(ProfileFeed {
            author: summary(&author),
            page,
        })
    }

    pub async fn detail(&self, post_id: i64) -> Result<PostDetail, DomainError> {
        let post = self.find_post(post_id).await?;
        let author_posts = self.posts.count(PostFilter::Author(post.author_id)).await?;

        let card = self
            .cards(vec![post])
            .await?
            .pop()
            .ok_or_else(|| DomainError::not_found("post", post_id))?;

        Ok(PostDetail { card, author_posts })
    }

    /// Groups offered by the post form, ordered by title.
    pub async fn groups(&self) -> Result<Vec<Group>, DomainError> {
        Ok(self.groups.list().await?)
    }

    /// Validate and publish a new post by `author_id`.
    pub async fn create(
        &self,
        author_id: Uuid,
        input: &PostFormInput,
    ) -> Result<Result<Post, FormErrors>, DomainError> {
        let form = match self.clean(input).await? {
            Ok(form) => form,
            Err(errors) => return Ok(Err(errors)),
        };

        let post = self
            .posts
            .save(Post::new(author_id, form.text, form.group))
            .await?;
        tracing::info!(post_id = post.id, author_id = %author_id, "Post created");

        Ok(Ok(post))
    }

    /// Check that `actor_id` wrote the post before showing the edit form.
    pub async fn editable(&self, actor_id: Uuid, post_id: i64) -> Result<Editable, DomainError> {
        let post = self.find_post(post_id).await?;
        if post.author_id != actor_id {
            return Ok(Editable::Forbidden { post_id });
        }
        Ok(Editable::Allowed(post))
    }

    /// Apply an edit submission. Only `text` and `group` change.
    pub async fn edit(
        &self,
        actor_id: Uuid,
        post_id: i64,
        input: &PostFormInput,
    ) -> Result<EditOutcome, DomainError> {
        let mut post = match self.editable(actor_id, post_id).await? {
            Editable::Allowed(post) => post,
            Editable::Forbidden { post_id } => {
                tracing::warn!(post_id, actor_id = %actor_id, "Edit attempt by non-author");
                return Ok(EditOutcome::Forbidden { post_id });
            }
        };

        let form = match self.clean(input).await? {
            Ok(form) => form,
            Err(errors) => return Ok(EditOutcome::Invalid { post, errors }),
        };

        post.text = form.text;
        post.group_id = form.group;
        let post = self.posts.save(post).await?;
        tracing::info!(post_id, "Post updated");

        Ok(EditOutcome::Saved(post))
    }

    async fn find_post(&self, post_id: i64) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id))
    }

    /// Field checks plus "the chosen group exists".
    async fn clean(&self, input: &PostFormInput) -> Result<Result<PostForm, FormErrors>, DomainError> {
        let form = match input.clean() {
            Ok(form) => form,
            Err(errors) => return Ok(Err(errors)),
        };

        if let Some(group_id) = form.group {
            if self.groups.find_by_id(group_id).await?.is_none() {
                return Ok(Err(FormErrors::single("group", INVALID_CHOICE)));
            }
        }

        Ok(Ok(form))
    }

    async fn page_of(
        &self,
        filter: PostFilter,
        page: Option<&str>,
    ) -> Result<Page<PostCard>, DomainError> {
        let count = self.posts.count(filter).await?;
        let window = self.paginator.locate(page, count);
        let posts = self.posts.fetch(filter, window.offset, window.limit).await?;

        tracing::debug!(?filter, count, page = window.number, "Fetched post page");

        let cards = self.cards(posts).await?;
        Ok(self.paginator.page(window, count, cards))
    }

    /// Join posts with their authors and groups, keeping order.
    async fn cards(&self, posts: Vec<Post>) -> Result<Vec<PostCard>, DomainError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let mut group_ids: Vec<i64> = posts.iter().filter_map(|p| p.group_id).collect();
        group_ids.sort_unstable();
        group_ids.dedup();

        let authors: HashMap<Uuid, AuthorSummary> = self
            .users
            .find_by_ids(&author_ids)
            .await?
            .iter()
            .map(|u| (u.id, summary(u)))
            .collect();

        let groups: HashMap<i64, Group> = if group_ids.is_empty() {
            HashMap::new()
        } else {
            self.groups
                .find_by_ids(&group_ids)
                .await?
                .into_iter()
                .map(|g| (g.id, g))
                .collect()
        };

        let mut cards = Vec::with_capacity(posts.len());
        for post in posts {
            let Some(author) = authors.get(&post.author_id).cloned() else {
                tracing::warn!(post_id = post.id, "Post author missing, skipping");
                continue;
            };
            let group = post.group_id.and_then(|id| groups.get(&id).cloned());
            cards.push(PostCard { post, author, group });
        }

        Ok(cards)
    }
}

fn summary(user: &User) -> AuthorSummary {
    AuthorSummary {
        id: user.id,
        username: user.username.clone(),
    }
}
