//! Post pages: listings, detail, create and edit.

use actix_web::{HttpResponse, web};
use quill_core::domain::Post;
use quill_core::forms::{FormErrors, PostFormInput};
use quill_core::services::{EditOutcome, Editable};
use quill_shared::AuthorView;

use super::{PageQuery, redirect, render};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::views;

const POST_FORM_FIELDS: &[&str] = &["text", "group"];

/// GET /
pub async fn index(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    query: PageQuery,
) -> AppResult<HttpResponse> {
    let page = state.posts.feed(query.page.as_deref()).await?;

    let mut ctx = views::listing_context(identity.as_ref(), &page);
    ctx.insert("show_group_link", &true);
    render(&state, "posts/index.html", &ctx)
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
    query: PageQuery,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let feed = state.posts.group_feed(&slug, query.page.as_deref()).await?;
    tracing::debug!(
        slug = %slug,
        page = feed.page.number,
        shown = feed.page.len(),
        "Group feed"
    );

    let mut ctx = views::listing_context(identity.as_ref(), &feed.page);
    ctx.insert("group", &views::group_view(&feed.group));
    ctx.insert("show_group_link", &false);
    render(&state, "posts/group_list.html", &ctx)
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
    query: PageQuery,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let feed = state
        .posts
        .profile_feed(&username, query.page.as_deref())
        .await?;

    let mut ctx = views::listing_context(identity.as_ref(), &feed.page);
    ctx.insert(
        "author",
        &AuthorView {
            username: feed.author.username.clone(),
        },
    );
    ctx.insert("posts_count", &feed.page.count);
    ctx.insert("show_group_link", &true);
    render(&state, "posts/profile.html", &ctx)
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let detail = state.posts.detail(path.into_inner()).await?;
    let is_author = identity
        .as_ref()
        .is_some_and(|i| i.user_id == detail.card.post.author_id);

    let mut ctx = views::base_context(identity.as_ref());
    ctx.insert("post", &views::post_view(&detail.card));
    ctx.insert("post_label", &detail.card.post.to_string());
    ctx.insert("author_posts", &detail.author_posts);
    ctx.insert("is_author", &is_author);
    render(&state, "posts/post_detail.html", &ctx)
}

/// GET /create/
pub async fn post_create_form(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    post_form_page(&state, &identity, None, &PostFormInput::default(), None).await
}

/// POST /create/
pub async fn post_create(
    state: web::Data<AppState>,
    identity: Identity,
    form: web::Form<Vec<(String, String)>>,
) -> AppResult<HttpResponse> {
    let input: PostFormInput = form.into_inner().into_iter().collect();

    match state.posts.create(identity.user_id, &input).await? {
        Ok(_) => Ok(redirect(&format!("/profile/{}/", identity.username))),
        Err(errors) => {
            tracing::debug!(author = %identity.username, "Rejected post submission");
            post_form_page(&state, &identity, None, &input, Some(&errors)).await
        }
    }
}

/// GET /posts/{post_id}/edit/
pub async fn post_edit_form(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();

    match state.posts.editable(identity.user_id, post_id).await? {
        Editable::Allowed(post) => {
            let input = prefill(&post);
            post_form_page(&state, &identity, Some(post.id), &input, None).await
        }
        Editable::Forbidden { post_id } => Ok(redirect(&detail_url(post_id))),
    }
}

/// POST /posts/{post_id}/edit/
pub async fn post_edit(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
    form: web::Form<Vec<(String, String)>>,
) -> AppResult<HttpResponse> {
    let input: PostFormInput = form.into_inner().into_iter().collect();

    match state
        .posts
        .edit(identity.user_id, path.into_inner(), &input)
        .await?
    {
        EditOutcome::Saved(post) => Ok(redirect(&detail_url(post.id))),
        EditOutcome::Forbidden { post_id } => Ok(redirect(&detail_url(post_id))),
        EditOutcome::Invalid { post, errors } => {
            post_form_page(&state, &identity, Some(post.id), &input, Some(&errors)).await
        }
    }
}

fn detail_url(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}

/// Form values mirroring a stored post.
fn prefill(post: &Post) -> PostFormInput {
    PostFormInput {
        text: post.text.clone(),
        group: post.group_id.map(|id| id.to_string()),
    }
}

/// The create/edit form. `post_id` set means editing.
async fn post_form_page(
    state: &AppState,
    identity: &Identity,
    post_id: Option<i64>,
    input: &PostFormInput,
    errors: Option<&FormErrors>,
) -> AppResult<HttpResponse> {
    let groups = state.posts.groups().await?;
    let selected = input
        .group
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i64>().ok());

    let mut ctx = views::base_context(Some(identity));
    ctx.insert("is_edit", &post_id.is_some());
    ctx.insert("post_id", &post_id);
    ctx.insert("form", input);
    ctx.insert("groups", &views::group_options(&groups, selected));
    ctx.insert("errors", &views::errors(errors, POST_FORM_FIELDS));
    render(state, "posts/create_post.html", &ctx)
}
