//! Conversions from domain values into template context.

use quill_core::Page;
use quill_core::domain::{Group, PostCard};
use quill_core::forms::FormErrors;
use quill_shared::{AuthorView, GroupOption, GroupView, PagerView, PostView};
use serde_json::{Map, Value};
use tera::Context;

use crate::middleware::auth::Identity;

pub fn post_view(card: &PostCard) -> PostView {
    PostView {
        id: card.post.id,
        text: card.post.text.clone(),
        pub_date: card.post.pub_date.format("%d %b %Y").to_string(),
        pub_date_iso: card.post.pub_date.to_rfc3339(),
        author: AuthorView {
            username: card.author.username.clone(),
        },
        group: card.group.as_ref().map(group_view),
    }
}

pub fn group_view(group: &Group) -> GroupView {
    GroupView {
        title: group.title.clone(),
        slug: group.slug.clone(),
        description: group.description.clone(),
    }
}

pub fn pager<T>(page: &Page<T>) -> PagerView {
    PagerView {
        number: page.number,
        num_pages: page.num_pages,
        count: page.count,
        has_previous: page.has_previous(),
        has_next: page.has_next(),
        previous_page_number: page.previous_page_number(),
        next_page_number: page.next_page_number(),
        page_range: page.page_range().collect(),
    }
}

pub fn group_options(groups: &[Group], selected: Option<i64>) -> Vec<GroupOption> {
    groups
        .iter()
        .map(|g| GroupOption {
            id: g.id,
            title: g.title.clone(),
            selected: Some(g.id) == selected,
        })
        .collect()
}

/// Error lists for every named field (empty when clean) plus `__all__`.
pub fn errors(errors: Option<&FormErrors>, fields: &[&str]) -> Value {
    let mut map = Map::new();
    for field in fields.iter().copied().chain([FormErrors::NON_FIELD]) {
        let messages = errors.map(|e| e.get(field).to_vec()).unwrap_or_default();
        map.insert(field.to_string(), Value::from(messages));
    }
    Value::Object(map)
}

/// Context every page starts from: the signed-in user, if any.
pub fn base_context(identity: Option<&Identity>) -> Context {
    let mut ctx = Context::new();
    ctx.insert(
        "user",
        &identity.map(|i| AuthorView {
            username: i.username.clone(),
        }),
    );
    ctx
}

/// Context for a listing: the cards on the page and its pager.
pub fn listing_context(identity: Option<&Identity>, page: &Page<PostCard>) -> Context {
    let mut ctx = base_context(identity);
    let posts: Vec<PostView> = page.object_list.iter().map(post_view).collect();
    ctx.insert("posts", &posts);
    ctx.insert("pager", &pager(page));
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::Paginator;

    #[test]
    fn test_errors_lists_every_field() {
        let value = errors(None, &["text", "group"]);
        assert_eq!(value["text"], Value::Array(vec![]));
        assert_eq!(value["group"], Value::Array(vec![]));
        assert_eq!(value["__all__"], Value::Array(vec![]));

        let form_errors = FormErrors::single("text", "This field is required.");
        let value = errors(Some(&form_errors), &["text", "group"]);
        assert_eq!(value["text"][0], "This field is required.");
    }

    #[test]
    fn test_pager_reflects_page() {
        let paginator = Paginator::new(10);
        let window = paginator.locate(Some("2"), 15);
        let page = paginator.page(window, 15, vec![(); 5]);

        let view = pager(&page);
        assert_eq!(view.number, 2);
        assert!(view.has_previous);
        assert!(!view.has_next);
        assert_eq!(view.previous_page_number, Some(1));
        assert_eq!(view.page_range, vec![1, 2]);
    }

    #[test]
    fn test_group_options_mark_selection() {
        let mut first = Group::new("A", "a", "");
        first.id = 1;
        let mut second = Group::new("B", "b", "");
        second.id = 2;

        let options = group_options(&[first, second], Some(2));
        assert!(!options[0].selected);
        assert!(options[1].selected);
    }
}
