//! Data Transfer Objects - what the templates and JSON endpoints receive.

use serde::{Deserialize, Serialize};

/// A post as shown in listings and on its detail page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: i64,
    pub text: String,
    /// Human-readable publication date, e.g. "18 Oct 2026".
    pub pub_date: String,
    /// RFC 3339 timestamp for `<time datetime>`.
    pub pub_date_iso: String,
    pub author: AuthorView,
    pub group: Option<GroupView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorView {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupView {
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// One entry of the group selector on the post form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupOption {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

/// Pager state rendered under every listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagerView {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<u64>,
    pub next_page_number: Option<u64>,
    pub page_range: Vec<u64>,
}

/// GET /health response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: String,
    pub timestamp: String,
}
