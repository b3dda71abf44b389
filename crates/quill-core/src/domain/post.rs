use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Group;

/// Characters of the text shown when a post is displayed as a label.
const LABEL_CHARS: usize = 15;

/// Post entity - a single authored text entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub text: String,
    /// Set once on creation and never updated.
    pub pub_date: DateTime<Utc>,
    pub author_id: Uuid,
    pub group_id: Option<i64>,
}

impl Post {
    /// Create an unsaved post; storage assigns the id.
    pub fn new(author_id: Uuid, text: String, group_id: Option<i64>) -> Self {
        Self {
            id: 0,
            text,
            pub_date: Utc::now(),
            author_id,
            group_id,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id == 0
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text.char_indices().nth(LABEL_CHARS) {
            Some((cut, _)) => f.write_str(&self.text[..cut]),
            None => f.write_str(&self.text),
        }
    }
}

/// Public part of a user shown next to their posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
}

/// A post joined with its author and group, ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCard {
    pub post: Post,
    pub author: AuthorSummary,
    pub group: Option<Group>,
}
