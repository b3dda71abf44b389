use std::fmt;

use serde::{Deserialize, Serialize};

/// Group entity - a named community a post may belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub title: String,
    /// Unique URL key, e.g. `/group/<slug>/`.
    pub slug: String,
    pub description: String,
}

impl Group {
    /// Create an unsaved group; storage assigns the id.
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            title: title.into(),
            slug: slug.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}
