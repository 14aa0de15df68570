//! Content files: categories, frontmatter and link targets.

pub mod frontmatter;
pub mod target;
pub mod url;

pub use frontmatter::{parse_frontmatter, Frontmatter};
pub use target::TargetBuilder;
pub use url::{normalize_url, slugify};

use serde::Serialize;

/// Content category, decided by the top-level directory of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Notification,
    News,
    Places,
    Other,
}

impl Category {
    /// Categories that are watched for changes.
    pub const WATCHED: [Category; 3] = [Category::Notification, Category::News, Category::Places];

    /// Classify a repository-relative path (forward slashes).
    pub fn from_path(path: &str) -> Self {
        Self::WATCHED
            .into_iter()
            .find(|c| c.prefix().is_some_and(|p| path.starts_with(p)))
            .unwrap_or(Category::Other)
    }

    /// Directory prefix for this category.
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            Category::Notification => Some("_notifications/"),
            Category::News => Some("_news/"),
            Category::Places => Some("_places/"),
            Category::Other => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Notification => "notification",
            Category::News => "news",
            Category::Places => "places",
            Category::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
