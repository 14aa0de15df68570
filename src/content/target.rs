//! Destination URLs for notifications.

use std::path::Path;

use crate::config::{SiteUrl, TargetsConfig};

use super::url::{normalize_url, slugify};
use super::{Category, Frontmatter};

/// Placeholder replaced with the file's slug in a target template.
pub const SLUG_PLACEHOLDER: &str = "{slug}";

/// Builds the link a notification opens, per content category.
#[derive(Debug, Clone, Copy)]
pub struct TargetBuilder<'a> {
    site: &'a SiteUrl,
    templates: &'a TargetsConfig,
}

impl<'a> TargetBuilder<'a> {
    pub fn new(site: &'a SiteUrl, templates: &'a TargetsConfig) -> Self {
        Self { site, templates }
    }

    /// An explicit `target_url` wins. Otherwise the category template is
    /// rendered with a slug taken from `id`, `slug` or the file stem.
    pub fn build(&self, frontmatter: &Frontmatter, path: &Path, category: Category) -> String {
        if let Some(url) = normalize_url(frontmatter.target_url.as_deref(), self.site) {
            return url;
        }

        let template = self.templates.template_for(category);
        let rendered = if template.contains(SLUG_PLACEHOLDER) {
            let identifier = frontmatter
                .identifier()
                .map(str::to_string)
                .unwrap_or_else(|| file_stem(path));
            template.replace(SLUG_PLACEHOLDER, &slugify(&identifier))
        } else {
            template.to_string()
        };

        normalize_url(Some(&rendered), self.site).unwrap_or_else(|| format!("{}/", self.site))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
