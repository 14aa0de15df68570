//! Link and icon normalization, slugs.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::SiteUrl;

/// Slug used when an identifier has no alphanumeric characters.
pub const FALLBACK_SLUG: &str = "item";

static NON_ALNUM_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Turn a raw link or image reference into an absolute URL.
///
/// - `http://` / `https://` values are returned unchanged
/// - `/path` becomes `<site>/path`
/// - anything else becomes `<site>/<raw>`
///
/// Returns `None` for absent or blank input.
pub fn normalize_url(raw: Option<&str>, site: &SiteUrl) -> Option<String> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    if raw.starts_with("http://") || raw.starts_with("https://") {
        Some(raw.to_string())
    } else if raw.starts_with('/') {
        Some(format!("{}{}", site, raw))
    } else {
        Some(format!("{}/{}", site, raw))
    }
}

/// Lowercase, hyphen-separated, URL-safe identifier.
pub fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let slug = NON_ALNUM_RUN.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}
