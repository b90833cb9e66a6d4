//! URL helper functions

/// Generate a URL under the site root
///
/// # Examples
/// ```ignore
/// url_for("/blog/", "/assets/style.css") // -> "/blog/assets/style.css"
/// ```
pub fn url_for(root: &str, path: &str) -> String {
    let root = root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Whether a slug is safe to use as a single path segment
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
