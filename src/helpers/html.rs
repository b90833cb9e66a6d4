//! HTML helper functions

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape text content, turning line breaks into `<br />`
pub fn text_to_html(s: &str) -> String {
    html_escape(s).replace('\n', "<br />")
}

/// Only the text before the first line break
pub fn first_line(s: &str) -> &str {
    s.split('\n').next().unwrap_or_default().trim_end_matches('\r')
}
