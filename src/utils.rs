//! Small text helpers shared by the stages.
//!
//! - Truncation for logs and chat messages
//! - JSON error classification for cut-off model responses
//! - HTML stripping for feed summaries

use scraper::{ElementRef, Html};

/// Elements whose boundaries separate words in the rendered text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol",
    "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Keep at most `max` characters of `s`.
///
/// Returns `None` when `s` already fits.
pub fn truncate_chars(s: &str, max: usize) -> Option<&str> {
    s.char_indices().nth(max).map(|(idx, _)| &s[..idx])
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// A completion cut off by the token limit fails to parse with an EOF error.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reduce an HTML fragment (as found in feed titles and descriptions) to its
/// plain text.
///
/// Inline markup is dropped without touching the surrounding text; block
/// elements and `<br>` become a single space.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(strip_html("<a href=\"#\">Apple</a>'s <b>new</b> chip"), "Apple's new chip");
/// assert_eq!(strip_html("<p>One.</p><p>Two.</p>"), "One. Two.");
/// ```
pub fn strip_html(fragment: &str) -> String {
    if !fragment.contains('<') {
        return collapse_whitespace(fragment);
    }
    let doc = Html::parse_fragment(fragment);
    let mut text = String::with_capacity(fragment.len());
    push_text(doc.root_element(), &mut text);
    collapse_whitespace(&text)
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    let block = BLOCK_ELEMENTS.contains(&element.value().name());
    if block {
        out.push(' ');
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            push_text(child, out);
        }
    }
    if block {
        out.push(' ');
    }
}
