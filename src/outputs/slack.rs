//! Slack mrkdwn rendering of a [`SelectionResult`].
//!
//! The message depends only on the selection itself (the date comes from
//! `selected_at`), so rendering the same artifact twice gives the same text.

use crate::models::{Selection, SelectionResult};
use crate::utils::truncate_chars;
use std::fmt::Write;

/// Slack rejects messages over 40,000 characters; leave room for the notice.
pub const MAX_MESSAGE_CHARS: usize = 39_000;

const TRUNCATION_NOTICE: &str = "\n\n_(message truncated because it was too long)_";

/// Escape the three characters Slack treats as control sequences.
pub fn escape_mrkdwn(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Percent-encode the characters that delimit a `<url|label>` link.
fn link_target(url: &str) -> String {
    url.replace('|', "%7C")
        .replace('<', "%3C")
        .replace('>', "%3E")
}

fn render_item(out: &mut String, n: usize, selection: &Selection) {
    let article = &selection.article;
    // `|` would end the link label early.
    let title = escape_mrkdwn(&article.title).replace('|', "¦");
    let _ = writeln!(out, "*{n}. <{}|{title}>*", link_target(&article.url));
    if article.section.is_empty() {
        let _ = writeln!(out, "{}", article.source);
    } else {
        let _ = writeln!(out, "{} · {}", article.source, article.section);
    }
    for line in selection.reason.lines().filter(|l| !l.trim().is_empty()) {
        let _ = writeln!(out, "> {}", escape_mrkdwn(line.trim()));
    }
    out.push('\n');
}

/// Render the shortlist, or the "no articles" notice when it is empty.
pub fn render_selection(result: &SelectionResult) -> String {
    let date = result.selected_at.format("%Y-%m-%d");
    if result.is_empty() {
        return format!(":warning: No articles were selected for translation on {date}.");
    }

    let mut out = String::new();
    let count = result.selected.len();
    let noun = if count == 1 { "article" } else { "articles" };
    let _ = writeln!(
        out,
        ":newspaper: *Translation candidates for {date}* ({count} {noun})\n"
    );
    for (i, selection) in result.selected.iter().enumerate() {
        render_item(&mut out, i + 1, selection);
    }
    out.trim_end().to_string()
}

/// Failure notice for the scheduler's error hook.
pub fn render_error(message: &str) -> String {
    format!(
        ":rotating_light: *Article curation failed*\n\n```\n{}\n```",
        message.trim()
    )
}

/// Cut `message` to Slack's limit, appending a notice when anything was dropped.
pub fn fit_message(message: String) -> String {
    match truncate_chars(&message, MAX_MESSAGE_CHARS) {
        Some(cut) => format!("{cut}{TRUNCATION_NOTICE}"),
        None => message,
    }
}
