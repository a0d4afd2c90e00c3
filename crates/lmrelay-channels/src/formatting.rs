//! Text preparation for Telegram.
//!
//! Telegram accepts a small HTML subset. Model output and the model-name
//! reply use Markdown, which is converted here:
//!
//! - fenced code → `<pre><code>`
//! - inline code → `<code>`
//! - `**bold**`, `__bold__` → `<b>`
//! - `_italic_` → `<i>` (never inside snake_case words)
//! - `~~strike~~` → `<s>`
//! - `[text](url)` → `<a href>`
//! - headers and blockquote markers are dropped, bullets become `•`
//!
//! Long replies are split on the source text first, and every chunk is
//! formatted on its own with a plain-text fallback.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use lmrelay_core::bus::ContentFormat;

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($pattern).expect("static regex pattern"));
    };
}

static_regex!(CODE_BLOCK, r"(?s)```(?:\w+)?\n?(.*?)```");
static_regex!(INLINE_CODE, r"`([^`]+)`");
static_regex!(HEADER, r"(?m)^#{1,6}\s+(.+)$");
static_regex!(BLOCKQUOTE, r"(?m)^>\s?(.*)$");
static_regex!(LINK, r"\[([^\]]+)\]\(([^)]+)\)");
static_regex!(BOLD_STAR, r"\*\*(.+?)\*\*");
static_regex!(BOLD_UNDERSCORE, r"__(.+?)__");
static_regex!(ITALIC, r"(^|[^a-zA-Z0-9_])_([^_]+?)_($|[^a-zA-Z0-9_])");
static_regex!(STRIKE, r"~~(.+?)~~");
static_regex!(BULLET, r"(?m)^[\s]*[-*]\s+");

/// Escape the three characters Telegram's HTML parser treats specially.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Replace every match with a NUL-delimited placeholder and keep the capture.
fn stash(re: &Regex, text: &str, tag: &str, store: &mut Vec<String>) -> String {
    re.replace_all(text, |caps: &Captures| {
        store.push(caps[1].to_string());
        format!("\x00{tag}{}\x00", store.len() - 1)
    })
    .into_owned()
}

/// Convert Markdown text to Telegram-compatible HTML.
pub fn markdown_to_telegram_html(text: &str) -> String {
    // Code is lifted out first so nothing below rewrites it.
    let mut blocks = Vec::new();
    let mut inline = Vec::new();
    let text = stash(&CODE_BLOCK, text, "CB", &mut blocks);
    let text = stash(&INLINE_CODE, &text, "IC", &mut inline);

    let text = HEADER.replace_all(&text, "$1");
    let text = BLOCKQUOTE.replace_all(&text, "$1");
    let text = escape_html(&text);

    let text = LINK.replace_all(&text, r#"<a href="$2">$1</a>"#);
    let text = BOLD_STAR.replace_all(&text, "<b>$1</b>");
    let text = BOLD_UNDERSCORE.replace_all(&text, "<b>$1</b>");
    let text = ITALIC.replace_all(&text, "$1<i>$2</i>$3");
    let text = STRIKE.replace_all(&text, "<s>$1</s>");
    let mut text = BULLET.replace_all(&text, "• ").into_owned();

    for (idx, code) in inline.iter().enumerate() {
        text = text.replace(
            &format!("\x00IC{idx}\x00"),
            &format!("<code>{}</code>", escape_html(code)),
        );
    }
    for (idx, code) in blocks.iter().enumerate() {
        text = text.replace(
            &format!("\x00CB{idx}\x00"),
            &format!("<pre><code>{}</code></pre>", escape_html(code)),
        );
    }

    text
}

/// Largest char boundary of `text` that is `<= index`.
fn floor_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Split `text` into chunks of at most `max_len` bytes.
///
/// Prefers the last newline inside the limit; the newline itself is dropped.
/// Never cuts inside a UTF-8 character and never yields an empty chunk for
/// non-empty input.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let limit = floor_boundary(remaining, max_len);
        let split_at = match remaining[..limit].rfind('\n') {
            Some(pos) if pos > 0 => pos,
            _ if limit > 0 => limit,
            // max_len is smaller than the first character
            _ => remaining.chars().next().map_or(1, char::len_utf8),
        };

        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk.to_string());
        remaining = rest.strip_prefix('\n').unwrap_or(rest);
    }

    chunks
}

/// One outgoing message of a possibly longer reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// HTML rendering of this piece, if it has one within the limit.
    pub html: Option<String>,
    /// Sent instead when there is no HTML or it is rejected.
    pub plain: String,
}

/// Split `content` into messages of at most `max_len` bytes and render each
/// piece for Telegram independently.
pub fn plan_chunks(content: &str, format: ContentFormat, max_len: usize) -> Vec<Chunk> {
    split_message(content, max_len)
        .into_iter()
        .map(|piece| {
            let html = match format {
                ContentFormat::Plain => None,
                ContentFormat::Html => Some(piece.clone()),
                ContentFormat::Markdown => Some(markdown_to_telegram_html(&piece)),
            }
            .filter(|html| html.len() <= max_len);
            Chunk { html, plain: piece }
        })
        .collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
