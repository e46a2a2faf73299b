//! Shared text utilities for panebridge.
//!
//! Pane captures and stored job output are plain text handled line-wise;
//! these helpers keep the slicing rules in one place.

/// Return the last `n` lines of `text`, joined with `\n`.
///
/// Line splitting follows [`str::lines`], so `\r\n` endings are accepted and a
/// trailing newline does not produce an empty final line. Returns the whole
/// text (re-joined) when it has fewer than `n` lines, and an empty string for
/// `n == 0`.
pub fn tail_lines(text: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

/// Split `text` into lines on every terminal line boundary.
///
/// Breaks on `\n`, `\r`, `\r\n` (one break), vertical tab, form feed,
/// `\x1c`..=`\x1e`, NEL, and the Unicode line and paragraph separators.
/// A trailing boundary does not produce an empty final line, and empty text has
/// no lines. Unlike [`str::lines`], a lone `\r` splits: typed into a terminal
/// it would submit the line early.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if !is_line_boundary(ch) {
            continue;
        }
        lines.push(&text[start..idx]);
        start = idx + ch.len_utf8();
        if ch == '\r' {
            if let Some(&(next, '\n')) = chars.peek() {
                chars.next();
                start = next + 1;
            }
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn is_line_boundary(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Return the last `n` characters of `text` (chars, not bytes).
pub fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Number of lines in `text`, counted the same way as [`tail_lines`].
pub fn line_count(text: &str) -> usize {
    text.lines().count()
}

/// Escape the HTML special characters in `text`.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
