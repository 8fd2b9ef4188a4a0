//! Markup helpers: encoding, grapheme measurement, entity-safe truncation, and a tiny tokenizer
//! for the subset of HTML the editor produces (paragraph-like elements, void rules and breaks,
//! text with the five basic entities). Attributes are skipped.

use unicode_segmentation::UnicodeSegmentation;

/// Elements that never have children or a closing tag.
pub const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "wbr"];

pub fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Escape markup-significant characters for safe insertion as HTML.
pub fn encode_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of `encode_html` plus `&#39;`, `&apos;` and `&nbsp;`. Unknown entities are kept
/// verbatim.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = entity_end(tail) else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };
        let replacement = match &tail[1..semi] {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" | "#39" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => None,
        };
        match replacement {
            Some(c) => out.push(c),
            None => out.push_str(&tail[..=semi]),
        }
        rest = &tail[semi + 1..];
    }
    out.push_str(rest);
    out
}

/// Byte index of the `;` closing an entity that starts at `s[0] == '&'`.
fn entity_end(s: &str) -> Option<usize> {
    let semi = s.find(';')?;
    let name = &s[1..semi];
    let valid = !name.is_empty()
        && name.len() <= 8
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '#');
    valid.then_some(semi)
}

pub fn grapheme_len(text: &str) -> usize {
    text.graphemes(true).count()
}

/// Byte index of the grapheme boundary `n` clusters into `text` (clamped to the end).
pub fn grapheme_byte_index(text: &str, n: usize) -> usize {
    text.grapheme_indices(true)
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Keep at most `budget` grapheme clusters of already-encoded text.
///
/// An entity counts with its full encoded length and is either kept whole or dropped, so the
/// result is always well-formed markup text. Truncation stops at the first unit that does not
/// fit; nothing after it is considered.
pub fn truncate_encoded(encoded: &str, budget: usize) -> String {
    let mut used = 0usize;
    let mut end = 0usize;
    let mut rest = encoded;
    while !rest.is_empty() {
        let unit_bytes = if rest.starts_with('&') {
            entity_end(rest).map(|semi| semi + 1)
        } else {
            None
        }
        .unwrap_or_else(|| rest.graphemes(true).next().map(str::len).unwrap_or(rest.len()));
        let unit = &rest[..unit_bytes];
        let cost = grapheme_len(unit);
        if used + cost > budget {
            break;
        }
        used += cost;
        end += unit_bytes;
        rest = &rest[unit_bytes..];
    }
    encoded[..end].to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Open { tag: String, void: bool },
    Close(String),
    Text(String),
}

pub(crate) fn tokenize(html: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = html;
    while !rest.is_empty() {
        if let Some(body) = rest.strip_prefix('<') {
            let Some(close) = body.find('>') else {
                // dangling '<' is literal text
                tokens.push(Token::Text(decode_entities(rest)));
                break;
            };
            let inner = body[..close].trim();
            rest = &body[close + 1..];
            if let Some(name) = inner.strip_prefix('/') {
                tokens.push(Token::Close(name.trim().to_ascii_lowercase()));
                continue;
            }
            let self_closing = inner.ends_with('/');
            let tag: String = inner
                .trim_end_matches('/')
                .split(|c: char| c.is_whitespace())
                .next()
                .unwrap_or("")
                .to_ascii_lowercase();
            if tag.is_empty() || tag.starts_with('!') {
                continue;
            }
            let void = self_closing || is_void(&tag);
            tokens.push(Token::Open { tag, void });
        } else {
            let next = rest.find('<').unwrap_or(rest.len());
            tokens.push(Token::Text(decode_entities(&rest[..next])));
            rest = &rest[next..];
        }
    }
    tokens
}
