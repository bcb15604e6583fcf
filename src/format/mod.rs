//! Assistant message formatting
//!
//! Transforms raw assistant text into a sequence of renderable nodes so
//! the presentation layer never has to re-interpret markup. The transform
//! is a pure function: no state, no IO.
//!
//! # Pipeline
//!
//! Stages run strictly in this order; later stages assume earlier ones
//! already ran:
//!
//! 1. Escape markup-significant characters (`&`, `<`, `>`), so injected
//!    markup can never be interpreted as structure downstream.
//! 2. Fenced code blocks: three backticks, an optional language token and
//!    line break, closed by the nearest three backticks.
//! 3. Inline code: a backtick-delimited run containing no backtick.
//! 4. Bold: `**`-delimited runs, matched before italics so a single `*`
//!    inside `**...**` is not misread as an italic delimiter.
//! 5. Italics: single-`*`-delimited runs containing no asterisk.
//! 6. Remaining newlines become explicit break nodes.
//!
//! The scan is an explicit tokenizer rather than chained substitutions;
//! delimiters that never close are emitted as literal text.

/// A renderable fragment of a formatted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Plain text (already markup-escaped)
    Text(String),
    /// Bold run
    Bold(String),
    /// Italic run
    Italic(String),
    /// Inline code run
    InlineCode(String),
    /// Fenced code block with its language token
    CodeBlock {
        /// Language token from the opening fence, or `"code"` when absent
        language: String,
        /// Trimmed inner text of the block
        code: String,
    },
    /// Explicit line break
    Break,
}

/// Formats raw assistant text into renderable nodes
///
/// # Arguments
///
/// * `raw` - The raw assistant reply text
///
/// # Examples
///
/// ```
/// use mitra::format::{format_message, Node};
///
/// let nodes = format_message("see `x`");
/// assert_eq!(nodes[0], Node::Text("see ".to_string()));
/// assert_eq!(nodes[1], Node::InlineCode("x".to_string()));
/// ```
pub fn format_message(raw: &str) -> Vec<Node> {
    let escaped = escape_markup(raw);
    scan(&escaped)
}

/// Escapes markup-significant characters
///
/// `&` is replaced first so already-escaped sequences cannot be produced
/// by the later replacements.
fn escape_markup(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Scans escaped text into nodes in a single left-to-right pass
fn scan(text: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut buffer = String::new();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];

        if rest.starts_with("```") {
            if let Some((node, consumed)) = try_parse_fence(rest) {
                flush_text(&mut nodes, &mut buffer);
                nodes.push(node);
                i += consumed;
                continue;
            }
        }

        if rest.starts_with("**") {
            if let Some((node, consumed)) = try_parse_bold(rest) {
                flush_text(&mut nodes, &mut buffer);
                nodes.push(node);
                i += consumed;
                continue;
            }
        }

        if rest.starts_with('`') {
            if let Some((node, consumed)) = try_parse_inline_code(rest) {
                flush_text(&mut nodes, &mut buffer);
                nodes.push(node);
                i += consumed;
                continue;
            }
        }

        if rest.starts_with('*') {
            if let Some((node, consumed)) = try_parse_italic(rest) {
                flush_text(&mut nodes, &mut buffer);
                nodes.push(node);
                i += consumed;
                continue;
            }
        }

        let Some(ch) = rest.chars().next() else { break };
        if ch == '\n' {
            flush_text(&mut nodes, &mut buffer);
            nodes.push(Node::Break);
        } else {
            buffer.push(ch);
        }
        i += ch.len_utf8();
    }

    flush_text(&mut nodes, &mut buffer);
    nodes
}

fn flush_text(nodes: &mut Vec<Node>, buffer: &mut String) {
    if !buffer.is_empty() {
        nodes.push(Node::Text(std::mem::take(buffer)));
    }
}

/// Try to parse a fenced code block at the start of `rest`
///
/// `rest` must start with three backticks. The match is non-greedy: it
/// closes at the nearest closing fence. Returns the node and the number
/// of bytes consumed, or None when no closing fence exists.
fn try_parse_fence(rest: &str) -> Option<(Node, usize)> {
    let inner_start = 3;
    let close = rest[inner_start..].find("```")?;
    let inner = &rest[inner_start..inner_start + close];

    // An opening fence may carry a language token terminated by the
    // first line break; everything else is block content.
    let (language, code) = match inner.split_once('\n') {
        Some((first_line, body)) if is_language_token(first_line) => {
            (first_line.to_string(), body)
        }
        _ => ("code".to_string(), inner),
    };

    let node = Node::CodeBlock {
        language,
        code: code.trim().to_string(),
    };
    Some((node, inner_start + close + 3))
}

fn is_language_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+' || c == '-' || c == '#')
}

/// Try to parse an inline code run at the start of `rest`
///
/// `rest` must start with a backtick. The run may not contain a
/// backtick and may not be empty.
fn try_parse_inline_code(rest: &str) -> Option<(Node, usize)> {
    let close = rest[1..].find('`')?;
    if close == 0 {
        return None;
    }
    let run = &rest[1..1 + close];
    Some((Node::InlineCode(run.to_string()), close + 2))
}

/// Try to parse a bold run at the start of `rest`
///
/// `rest` must start with `**`. The delimited run may not contain an
/// asterisk, so the first `*` after the opener must begin the closer.
fn try_parse_bold(rest: &str) -> Option<(Node, usize)> {
    let star = rest[2..].find('*')?;
    if star == 0 {
        return None;
    }
    if !rest[2 + star..].starts_with("**") {
        return None;
    }
    let run = &rest[2..2 + star];
    Some((Node::Bold(run.to_string()), star + 4))
}

/// Try to parse an italic run at the start of `rest`
///
/// `rest` must start with a single `*`. The run may not contain an
/// asterisk and may not be empty.
fn try_parse_italic(rest: &str) -> Option<(Node, usize)> {
    let close = rest[1..].find('*')?;
    if close == 0 {
        return None;
    }
    let run = &rest[1..1 + close];
    Some((Node::Italic(run.to_string()), close + 2))
}
