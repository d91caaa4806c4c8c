//! Rich text helpers
//!
//! Rich-text fields arrive as arrays of blocks (`paragraph`, `heading2`,
//! `list-item`, `image`, ...), each carrying its text and a list of
//! character-offset spans for inline formatting.
//!
//! [`as_text`] flattens a field to plain text and never fails. [`as_html`]
//! expands blocks to markup; its output is the only HTML the templates emit
//! unescaped, so text is escaped here and only embed markup supplied by the
//! content service itself passes through as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A rich-text block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RichTextBlock {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub spans: Vec<Span>,

    /// Block-specific fields (`url`, `alt`, `oembed`, `label`, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RichTextBlock {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: "paragraph".to_string(),
            text: text.into(),
            spans: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    fn extra_str(&self, key: &str) -> &str {
        self.extra.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

/// Inline formatting over `text[start..end]` (character offsets)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Markup produced by [`as_html`] from content-service output.
///
/// Templates render this unescaped; nothing else may construct it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrustedHtml(String);

impl TrustedHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrustedHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flatten a rich-text field to plain text, joining blocks with a space.
///
/// Missing, null or malformed fields yield an empty string. A plain string
/// (key-text field) is returned as-is.
pub fn as_text(field: &Value) -> String {
    match field {
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

/// Parse a rich-text field into blocks, skipping entries that are not blocks
pub fn blocks(field: &Value) -> Vec<RichTextBlock> {
    match field {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Expand rich-text blocks to HTML
pub fn as_html(blocks: &[RichTextBlock]) -> TrustedHtml {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for block in blocks {
        let list_tag = match block.kind.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };

        if open_list != list_tag {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list_tag {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list_tag;
        }

        html.push_str(&render_block(block));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    TrustedHtml(html)
}

fn render_block(block: &RichTextBlock) -> String {
    let kind = block.kind.as_str();
    match kind {
        "heading1" | "heading2" | "heading3" | "heading4" | "heading5" | "heading6" => {
            let level = &kind["heading".len()..];
            format!("<h{}>{}</h{}>", level, render_spans(&block.text, &block.spans), level)
        }
        "preformatted" => format!("<pre>{}</pre>", render_spans(&block.text, &block.spans)),
        "list-item" | "o-list-item" => {
            format!("<li>{}</li>", render_spans(&block.text, &block.spans))
        }
        "image" => format!(
            r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
            escape(block.extra_str("url")),
            escape(block.extra_str("alt"))
        ),
        "embed" => {
            let oembed = block.extra.get("oembed");
            let field = |key: &str| {
                oembed
                    .and_then(|o| o.get(key))
                    .and_then(Value::as_str)
                    .unwrap_or("")
            };
            format!(
                r#"<div data-oembed="{}" data-oembed-type="{}">{}</div>"#,
                escape(field("embed_url")),
                escape(field("type")),
                field("html")
            )
        }
        _ => format!("<p>{}</p>", render_spans(&block.text, &block.spans)),
    }
}

/// Apply spans to a block's text. Span offsets count UTF-16 code units.
/// Spans that overlap without nesting are closed and reopened around each
/// other so the output stays well-formed.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    // UTF-16 offset at which each char starts
    let units: Vec<usize> = chars
        .iter()
        .scan(0, |offset, c| {
            let start = *offset;
            *offset += c.len_utf16();
            Some(start)
        })
        .collect();
    // An offset inside a surrogate pair rounds up to the next char
    let char_index = |offset: usize| units.partition_point(|&start| start < offset);
    let start_of = |span: &Span| char_index(span.start);
    let end_of = |span: &Span| char_index(span.end);

    let mut sorted: Vec<&Span> = spans
        .iter()
        .filter(|s| start_of(s) < end_of(s))
        .collect();
    sorted.sort_by(|a, b| start_of(a).cmp(&start_of(b)).then(end_of(b).cmp(&end_of(a))));

    let mut out = String::with_capacity(text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;

    for i in 0..=len {
        if open.iter().any(|s| end_of(s) == i) {
            let mut reopen = Vec::new();
            while let Some(span) = open.pop() {
                out.push_str(close_tag(span));
                if end_of(span) != i {
                    reopen.push(span);
                }
                if !open.iter().any(|s| end_of(s) == i) {
                    break;
                }
            }
            for span in reopen.into_iter().rev() {
                out.push_str(&open_tag(span));
                open.push(span);
            }
        }

        while next < sorted.len() && start_of(sorted[next]) == i {
            out.push_str(&open_tag(sorted[next]));
            open.push(sorted[next]);
            next += 1;
        }

        if i < len {
            match chars[i] {
                '\n' => out.push_str("<br />"),
                c => push_escaped(&mut out, c),
            }
        }
    }

    out
}

fn open_tag(span: &Span) -> String {
    let data = |key: &str| {
        span.data
            .as_ref()
            .and_then(|d| d.get(key))
            .and_then(Value::as_str)
            .unwrap_or("")
    };

    match span.kind.as_str() {
        "strong" => "<strong>".to_string(),
        "em" => "<em>".to_string(),
        "hyperlink" => {
            let target = data("target");
            if target.is_empty() {
                format!(r#"<a href="{}">"#, escape(data("url")))
            } else {
                format!(
                    r#"<a href="{}" target="{}" rel="noopener">"#,
                    escape(data("url")),
                    escape(target)
                )
            }
        }
        "label" => format!(r#"<span class="{}">"#, escape(data("label"))),
        _ => "<span>".to_string(),
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind.as_str() {
        "strong" => "</strong>",
        "em" => "</em>",
        "hyperlink" => "</a>",
        _ => "</span>",
    }
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        c => out.push(c),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        push_escaped(&mut out, c);
    }
    out
}
