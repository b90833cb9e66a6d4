//! Rich-text rendering
//!
//! Rich-text fields arrive as an array of blocks (`paragraph`, `heading2`,
//! `list-item`, ...), each with plain text and a list of spans marking
//! character ranges as bold, italic, links or labels.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::helpers::{html_escape, text_to_html};

/// HTML that is written to pages without escaping
///
/// Only produced by the rich-text renderer; the content repository is
/// trusted to have sanitized the source material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustedHtml(String);

impl TrustedHtml {
    /// Mark a string as trusted HTML
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TrustedHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A rich-text block
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub oembed: Option<Embed>,
}

/// A formatted character range within a block
#[derive(Debug, Clone, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpanData {
    pub url: Option<String>,
    pub target: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Embed {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub embed_url: Option<String>,
    pub provider_name: Option<String>,
    pub html: Option<String>,
}

/// Parse a rich-text field
pub fn parse(value: &serde_json::Value) -> Result<Vec<Block>, serde_json::Error> {
    serde_json::from_value(value.clone())
}

/// Render blocks to HTML
pub fn as_html(blocks: &[Block]) -> TrustedHtml {
    let mut out = String::new();
    let mut i = 0;

    while i < blocks.len() {
        let block = &blocks[i];
        match block.kind.as_str() {
            kind @ ("list-item" | "o-list-item") => {
                let tag = if kind == "list-item" { "ul" } else { "ol" };
                out.push_str(&format!("<{}>", tag));
                while i < blocks.len() && blocks[i].kind == kind {
                    out.push_str(&format!("<li>{}</li>", render_spans(&blocks[i])));
                    i += 1;
                }
                out.push_str(&format!("</{}>", tag));
                continue;
            }
            "paragraph" => out.push_str(&format!("<p>{}</p>", render_spans(block))),
            "preformatted" => out.push_str(&format!("<pre>{}</pre>", render_spans(block))),
            "heading1" | "heading2" | "heading3" | "heading4" | "heading5" | "heading6" => {
                let level = &block.kind["heading".len()..];
                out.push_str(&format!("<h{0}>{1}</h{0}>", level, render_spans(block)));
            }
            "image" => {
                out.push_str(&format!(
                    r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                    html_escape(block.url.as_deref().unwrap_or_default()),
                    html_escape(block.alt.as_deref().unwrap_or_default())
                ));
            }
            "embed" => {
                let embed = block.oembed.clone().unwrap_or_default();
                out.push_str(&format!(
                    r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
                    html_escape(embed.embed_url.as_deref().unwrap_or_default()),
                    html_escape(embed.kind.as_deref().unwrap_or_default()),
                    html_escape(embed.provider_name.as_deref().unwrap_or_default()),
                    embed.html.unwrap_or_default()
                ));
            }
            other => tracing::debug!("Skipping unsupported rich-text block {:?}", other),
        }
        i += 1;
    }

    TrustedHtml(out)
}

/// Flatten blocks to plain text
pub fn as_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn open_tag(span: &Span) -> String {
    let data = span.data.clone().unwrap_or_default();
    match span.kind.as_str() {
        "strong" => "<strong>".to_string(),
        "em" => "<em>".to_string(),
        "hyperlink" => {
            let href = html_escape(data.url.as_deref().unwrap_or_default());
            match data.target {
                Some(target) => format!(
                    r#"<a href="{}" target="{}" rel="noopener noreferrer">"#,
                    href,
                    html_escape(&target)
                ),
                None => format!(r#"<a href="{}">"#, href),
            }
        }
        "label" => format!(
            r#"<span class="{}">"#,
            html_escape(data.label.as_deref().unwrap_or_default())
        ),
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

/// Render a block's text with its spans applied
///
/// Offsets count characters. Spans that overlap without nesting are
/// closed and reopened around the boundary so the output stays well formed.
fn render_spans(block: &Block) -> String {
    let chars: Vec<char> = block.text.chars().collect();

    let mut spans: Vec<&Span> = block.spans.iter().filter(|s| s.end > s.start).collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::new();
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;

    for pos in 0..=chars.len() {
        if open.iter().any(|s| s.end <= pos) {
            let mut reopen = Vec::new();
            while open.iter().any(|s| s.end <= pos) {
                let Some(top) = open.pop() else { break };
                out.push_str(close_tag(top));
                if top.end > pos {
                    reopen.push(top);
                }
            }
            while let Some(span) = reopen.pop() {
                out.push_str(&open_tag(span));
                open.push(span);
            }
        }

        if pos == chars.len() {
            break;
        }

        while next < spans.len() && spans[next].start == pos {
            out.push_str(&open_tag(spans[next]));
            open.push(spans[next]);
            next += 1;
        }

        let mut buf = [0u8; 4];
        out.push_str(&text_to_html(chars[pos].encode_utf8(&mut buf)));
    }

    while let Some(span) = open.pop() {
        out.push_str(close_tag(span));
    }

    out
}
