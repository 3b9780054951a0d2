//! Inline markdown → HTML fragment rendering.

use super::{html_escape, RenderedElement};
use crate::markdown::tokenizer::{scan_inline, InlineKind, InlineMatch};

/// Render the fixed inline pattern table over `text`.
///
/// Uses the same priority alternation as the tokenizer; text outside any
/// construct, and the content inside one, is HTML-escaped but not parsed
/// again.
pub fn render_inline_markdown(text: &str) -> String {
    let mut html = String::with_capacity(text.len() + 16);
    let mut pos = 0;

    for m in scan_inline(text) {
        html.push_str(&html_escape(&text[pos..m.range.start]));
        push_construct(&mut html, &m);
        pos = m.range.end;
    }
    html.push_str(&html_escape(&text[pos..]));
    html
}

fn push_construct(html: &mut String, m: &InlineMatch<'_>) {
    let content = html_escape(m.content);
    let fragment = match m.kind {
        InlineKind::BoldItalic => format!("<strong><em>{}</em></strong>", content),
        InlineKind::Bold => format!("<strong>{}</strong>", content),
        InlineKind::Italic => format!("<em>{}</em>", content),
        InlineKind::Strikethrough => format!("<del>{}</del>", content),
        InlineKind::Code => format!("<code>{}</code>", content),
        InlineKind::Link => format!(
            "<a href=\"{}\">{}</a>",
            html_escape(m.url.unwrap_or_default()),
            content
        ),
        InlineKind::Heading(level) => format!("<h{level}>{}</h{level}>", content.trim_end()),
    };
    html.push_str(&fragment);
}

/// Render a token's source text into an inline element.
pub fn render(source_text: &str) -> RenderedElement {
    RenderedElement::inline(source_text, render_inline_markdown(source_text))
}
