//! Live rendering of markdown tokens
//!
//! This module turns scanned tokens into rendered HTML fragments and keeps
//! the text surface's replacement marks in sync with the caret.
//!
//! # Example
//! ```ignore
//! use crate::render::{render, RenderManager};
//!
//! let element = render("**bold**");
//! assert_eq!(element.html, "<strong>bold</strong>");
//!
//! let mut manager = RenderManager::new(RenderSettings::default());
//! manager.update_rendering(&mut surface);
//! ```

mod inline;
mod manager;
mod table;

pub use inline::{render, render_inline_markdown};
pub use manager::{cursor_outside, Decoration, DecorationSnapshot, RenderManager};
pub use table::{column_alignments, render_table, Alignment};

// ─────────────────────────────────────────────────────────────────────────────
// Rendered Element
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of rendered element; un-rendering differs between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Inline,
    Table,
}

/// The visual replacement for a token's source range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedElement {
    pub kind: ElementKind,
    /// Inner HTML of the container
    pub html: String,
    /// Source text the element stands for (the `data-original` attribute)
    pub original: String,
}

impl RenderedElement {
    /// An inline `<span>` element.
    pub fn inline(original: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Inline,
            html: html.into(),
            original: original.into(),
        }
    }

    /// A `<div class="rendered-table">` element.
    pub fn table(original: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Table,
            html: html.into(),
            original: original.into(),
        }
    }

    /// The container element with its content and `data-original` attribute.
    pub fn outer_html(&self) -> String {
        match self.kind {
            ElementKind::Inline => format!(
                "<span data-original=\"{}\">{}</span>",
                html_escape(&self.original),
                self.html
            ),
            ElementKind::Table => format!(
                "<div class=\"rendered-table\" data-original=\"{}\">{}</div>",
                html_escape(&self.original),
                self.html
            ),
        }
    }
}

/// HTML-escape a string.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
