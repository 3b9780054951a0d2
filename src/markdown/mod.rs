//! Markdown text processing
//!
//! This module holds everything that works on raw markdown text without
//! touching a text surface:
//! - `tokenizer`: scanning a document into renderable tokens
//! - `formatting`: keyboard formatting commands over raw text
//! - `highlight`: line classifier for styling un-rendered source
//!
//! # Example
//! ```ignore
//! use crate::markdown::{scan, apply_raw_format, MarkdownFormatCommand};
//!
//! let tokens = scan("*a* and *b*");
//! assert_eq!(tokens.len(), 2);
//!
//! let result = apply_raw_format("word", (0, 4), MarkdownFormatCommand::Bold);
//! assert_eq!(result.text, "**word**");
//! ```

pub mod formatting;
pub mod highlight;
pub mod tokenizer;

pub use formatting::{apply_raw_format, FormatResult, MarkdownFormatCommand};
pub use highlight::{highlight_document, HighlightState, LineStyles, Style, StyleSpan};
pub use tokenizer::{scan, scan_with, InlineKind, ScanOptions, Token, TokenKind};
