//! Markdown Formatting Operations
//!
//! Keyboard formatting commands applied to raw note text.
//!
//! # Supported Formatting Commands
//! - **Inline**: Bold, Italic, Link, Code Block (wrap or unwrap the selection)
//! - **Blocks**: Blockquote, Bullet List, Numbered List, Headings (1-6),
//!   toggled on every line the selection touches
//!
//! All offsets are character offsets.
//!
//! # Usage
//! ```ignore
//! use crate::markdown::formatting::{apply_raw_format, MarkdownFormatCommand};
//!
//! let result = apply_raw_format("Hello world", (0, 5), MarkdownFormatCommand::Bold);
//! assert_eq!(result.text, "**Hello** world");
//! ```

use crate::string_utils::{char_index_to_byte_index, char_len, split_at_char};
use regex::Regex;
use std::sync::OnceLock;

// ─────────────────────────────────────────────────────────────────────────────
// Format Command Enum
// ─────────────────────────────────────────────────────────────────────────────

/// Markdown formatting commands that can be applied to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkdownFormatCommand {
    /// Bold text (**text**)
    Bold,
    /// Italic text (*text*)
    Italic,
    /// Link ([text](url))
    Link,
    /// Fenced code block
    CodeBlock,
    /// `> ` prefix
    Blockquote,
    /// `- ` prefix
    BulletList,
    /// `1. `, `2. `, ... prefixes
    NumberedList,
    /// Heading level 1-6
    Heading(u8),
}

impl MarkdownFormatCommand {
    /// Every command with a default key binding.
    pub fn all() -> &'static [MarkdownFormatCommand] {
        &[
            Self::Bold,
            Self::Italic,
            Self::Link,
            Self::CodeBlock,
            Self::Blockquote,
            Self::BulletList,
            Self::NumberedList,
            Self::Heading(1),
            Self::Heading(2),
            Self::Heading(3),
            Self::Heading(4),
            Self::Heading(5),
            Self::Heading(6),
        ]
    }

    /// Get the keyboard shortcut label for this command.
    pub fn shortcut_label(&self) -> &'static str {
        match self {
            Self::Bold => "Ctrl+B",
            Self::Italic => "Ctrl+I",
            Self::Link => "Ctrl+K",
            Self::CodeBlock => "Ctrl+Shift+C",
            Self::Blockquote => "Ctrl+Q",
            Self::BulletList => "Ctrl+L",
            Self::NumberedList => "Ctrl+Alt+L",
            Self::Heading(1) => "Ctrl+1",
            Self::Heading(2) => "Ctrl+2",
            Self::Heading(3) => "Ctrl+3",
            Self::Heading(4) => "Ctrl+4",
            Self::Heading(5) => "Ctrl+5",
            Self::Heading(6) => "Ctrl+6",
            Self::Heading(_) => "Ctrl+1-6",
        }
    }

    /// Look up the command bound to a shortcut label (case-insensitive).
    pub fn from_shortcut(label: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|command| command.shortcut_label().eq_ignore_ascii_case(label.trim()))
    }

    /// Opening and closing markers of an inline command.
    fn inline_markers(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Bold => Some(("**", "**")),
            Self::Italic => Some(("*", "*")),
            Self::Link => Some(("[", "](url)")),
            Self::CodeBlock => Some(("```\n", "\n```")),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Format Result
// ─────────────────────────────────────────────────────────────────────────────

/// Result of applying a formatting command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatResult {
    /// The new text after formatting
    pub text: String,
    /// New cursor position (character index)
    pub cursor: usize,
    /// New selection range (start, end) if applicable
    pub selection: Option<(usize, usize)>,
    /// Whether the formatting was applied (vs removed/toggled off)
    pub applied: bool,
}

impl FormatResult {
    /// Create a result with just cursor position.
    pub fn with_cursor(text: String, cursor: usize) -> Self {
        Self {
            text,
            cursor,
            selection: None,
            applied: true,
        }
    }

    /// Create a result with a selection range.
    pub fn with_selection(text: String, start: usize, end: usize) -> Self {
        Self {
            text,
            cursor: end,
            selection: Some((start, end)),
            applied: true,
        }
    }

    /// Mark that formatting was removed rather than applied.
    pub fn toggled_off(mut self) -> Self {
        self.applied = false;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Edits
// ─────────────────────────────────────────────────────────────────────────────

/// Replace `removed` characters at `at` with `inserted`.
#[derive(Debug, Clone)]
struct Edit {
    at: usize,
    removed: usize,
    inserted: String,
}

impl Edit {
    fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            at,
            removed: 0,
            inserted: text.into(),
        }
    }

    fn replace(at: usize, removed: usize, text: impl Into<String>) -> Self {
        Self {
            at,
            removed,
            inserted: text.into(),
        }
    }
}

/// Apply non-overlapping edits sorted by position.
fn apply_edits(text: &str, edits: &[Edit]) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut pos = 0;
    for edit in edits {
        let start = char_index_to_byte_index(text, edit.at);
        let end = char_index_to_byte_index(text, edit.at + edit.removed);
        out.push_str(&text[pos..start]);
        out.push_str(&edit.inserted);
        pos = end;
    }
    out.push_str(&text[pos..]);
    out
}

/// Where `offset` ends up after `edits`; a position inside or at the start
/// of an edit moves past the inserted text.
fn map_offset(offset: usize, edits: &[Edit]) -> usize {
    edits.iter().rev().fold(offset, |pos, edit| {
        if pos < edit.at {
            pos
        } else if pos <= edit.at + edit.removed {
            edit.at + char_len(&edit.inserted)
        } else {
            pos + char_len(&edit.inserted) - edit.removed
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Lines
// ─────────────────────────────────────────────────────────────────────────────

/// A document line and the character offset where it starts.
#[derive(Debug, Clone, Copy)]
struct LineSpan<'a> {
    text: &'a str,
    start: usize,
}

impl LineSpan<'_> {
    fn end(&self) -> usize {
        self.start + char_len(self.text)
    }
}

fn line_spans(text: &str) -> Vec<LineSpan<'_>> {
    let mut start = 0;
    text.split('\n')
        .map(|line| {
            let span = LineSpan { text: line, start };
            start += char_len(line) + 1;
            span
        })
        .collect()
}

/// Index of the line containing `offset`.
fn line_index(spans: &[LineSpan<'_>], offset: usize) -> usize {
    spans
        .iter()
        .rposition(|span| span.start <= offset)
        .unwrap_or(0)
}

fn numbered_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\s").expect("valid numbered list regex"))
}

fn heading_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#{1,6} ").expect("valid heading marker regex"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw Mode Formatting
// ─────────────────────────────────────────────────────────────────────────────

/// Apply a formatting command to `text`.
///
/// `selection` is `(start, end)` in character offsets, in either order;
/// `start == end` is a plain caret.
pub fn apply_raw_format(
    text: &str,
    selection: (usize, usize),
    command: MarkdownFormatCommand,
) -> FormatResult {
    let len = char_len(text);
    let (start, end) = (selection.0.min(selection.1), selection.0.max(selection.1));
    let (start, end) = (start.min(len), end.min(len));

    if let Some((marker, end_marker)) = command.inline_markers() {
        return if start < end {
            toggle_inline_selection(text, start, end, marker, end_marker)
        } else {
            toggle_inline_at_caret(text, start, marker, end_marker)
        };
    }

    match command {
        MarkdownFormatCommand::Blockquote => toggle_prefix(text, start, end, "> "),
        MarkdownFormatCommand::BulletList => toggle_prefix(text, start, end, "- "),
        MarkdownFormatCommand::Heading(level) => {
            let prefix = format!("{} ", "#".repeat(usize::from(level.clamp(1, 6))));
            toggle_prefix(text, start, end, &prefix)
        }
        MarkdownFormatCommand::NumberedList => toggle_numbered_list(text, start, end),
        _ => FormatResult::with_cursor(text.to_string(), start).toggled_off(),
    }
}

/// Wrap the selection in the markers, or unwrap it if it is already wrapped.
/// The replacement stays selected.
fn toggle_inline_selection(
    text: &str,
    start: usize,
    end: usize,
    marker: &str,
    end_marker: &str,
) -> FormatResult {
    let (_, rest) = split_at_char(text, start);
    let (selected, _) = split_at_char(rest, end - start);

    let wrapped = selected.len() >= marker.len() + end_marker.len()
        && selected.starts_with(marker)
        && selected.ends_with(end_marker);

    let replacement = if wrapped {
        selected[marker.len()..selected.len() - end_marker.len()].to_string()
    } else {
        format!("{}{}{}", marker, selected, end_marker)
    };

    let new_end = start + char_len(&replacement);
    let edits = [Edit::replace(start, end - start, replacement)];
    let result = FormatResult::with_selection(apply_edits(text, &edits), start, new_end);
    if wrapped {
        result.toggled_off()
    } else {
        result
    }
}

/// Without a selection: remove a marker pair around the caret, or insert an
/// empty pair with the caret between.
fn toggle_inline_at_caret(text: &str, caret: usize, marker: &str, end_marker: &str) -> FormatResult {
    let spans = line_spans(text);
    let line = spans[line_index(&spans, caret)];

    let from = caret.saturating_sub(char_len(marker)).max(line.start);
    let to = (caret + char_len(end_marker)).min(line.end());
    let (_, rest) = split_at_char(text, from);
    let (around, _) = split_at_char(rest, to - from);

    if around.len() >= marker.len() + end_marker.len()
        && around.starts_with(marker)
        && around.ends_with(end_marker)
    {
        let inner = &around[marker.len()..around.len() - end_marker.len()];
        let cursor = from + char_len(inner);
        let edits = [Edit::replace(from, to - from, inner)];
        return FormatResult::with_cursor(apply_edits(text, &edits), cursor).toggled_off();
    }

    let edits = [Edit::insert(caret, format!("{}{}", marker, end_marker))];
    FormatResult::with_cursor(apply_edits(text, &edits), caret + char_len(marker))
}

/// Map the caret or selection through `edits` into a result.
fn block_result(text: &str, start: usize, end: usize, edits: &[Edit], added: bool) -> FormatResult {
    let new_text = apply_edits(text, edits);
    let result = if start < end {
        FormatResult::with_selection(new_text, map_offset(start, edits), map_offset(end, edits))
    } else {
        FormatResult::with_cursor(new_text, map_offset(start, edits))
    };
    if added {
        result
    } else {
        result.toggled_off()
    }
}

/// Toggle a line prefix on every line of the selection. Heading prefixes
/// replace a heading marker of another level.
fn toggle_prefix(text: &str, start: usize, end: usize, prefix: &str) -> FormatResult {
    let spans = line_spans(text);
    let first = line_index(&spans, start);
    let last = line_index(&spans, end);
    let is_heading = prefix.starts_with('#');

    let mut added = false;
    let edits: Vec<Edit> = spans[first..=last]
        .iter()
        .map(|line| {
            if line.text.starts_with(prefix) {
                return Edit::replace(line.start, char_len(prefix), "");
            }
            added = true;
            match heading_marker_regex().find(line.text) {
                Some(existing) if is_heading => {
                    Edit::replace(line.start, existing.end(), prefix)
                }
                _ => Edit::insert(line.start, prefix),
            }
        })
        .collect();

    block_result(text, start, end, &edits, added)
}

/// Number the selected lines `1. `, `2. `, ... or strip existing numbers.
fn toggle_numbered_list(text: &str, start: usize, end: usize) -> FormatResult {
    let spans = line_spans(text);
    let first = line_index(&spans, start);
    let last = line_index(&spans, end);

    let mut added = false;
    let edits: Vec<Edit> = spans[first..=last]
        .iter()
        .enumerate()
        .map(|(i, line)| match numbered_item_regex().find(line.text) {
            Some(m) => Edit::replace(line.start, char_len(m.as_str()), ""),
            None => {
                added = true;
                Edit::insert(line.start, format!("{}. ", i + 1))
            }
        })
        .collect();

    block_result(text, start, end, &edits, added)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
