//! Markdown token scanner
//!
//! Scans a whole document and returns the ordered, non-overlapping list of
//! constructs the live renderer knows how to draw: a fixed table of inline
//! patterns plus pipe tables.
//!
//! The inline patterns form one regex alternation tried in priority order,
//! so at any position the longest marker wins (`***` before `**` before
//! `*`). This is a deliberate precedence approximation, not CommonMark:
//! emphasis inside a link label or heading is left as literal text.

use crate::string_utils::CharCursor;
use log::trace;
use regex::{Captures, Regex};
use std::ops::Range;
use std::sync::OnceLock;

// ─────────────────────────────────────────────────────────────────────────────
// Token Types
// ─────────────────────────────────────────────────────────────────────────────

/// The inline constructs, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineKind {
    /// `***text***` or `___text___`
    BoldItalic,
    /// `**text**` or `__text__`
    Bold,
    /// `*text*` or `_text_`
    Italic,
    /// `~~text~~`
    Strikethrough,
    /// `` `text` ``
    Code,
    /// `[label](url)`
    Link,
    /// `#`..`######` followed by whitespace, whole line
    Heading(u8),
}

/// What a token covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Inline(InlineKind),
    Table,
}

impl TokenKind {
    pub fn is_table(&self) -> bool {
        matches!(self, TokenKind::Table)
    }
}

/// A recognized construct in the scanned text.
///
/// `start` and `len` are character offsets, matching the text surface's
/// flat offset addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub source_text: String,
    pub start: usize,
    pub len: usize,
}

impl Token {
    /// Offset one past the last character.
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Which optional constructs a scan produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub tables: bool,
    pub headings: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            tables: true,
            headings: true,
        }
    }
}

/// One inline match, in byte offsets of the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMatch<'a> {
    pub kind: InlineKind,
    pub range: Range<usize>,
    /// Text between the markers (the label for links, the title for headings)
    pub content: &'a str,
    /// Link destination
    pub url: Option<&'a str>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern Table
// ─────────────────────────────────────────────────────────────────────────────

const INLINE_PATTERNS: [&str; 9] = [
    r"\*\*\*(?P<bi1>[^\n]+?)\*\*\*",
    r"___(?P<bi2>[^\n]+?)___",
    r"\*\*(?P<b1>[^\n]+?)\*\*",
    r"__(?P<b2>[^\n]+?)__",
    r"\*(?P<i1>[^*\n]+?)\*",
    r"_(?P<i2>[^_\n]+?)_",
    r"~~(?P<s>[^\n]+?)~~",
    r"`(?P<c>[^`\n]+)`",
    r"\[(?P<label>[^\]\n]+)\]\((?P<url>[^)\n]+)\)",
];

const HEADING_PATTERN: &str = r"(?m:^(?P<hashes>#{1,6})[ \t]+(?P<title>[^\n]*?)\r?$)";

/// The inline alternation. Every capture requires at least one character
/// and no alternative crosses a line break.
fn inline_regex(with_headings: bool) -> &'static Regex {
    static WITH_HEADINGS: OnceLock<Regex> = OnceLock::new();
    static WITHOUT_HEADINGS: OnceLock<Regex> = OnceLock::new();

    let build = |headings: bool| {
        let mut patterns = INLINE_PATTERNS.to_vec();
        if headings {
            patterns.push(HEADING_PATTERN);
        }
        Regex::new(&patterns.join("|")).expect("valid inline pattern table")
    };

    if with_headings {
        WITH_HEADINGS.get_or_init(|| build(true))
    } else {
        WITHOUT_HEADINGS.get_or_init(|| build(false))
    }
}

fn classify<'a>(caps: &Captures<'a>) -> Option<(InlineKind, &'a str, Option<&'a str>)> {
    let text = |name: &str| caps.name(name).map(|m| m.as_str());

    if let Some(content) = text("bi1").or_else(|| text("bi2")) {
        Some((InlineKind::BoldItalic, content, None))
    } else if let Some(content) = text("b1").or_else(|| text("b2")) {
        Some((InlineKind::Bold, content, None))
    } else if let Some(content) = text("i1").or_else(|| text("i2")) {
        Some((InlineKind::Italic, content, None))
    } else if let Some(content) = text("s") {
        Some((InlineKind::Strikethrough, content, None))
    } else if let Some(content) = text("c") {
        Some((InlineKind::Code, content, None))
    } else if let Some(label) = text("label") {
        Some((InlineKind::Link, label, text("url")))
    } else if let Some(hashes) = text("hashes") {
        let title = text("title").unwrap_or("");
        Some((InlineKind::Heading(hashes.len() as u8), title, None))
    } else {
        None
    }
}

/// Iterate the inline constructs of `text` left to right.
///
/// Matches with blank content are skipped, so `** **` or `# ` stay plain text.
pub fn scan_inline(text: &str) -> impl Iterator<Item = InlineMatch<'_>> + '_ {
    scan_inline_with(text, true)
}

/// Like [`scan_inline`], optionally without the heading pattern.
pub fn scan_inline_with(
    text: &str,
    headings: bool,
) -> impl Iterator<Item = InlineMatch<'_>> + '_ {
    inline_regex(headings).captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let (kind, content, url) = classify(&caps)?;
        if content.trim().is_empty() {
            return None;
        }
        Some(InlineMatch {
            kind,
            range: whole.range(),
            content,
            url,
        })
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Table Detection
// ─────────────────────────────────────────────────────────────────────────────

/// A line of the scanned text with its byte range (terminator excluded).
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    text: &'a str,
    start: usize,
}

impl Line<'_> {
    fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for piece in text.split('\n') {
        let trimmed = piece.strip_suffix('\r').unwrap_or(piece);
        lines.push(Line {
            text: trimmed,
            start,
        });
        start += piece.len() + 1;
    }
    lines
}

fn is_pipe_row(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

fn is_header_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn is_separator_row(line: &str) -> bool {
    is_pipe_row(line)
        && line.contains('-')
        && line
            .chars()
            .all(|c| c == '-' || c == ':' || c == '|' || c.is_whitespace())
}

/// Number of non-empty pipe-delimited cells in a row.
pub fn count_cells(row: &str) -> usize {
    row.split('|').filter(|cell| !cell.trim().is_empty()).count()
}

/// A table block is accepted only when every row has the same cell count.
pub fn is_complete_table(table_text: &str) -> bool {
    let rows: Vec<&str> = table_text.lines().collect();
    if rows.len() < 3 {
        return false;
    }
    let header_cells = count_cells(rows[0]);
    header_cells > 0 && rows.iter().all(|row| count_cells(row) == header_cells)
}

/// Byte ranges of every accepted table, in document order.
///
/// A block starts at a `| ... |` header followed by a separator row and
/// continues through consecutive `|` rows. Blocks with inconsistent cell
/// counts are rejected and stay plain text.
pub fn find_tables(text: &str) -> Vec<Range<usize>> {
    let lines = split_lines(text);
    let mut tables = Vec::new();
    let mut i = 0;

    while i + 2 < lines.len() {
        if !is_header_row(lines[i].text) || !is_separator_row(lines[i + 1].text) {
            i += 1;
            continue;
        }

        let mut last = i + 1;
        while last + 1 < lines.len() && is_pipe_row(lines[last + 1].text) {
            last += 1;
        }
        if last == i + 1 {
            // Header and separator but no data rows
            i += 2;
            continue;
        }

        let range = lines[i].start..lines[last].end();
        if is_complete_table(&text[range.clone()]) {
            tables.push(range);
            i = last + 1;
        } else {
            trace!("rejecting table candidate at byte {}", lines[i].start);
            i += 1;
        }
    }

    tables
}

// ─────────────────────────────────────────────────────────────────────────────
// Scanning
// ─────────────────────────────────────────────────────────────────────────────

/// Scan `text` with every construct enabled.
pub fn scan(text: &str) -> Vec<Token> {
    scan_with(text, ScanOptions::default())
}

/// Scan `text` into ordered, non-overlapping tokens.
///
/// Tables claim their lines first; inline matches overlapping a table are
/// discarded.
pub fn scan_with(text: &str, options: ScanOptions) -> Vec<Token> {
    let tables = if options.tables {
        find_tables(text)
    } else {
        Vec::new()
    };

    let mut spans: Vec<(TokenKind, Range<usize>)> = scan_inline_with(text, options.headings)
        .filter(|m| {
            !tables
                .iter()
                .any(|t| m.range.start < t.end && t.start < m.range.end)
        })
        .map(|m| (TokenKind::Inline(m.kind), m.range))
        .collect();
    spans.extend(tables.into_iter().map(|range| (TokenKind::Table, range)));
    spans.sort_by_key(|(_, range)| range.start);

    let mut chars = CharCursor::new(text);
    let tokens: Vec<Token> = spans
        .into_iter()
        .map(|(kind, range)| {
            let start = chars.char_offset(range.start);
            let source_text = text[range].to_string();
            let len = source_text.chars().count();
            Token {
                kind,
                source_text,
                start,
                len,
            }
        })
        .collect();

    trace!("scanned {} bytes into {} tokens", text.len(), tokens.len());
    tokens
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        scan(text).into_iter().map(|t| t.kind).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inline Tokens
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_plain_text_has_no_tokens() {
        assert!(scan("").is_empty());
        assert!(scan("Just a plain note\nwith two lines.").is_empty());
        assert!(scan("3 * 4 = 12, not # a heading").is_empty());
    }

    #[test]
    fn test_bold_spans_whole_input() {
        let tokens = scan("**bold**");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Inline(InlineKind::Bold));
        assert_eq!(tokens[0].start, 0);
        assert_eq!(tokens[0].len, 8);
        assert_eq!(tokens[0].source_text, "**bold**");
    }

    #[test]
    fn test_two_italics_in_order() {
        let tokens = scan("*a* and *b*");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].source_text, "*a*");
        assert_eq!(tokens[1].source_text, "*b*");
        assert!(tokens[0].end() <= tokens[1].start);
        assert_eq!(tokens[1].start, 8);
    }

    #[test]
    fn test_marker_priority() {
        assert_eq!(
            kinds("***both***"),
            vec![TokenKind::Inline(InlineKind::BoldItalic)]
        );
        assert_eq!(
            kinds("___both___"),
            vec![TokenKind::Inline(InlineKind::BoldItalic)]
        );
        assert_eq!(kinds("__bold__"), vec![TokenKind::Inline(InlineKind::Bold)]);
        assert_eq!(kinds("_it_"), vec![TokenKind::Inline(InlineKind::Italic)]);
        assert_eq!(
            kinds("~~gone~~"),
            vec![TokenKind::Inline(InlineKind::Strikethrough)]
        );
    }

    #[test]
    fn test_code_and_link() {
        let tokens = scan("run `cargo doc` or see [docs](https://docs.rs)");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Inline(InlineKind::Code));
        assert_eq!(tokens[0].source_text, "`cargo doc`");
        assert_eq!(tokens[1].kind, TokenKind::Inline(InlineKind::Link));
        assert_eq!(tokens[1].source_text, "[docs](https://docs.rs)");
    }

    #[test]
    fn test_heading_is_whole_line() {
        let tokens = scan("intro\n### Section **three**\nbody");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Inline(InlineKind::Heading(3)));
        assert_eq!(tokens[0].source_text, "### Section **three**");
        assert_eq!(tokens[0].start, 6);
    }

    #[test]
    fn test_heading_excludes_carriage_return() {
        let tokens = scan("# Title\r\nbody *x*\r\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Inline(InlineKind::Heading(1)));
        assert_eq!(tokens[0].source_text, "# Title");
        assert_eq!(tokens[0].len, 7);
        assert_eq!(tokens[1].start, 14);
        assert!(scan("# \r\n").is_empty());
    }

    #[test]
    fn test_heading_requires_whitespace_and_level() {
        assert!(scan("#hashtag").is_empty());
        assert!(scan("####### seven").is_empty());
        assert!(scan("# ").is_empty());
    }

    #[test]
    fn test_empty_captures_are_ignored() {
        assert!(scan("****").is_empty());
        assert!(scan("``").is_empty());
        assert!(scan("~~~~").is_empty());
        assert!(scan("[](url)").is_empty());
        assert!(scan("** **").is_empty());
    }

    #[test]
    fn test_inline_never_crosses_lines() {
        assert!(scan("*start\nend*").is_empty());
        assert!(scan("`a\nb`").is_empty());
    }

    #[test]
    fn test_offsets_are_characters() {
        let tokens = scan("blåbær *søt*");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].start, 7);
        assert_eq!(tokens[0].len, 5);
    }

    #[test]
    fn test_scan_is_deterministic() {
        let text = "# Title\n\n*a* **b** `c` [d](e)\n";
        assert_eq!(scan(text), scan(text));
    }

    #[test]
    fn test_headings_can_be_disabled() {
        let options = ScanOptions {
            headings: false,
            ..ScanOptions::default()
        };
        let tokens = scan_with("# Title *x*", options);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].source_text, "*x*");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tables
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_table_accepted() {
        let text = "| header | header |\n| --- | --- |\n| a | b |";
        let tokens = scan(text);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Table);
        assert_eq!(tokens[0].source_text, text);
        assert_eq!(tokens[0].start, 0);
    }

    #[test]
    fn test_table_with_extra_cell_rejected() {
        let text = "| header | header |\n| --- | --- |\n| a | b | c |";
        assert!(scan(text).iter().all(|t| !t.kind.is_table()));
    }

    #[test]
    fn test_table_needs_data_row() {
        assert!(scan("| a | b |\n| --- | --- |").is_empty());
    }

    #[test]
    fn test_table_terminated_by_blank_line() {
        let text = "before\n| h1 | h2 |\n|:--|--:|\n| 1 | 2 |\n| 3 | 4 |\n\n| not | table |";
        let tokens = scan(text);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Table);
        assert_eq!(
            tokens[0].source_text,
            "| h1 | h2 |\n|:--|--:|\n| 1 | 2 |\n| 3 | 4 |"
        );
        assert_eq!(tokens[0].start, 7);
    }

    #[test]
    fn test_table_claims_inline_markup() {
        let text = "| **a** | b |\n|---|---|\n| `c` | d |\nafter *x*";
        let tokens = scan(text);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Table);
        assert_eq!(tokens[1].source_text, "*x*");
    }

    #[test]
    fn test_rejected_table_keeps_inline_tokens() {
        let text = "| **a** | b |\n|---|---|\n| c |";
        let tokens = scan(text);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Inline(InlineKind::Bold));
    }

    #[test]
    fn test_tables_can_be_disabled() {
        let options = ScanOptions {
            tables: false,
            ..ScanOptions::default()
        };
        assert!(scan_with("| a | b |\n|---|---|\n| c | d |", options).is_empty());
    }

    #[test]
    fn test_count_cells() {
        assert_eq!(count_cells("| a | b |"), 2);
        assert_eq!(count_cells("|:---:|---:|"), 2);
        assert_eq!(count_cells("| a |  | c |"), 2);
    }

    #[test]
    fn test_is_complete_table() {
        assert!(is_complete_table("| a | b |\n|---|---|\n| 1 | 2 |"));
        assert!(!is_complete_table("| a | b |\n|---|---|"));
        assert!(!is_complete_table("| a | b |\n|---|\n| 1 | 2 |"));
    }
}
