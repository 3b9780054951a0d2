//! Raw markdown syntax highlighting
//!
//! A line-by-line classifier for the un-rendered note text. Each line yields
//! style spans (character columns) with CSS-like class names a host can map
//! onto its own styling. Fenced code blocks carry over from line to line;
//! table rows are classified by their position in the table.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

// ─────────────────────────────────────────────────────────────────────────────
// Styles
// ─────────────────────────────────────────────────────────────────────────────

/// Style of a highlighted span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Header(u8),
    Quote,
    List,
    Task,
    Hr,
    Code,
    Link,
    Image,
    Bold,
    Italic,
    BoldItalic,
    Underline,
    Strikethrough,
    TableTop,
    TableMiddle,
    TableBottom,
    TableSingle,
    TableAlign,
}

impl Style {
    /// Space-separated class names.
    pub fn class(&self) -> String {
        let name = match self {
            Style::Header(level) => return format!("header header-{}", level),
            Style::Quote => "quote",
            Style::List => "list",
            Style::Task => "list task",
            Style::Hr => "hr",
            Style::Code => "code",
            Style::Link => "link",
            Style::Image => "image",
            Style::Bold => "bold",
            Style::Italic => "italic",
            Style::BoldItalic => "italic bold",
            Style::Underline => "underline",
            Style::Strikethrough => "strikethrough",
            Style::TableTop => "table-top",
            Style::TableMiddle => "table-middle",
            Style::TableBottom => "table-bottom",
            Style::TableSingle => "table-single",
            Style::TableAlign => "table-align",
        };
        name.to_string()
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.class())
    }
}

/// A styled column range `[start, end)` of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleSpan {
    pub start: usize,
    pub end: usize,
    pub style: Style,
}

/// Styles of one line; unstyled text has no span.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineStyles {
    pub line: usize,
    pub spans: Vec<StyleSpan>,
}

impl LineStyles {
    /// Style covering column `ch`, if any.
    pub fn style_at(&self, ch: usize) -> Option<Style> {
        self.spans
            .iter()
            .find(|span| span.start <= ch && ch < span.end)
            .map(|span| span.style)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────────────

struct Patterns {
    header: Regex,
    quote: Regex,
    task: Regex,
    bullet: Regex,
    ordered: Regex,
    hr: Regex,
    link: Regex,
    image: Regex,
    table_row: Regex,
    align: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |pattern: &str| Regex::new(pattern).expect("valid highlight regex");
        Patterns {
            header: re(r"^(#{1,6})\s+"),
            quote: re(r"^>\s+"),
            task: re(r"(?i)^- \[[x ]\]\s+"),
            bullet: re(r"^[-*+]\s+"),
            ordered: re(r"^\d+\.\s+"),
            hr: re(r"^(---|\*\*\*|___)\s*$"),
            link: re(r"^\[.*?\]\(.*?\)"),
            image: re(r"^!\[.*?\]\(.*?\)"),
            table_row: re(r"^\s*\|"),
            align: re(r"^[-:]+$"),
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Highlighter
// ─────────────────────────────────────────────────────────────────────────────

/// State carried between lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightState {
    italic: bool,
    bold: bool,
    underline: bool,
    strikethrough: bool,
    code: bool,
    code_block: bool,
    table: bool,
    table_row: usize,
    bottom_row_seen: bool,
}

impl HighlightState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the next line starts inside a fenced code block.
    pub fn in_code_block(&self) -> bool {
        self.code_block
    }

    fn reset_table(&mut self) {
        self.table = false;
        self.table_row = 0;
        self.bottom_row_seen = false;
    }

    fn reset_inline(&mut self) {
        self.italic = false;
        self.bold = false;
        self.underline = false;
        self.strikethrough = false;
        self.code = false;
    }

    /// Classify one line. `next_line` is needed to tell the last row of a
    /// table from the others.
    pub fn highlight_line(&mut self, line_no: usize, line: &str, next_line: Option<&str>) -> LineStyles {
        let line = line.strip_suffix('\r').unwrap_or(line);
        self.reset_inline();
        if line.is_empty() || !patterns().table_row.is_match(line) {
            self.reset_table();
        }

        let mut spans: Vec<StyleSpan> = Vec::new();
        let mut byte = 0;
        let mut col = 0;
        while byte < line.len() {
            let (consumed, style) = self.next_token(line, byte, next_line);
            let consumed = consumed.max(1);
            let end_byte = (byte + consumed).min(line.len());
            let width = line[byte..end_byte].chars().count();

            if let Some(style) = style {
                match spans.last_mut() {
                    Some(last) if last.style == style && last.end == col => last.end = col + width,
                    _ => spans.push(StyleSpan {
                        start: col,
                        end: col + width,
                        style,
                    }),
                }
            }
            byte = end_byte;
            col += width;
        }

        LineStyles {
            line: line_no,
            spans,
        }
    }

    /// Classify the token at `pos`; returns the bytes consumed and its style.
    fn next_token(&mut self, line: &str, pos: usize, next_line: Option<&str>) -> (usize, Option<Style>) {
        let p = patterns();
        let rest = &line[pos..];
        let sol = pos == 0;
        let next_char = rest.chars().next().map_or(1, char::len_utf8);

        if self.code_block {
            if rest.starts_with("```") {
                self.code_block = false;
                return (3, Some(Style::Code));
            }
            return (rest.len(), Some(Style::Code));
        }

        if sol {
            if let Some(caps) = p.header.captures(rest) {
                let level = caps.get(1).map_or(1, |m| m.as_str().len()) as u8;
                return (rest.len(), Some(Style::Header(level)));
            }
            if let Some(m) = p.quote.find(rest) {
                return (m.end(), Some(Style::Quote));
            }
            if let Some(m) = p.task.find(rest) {
                return (m.end(), Some(Style::Task));
            }
            if let Some(m) = p.bullet.find(rest).or_else(|| p.ordered.find(rest)) {
                return (m.end(), Some(Style::List));
            }
            if p.hr.is_match(rest) {
                return (rest.len(), Some(Style::Hr));
            }
        }

        if rest.starts_with("```") {
            self.code_block = true;
            return (3, Some(Style::Code));
        }

        if let Some(m) = p.link.find(rest) {
            return (m.end(), Some(Style::Link));
        }
        if let Some(m) = p.image.find(rest) {
            return (m.end(), Some(Style::Image));
        }

        if rest.starts_with('`') {
            self.code = !self.code;
            return (1, Some(Style::Code));
        }
        if self.code {
            return (next_char, Some(Style::Code));
        }

        if sol {
            if let Some(m) = p.table_row.find(rest) {
                if !self.table || self.bottom_row_seen {
                    self.table = true;
                    self.table_row = 1;
                    self.bottom_row_seen = false;
                } else {
                    self.table_row += 1;
                }
                return (m.end(), Some(self.table_style(next_line)));
            }
        }
        if self.table {
            if rest.starts_with('|') {
                return (1, Some(self.table_style(next_line)));
            }
            if p.align.is_match(rest) {
                return (rest.len(), Some(Style::TableAlign));
            }
            return (next_char, Some(self.table_style(next_line)));
        }

        if rest.starts_with("***") || rest.starts_with("___") {
            self.italic = !self.italic;
            self.bold = !self.bold;
            let style = (self.italic && self.bold).then_some(Style::BoldItalic);
            return (3, style);
        }
        if rest.starts_with("**") {
            self.bold = !self.bold;
            return (2, Some(Style::Bold));
        }
        if rest.starts_with("__") {
            self.underline = !self.underline;
            return (2, Some(Style::Underline));
        }
        if rest.starts_with('*') || rest.starts_with('_') {
            self.italic = !self.italic;
            return (1, Some(Style::Italic));
        }
        if rest.starts_with("~~") {
            self.strikethrough = !self.strikethrough;
            return (2, Some(Style::Strikethrough));
        }

        let style = if self.italic && self.bold {
            Some(Style::BoldItalic)
        } else if self.italic {
            Some(Style::Italic)
        } else if self.bold {
            Some(Style::Bold)
        } else if self.underline {
            Some(Style::Underline)
        } else if self.strikethrough {
            Some(Style::Strikethrough)
        } else {
            None
        };
        (next_char, style)
    }

    fn table_style(&mut self, next_line: Option<&str>) -> Style {
        let next_row_exists = next_line
            .map(str::trim)
            .is_some_and(|next| next.starts_with('|'));

        match (self.table_row == 1, next_row_exists) {
            (true, true) => Style::TableTop,
            (true, false) => {
                self.bottom_row_seen = true;
                Style::TableSingle
            }
            (false, true) => Style::TableMiddle,
            (false, false) => {
                self.bottom_row_seen = true;
                Style::TableBottom
            }
        }
    }
}

/// Highlight every line of a document.
pub fn highlight_document(text: &str) -> Vec<LineStyles> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut state = HighlightState::new();
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| state.highlight_line(i, line, lines.get(i + 1).copied()))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
