//! Pipe table rendering.

use super::{inline::render_inline_markdown, RenderedElement};
use std::fmt::Write;

/// Column alignment taken from a separator cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    /// `:-:` → center, `-:` → right, `:-` or `-` → left.
    pub fn from_separator(cell: &str) -> Self {
        let cell = cell.trim();
        match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) if cell.len() > 1 => Alignment::Center,
            (false, true) => Alignment::Right,
            _ => Alignment::Left,
        }
    }

    pub fn css(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

/// Cells of a row with the empty edge cells produced by the outer pipes removed.
fn row_cells(row: &str) -> Vec<&str> {
    let mut cells: Vec<&str> = row.trim().split('|').collect();
    if cells.first().is_some_and(|c| c.trim().is_empty()) {
        cells.remove(0);
    }
    if cells.last().is_some_and(|c| c.trim().is_empty()) {
        cells.pop();
    }
    cells
}

/// Alignment of every column, from the table's separator row.
pub fn column_alignments(separator_row: &str) -> Vec<Alignment> {
    row_cells(separator_row)
        .into_iter()
        .map(Alignment::from_separator)
        .collect()
}

fn push_row(html: &mut String, cells: &[&str], tag: &str, alignments: &[Alignment]) {
    html.push_str("<tr>");
    for (index, cell) in cells.iter().enumerate() {
        let align = alignments.get(index).copied().unwrap_or_default();
        // Writing into a String cannot fail
        let _ = write!(
            html,
            "<{tag} style=\"text-align:{}\">{}</{tag}>",
            align.css(),
            render_inline_markdown(cell.trim())
        );
    }
    html.push_str("</tr>");
}

/// Render an accepted table block.
pub fn render_table(table_text: &str) -> RenderedElement {
    let rows: Vec<&str> = table_text.trim().lines().collect();
    let header = rows.first().map(|r| row_cells(r)).unwrap_or_default();
    let alignments = rows.get(1).map(|r| column_alignments(r)).unwrap_or_default();

    let mut html = String::from("<table><thead>");
    push_row(&mut html, &header, "th", &alignments);
    html.push_str("</thead><tbody>");
    for row in rows.iter().skip(2) {
        push_row(&mut html, &row_cells(row), "td", &alignments);
    }
    html.push_str("</tbody></table>");

    RenderedElement::table(table_text, html)
}
