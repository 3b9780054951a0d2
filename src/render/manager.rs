//! Render pass and un-render lifecycle
//!
//! Every pass rescans the whole document, clears every mark, and re-creates a
//! mark for each token the caret is not touching. Between passes each live
//! decoration watches the caret: once the caret enters its range it clears
//! itself and restores the raw source text for editing.

use super::{inline, table, ElementKind};
use crate::config::RenderSettings;
use crate::markdown::tokenizer::{scan_with, ScanOptions, Token};
use crate::surface::{ClickEvent, MarkId, MarkOptions, Position, TextSurface};
use log::{debug, trace};

// ─────────────────────────────────────────────────────────────────────────────
// Decorations
// ─────────────────────────────────────────────────────────────────────────────

/// A live replacement mark created by the last render pass.
///
/// Only the mark handle is kept; its range is always re-read from the
/// surface so edits made since the pass are taken into account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub mark: MarkId,
    pub kind: ElementKind,
    pub source_text: String,
    /// Container HTML shown in place of the source text
    pub html: String,
}

/// Observable state of one decoration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationSnapshot {
    pub from: Position,
    pub to: Position,
    pub kind: ElementKind,
    pub html: String,
}

/// Whether `cursor` lies outside `[from, to]`.
///
/// Both ends count as inside, so a caret right after a token keeps it raw
/// while the user is still typing it.
pub fn cursor_outside(cursor: Position, from: Position, to: Position) -> bool {
    cursor.line < from.line
        || cursor.line > to.line
        || (cursor.line == from.line && cursor.ch < from.ch)
        || (cursor.line == to.line && cursor.ch > to.ch)
}

// ─────────────────────────────────────────────────────────────────────────────
// RenderManager
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the decoration lifecycle for one note.
#[derive(Debug, Clone, Default)]
pub struct RenderManager {
    settings: RenderSettings,
    decorations: Vec<Decoration>,
}

impl RenderManager {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            decorations: Vec::new(),
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Replace the settings; takes effect on the next pass.
    pub fn set_settings(&mut self, settings: RenderSettings) {
        self.settings = settings;
    }

    /// Decorations believed live, in document order.
    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }

    /// Ranges and HTML of every live decoration, as the surface sees them now.
    pub fn snapshot<S: TextSurface>(&self, surface: &S) -> Vec<DecorationSnapshot> {
        self.decorations
            .iter()
            .filter_map(|deco| {
                let (from, to) = surface.find_mark(deco.mark)?;
                Some(DecorationSnapshot {
                    from,
                    to,
                    kind: deco.kind,
                    html: deco.html.clone(),
                })
            })
            .collect()
    }

    /// One full render pass.
    pub fn update_rendering<S: TextSurface>(&mut self, surface: &mut S) {
        let content = surface.get_value();
        let cursor = surface.get_cursor();
        let tokens = if self.settings.enabled {
            scan_with(
                &content,
                ScanOptions {
                    tables: self.settings.tables,
                    headings: self.settings.headings,
                },
            )
        } else {
            Vec::new()
        };

        let decorations = surface.operation(|s| {
            for mark in s.get_all_marks() {
                s.clear_mark(mark);
            }

            tokens
                .iter()
                .filter_map(|token| {
                    let from = s.pos_from_index(token.start);
                    let to = s.pos_from_index(token.end());
                    cursor_outside(cursor, from, to).then(|| render_token(s, token, from, to))
                })
                .collect::<Vec<_>>()
        });

        debug!(
            "render pass: {} tokens, {} rendered, cursor {}:{}",
            tokens.len(),
            decorations.len(),
            cursor.line,
            cursor.ch
        );
        self.decorations = decorations;
    }

    /// Cursor watcher: un-render every decoration the caret has entered.
    ///
    /// Returns the number of decorations un-rendered.
    pub fn handle_cursor_activity<S: TextSurface>(&mut self, surface: &mut S) -> usize {
        let cursor = surface.get_cursor();
        let mut unrendered = 0;

        for deco in std::mem::take(&mut self.decorations) {
            let Some((from, to)) = self.live_range(surface, &deco) else {
                continue;
            };
            if cursor_outside(cursor, from, to) {
                self.decorations.push(deco);
                continue;
            }

            trace!("caret entered {:?} at {}:{}", deco.mark, cursor.line, cursor.ch);
            surface.clear_mark(deco.mark);
            if deco.kind == ElementKind::Table {
                surface.set_cursor(from);
            }
            unrendered += 1;
        }

        unrendered
    }

    /// Un-render the decoration that received a click and place the caret at
    /// the equivalent source offset.
    ///
    /// Returns `false` when the click hit no live decoration.
    pub fn handle_click<S: TextSurface>(&mut self, surface: &mut S, click: &ClickEvent) -> bool {
        let Some(index) = self.decorations.iter().position(|d| d.mark == click.mark) else {
            return false;
        };
        let deco = self.decorations.remove(index);
        let Some((from, to)) = self.live_range(surface, &deco) else {
            return false;
        };

        surface.clear_mark(deco.mark);
        let target = match deco.kind {
            ElementKind::Table => from,
            ElementKind::Inline => {
                let start = surface.index_from_pos(from);
                let end = surface.index_from_pos(to);
                let offset = proportional_offset(start, end, click.relative_position());
                surface.pos_from_index(offset)
            }
        };
        debug!(
            "click un-rendered {:?}, caret to {}:{}",
            deco.mark, target.line, target.ch
        );
        surface.set_cursor(target);
        true
    }

    /// Current range of a decoration, or `None` if its mark is gone or its
    /// text no longer matches what was rendered (stale marks are cleared).
    fn live_range<S: TextSurface>(
        &self,
        surface: &mut S,
        deco: &Decoration,
    ) -> Option<(Position, Position)> {
        let (from, to) = surface.find_mark(deco.mark)?;
        if surface.get_range(from, to) != deco.source_text {
            debug!("dropping stale decoration {:?}", deco.mark);
            surface.clear_mark(deco.mark);
            return None;
        }
        Some((from, to))
    }
}

/// Map a relative position within a rendered element onto its source range.
pub(crate) fn proportional_offset(start: usize, end: usize, relative: f64) -> usize {
    let length = end.saturating_sub(start) as f64;
    let offset = (start as f64 + length * relative.clamp(0.0, 1.0)).round() as usize;
    offset.clamp(start, end.max(start))
}

fn render_token<S: TextSurface>(
    surface: &mut S,
    token: &Token,
    from: Position,
    to: Position,
) -> Decoration {
    let element = if token.kind.is_table() {
        table::render_table(&token.source_text)
    } else {
        inline::render(&token.source_text)
    };
    let kind = element.kind;
    let html = element.outer_html();
    let options = MarkOptions::replaced_with(element).atomic(kind == ElementKind::Table);
    let mark = surface.mark_text(from, to, options);

    Decoration {
        mark,
        kind,
        source_text: token.source_text.clone(),
        html,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
