//! In-memory text surface backed by ropey.

use super::{InputChange, MarkId, MarkOptions, Position, SurfaceEvent, TextSurface};
use crate::render::RenderedElement;
use log::trace;
use ropey::Rope;
use std::collections::VecDeque;

/// A replacement mark stored as a half-open character range.
#[derive(Debug, Clone)]
struct Mark {
    id: MarkId,
    from: usize,
    to: usize,
    options: MarkOptions,
}

/// A [`TextSurface`] over a rope.
///
/// Edits shift marks that lie entirely before or after the edited range;
/// a mark whose text is touched by an edit is dropped. Every mutation queues
/// the events a real editor widget would emit, retrievable with
/// [`drain_events`](Self::drain_events).
#[derive(Debug, Clone)]
pub struct RopeSurface {
    rope: Rope,
    /// Caret as a character offset
    cursor: usize,
    /// Selection anchor; `None` when the selection is collapsed
    anchor: Option<usize>,
    marks: Vec<Mark>,
    next_mark: u64,
    batch_depth: usize,
    dirty: bool,
    repaints: usize,
    events: VecDeque<SurfaceEvent>,
}

impl Default for RopeSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RopeSurface {
    /// Creates an empty surface.
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            cursor: 0,
            anchor: None,
            marks: Vec::new(),
            next_mark: 1,
            batch_depth: 0,
            dirty: false,
            repaints: 0,
            events: VecDeque::new(),
        }
    }

    /// Creates a surface holding `text` with the caret at the start.
    pub fn from_str(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            ..Self::new()
        }
    }

    /// Total number of characters in the document.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Number of completed repaints (batches count once).
    pub fn repaint_count(&self) -> usize {
        self.repaints
    }

    /// Take every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        self.events.drain(..).collect()
    }

    /// Queue an event without touching the document (focus, blur, clicks).
    pub fn push_event(&mut self, event: SurfaceEvent) {
        self.events.push_back(event);
    }

    /// Simulate typing `text` at the caret: insert it, move the caret after
    /// it, and queue the input notification.
    pub fn type_text(&mut self, text: &str) {
        if let Some(anchor) = self.anchor.take() {
            let (from, to) = (anchor.min(self.cursor), anchor.max(self.cursor));
            let from_pos = self.pos_from_index(from);
            let to_pos = self.pos_from_index(to);
            self.replace_range(text, from_pos, Some(to_pos));
        } else {
            let at = self.get_cursor();
            self.replace_range(text, at, None);
        }
        self.events
            .push_back(SurfaceEvent::InputRead(InputChange::new(text)));
    }

    /// Element displayed by a live mark.
    pub fn mark_element(&self, mark: MarkId) -> Option<&RenderedElement> {
        self.marks
            .iter()
            .find(|m| m.id == mark)
            .map(|m| &m.options.replaced_with)
    }

    /// Options a live mark was created with.
    pub fn mark_options(&self, mark: MarkId) -> Option<&MarkOptions> {
        self.marks.iter().find(|m| m.id == mark).map(|m| &m.options)
    }

    /// The document as displayed: every mark's range replaced by its
    /// element's HTML.
    pub fn rendered_view(&self) -> String {
        let mut marks: Vec<&Mark> = self.marks.iter().collect();
        marks.sort_by_key(|m| m.from);

        let mut out = String::new();
        let mut pos = 0;
        for mark in marks {
            if mark.from < pos {
                continue;
            }
            out.push_str(&self.rope.slice(pos..mark.from).to_string());
            out.push_str(&mark.options.replaced_with.outer_html());
            pos = mark.to;
        }
        out.push_str(&self.rope.slice(pos..).to_string());
        out
    }

    fn clamp_offset(&self, offset: usize) -> usize {
        offset.min(self.rope.len_chars())
    }

    fn line_len_chars(&self, line: usize) -> usize {
        let slice = self.rope.line(line);
        let mut len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            len -= 1;
            if len > 0 && slice.char(len - 1) == '\r' {
                len -= 1;
            }
        }
        len
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.flush_repaint();
    }

    fn flush_repaint(&mut self) {
        if self.batch_depth == 0 && self.dirty {
            self.dirty = false;
            self.repaints += 1;
            trace!("surface repaint #{}", self.repaints);
        }
    }

    fn move_cursor(&mut self, offset: usize) {
        let offset = self.clamp_offset(offset);
        if offset != self.cursor || self.anchor.is_some() {
            self.cursor = offset;
            self.anchor = None;
            self.events.push_back(SurfaceEvent::CursorActivity);
            self.touch();
        }
    }
}

impl TextSurface for RopeSurface {
    fn get_value(&self) -> String {
        self.rope.to_string()
    }

    fn get_line(&self, line: usize) -> Option<String> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let len = self.line_len_chars(line);
        Some(self.rope.line(line).slice(..len).to_string())
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn get_cursor(&self) -> Position {
        self.pos_from_index(self.cursor)
    }

    fn set_cursor(&mut self, pos: Position) {
        let offset = self.index_from_pos(pos);
        self.move_cursor(offset);
    }

    fn get_selection(&self) -> Option<(Position, Position)> {
        self.anchor
            .filter(|anchor| *anchor != self.cursor)
            .map(|anchor| (self.pos_from_index(anchor), self.pos_from_index(self.cursor)))
    }

    fn set_selection(&mut self, anchor: Position, head: Position) {
        let anchor = self.index_from_pos(anchor);
        let head = self.index_from_pos(head);
        self.cursor = head;
        self.anchor = (anchor != head).then_some(anchor);
        self.events.push_back(SurfaceEvent::CursorActivity);
        self.touch();
    }

    fn pos_from_index(&self, offset: usize) -> Position {
        let offset = self.clamp_offset(offset);
        let line = self.rope.char_to_line(offset);
        let line_start = self.rope.line_to_char(line);
        Position::new(line, offset - line_start)
    }

    fn index_from_pos(&self, pos: Position) -> usize {
        if pos.line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        self.rope.line_to_char(pos.line) + pos.ch.min(self.line_len_chars(pos.line))
    }

    fn replace_range(&mut self, text: &str, from: Position, to: Option<Position>) {
        let start = self.index_from_pos(from);
        let end = to.map(|p| self.index_from_pos(p)).unwrap_or(start);
        let (start, end) = (start.min(end), start.max(end));
        let inserted = text.chars().count();

        if start < end {
            self.rope.remove(start..end);
        }
        self.rope.insert(start, text);

        // Marks touched by the edit are gone; the rest shift.
        let delta = inserted as isize - (end - start) as isize;
        self.marks.retain_mut(|mark| {
            if mark.to < start || (mark.to == start && !mark.options.inclusive_right) {
                true
            } else if mark.from > end || (mark.from == end && !mark.options.inclusive_left) {
                mark.from = (mark.from as isize + delta) as usize;
                mark.to = (mark.to as isize + delta) as usize;
                true
            } else {
                trace!("edit at {}..{} drops mark {:?}", start, end, mark.id);
                false
            }
        });

        let old_cursor = self.cursor;
        self.cursor = if self.cursor < start {
            self.cursor
        } else if self.cursor <= end {
            start + inserted
        } else {
            (self.cursor as isize + delta) as usize
        };
        self.anchor = None;

        self.events.push_back(SurfaceEvent::Change);
        if self.cursor != old_cursor {
            self.events.push_back(SurfaceEvent::CursorActivity);
        }
        self.touch();
    }

    fn mark_text(&mut self, from: Position, to: Position, options: MarkOptions) -> MarkId {
        let id = MarkId(self.next_mark);
        self.next_mark += 1;
        let from = self.index_from_pos(from);
        let to = self.index_from_pos(to);
        self.marks.push(Mark {
            id,
            from: from.min(to),
            to: from.max(to),
            options,
        });
        self.touch();
        id
    }

    fn find_mark(&self, mark: MarkId) -> Option<(Position, Position)> {
        self.marks
            .iter()
            .find(|m| m.id == mark)
            .map(|m| (self.pos_from_index(m.from), self.pos_from_index(m.to)))
    }

    fn clear_mark(&mut self, mark: MarkId) {
        let before = self.marks.len();
        self.marks.retain(|m| m.id != mark);
        if self.marks.len() != before {
            self.touch();
        }
    }

    fn get_all_marks(&self) -> Vec<MarkId> {
        self.marks.iter().map(|m| m.id).collect()
    }

    fn begin_operation(&mut self) {
        self.batch_depth += 1;
    }

    fn end_operation(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        self.flush_repaint();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
