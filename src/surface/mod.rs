//! Text surface abstraction
//!
//! The rendering core never owns the document. It talks to a host editing
//! widget through the [`TextSurface`] trait: line/character addressing,
//! range replacement, replacement marks and batched updates. Host events are
//! delivered to the core as [`SurfaceEvent`] values.
//!
//! [`RopeSurface`] is an in-memory implementation used by the command line
//! host and by the test suite.

mod rope;

pub use rope::RopeSurface;

use crate::render::RenderedElement;

// ─────────────────────────────────────────────────────────────────────────────
// Positions
// ─────────────────────────────────────────────────────────────────────────────

/// A caret position in the document. Both fields are 0-indexed and `ch`
/// counts characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub ch: usize,
}

impl Position {
    pub const fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

/// Handle to a replacement mark created by [`TextSurface::mark_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkId(pub u64);

/// Options for a replacement mark.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkOptions {
    /// Element shown instead of the marked source text
    pub replaced_with: RenderedElement,
    /// Whether pointer events on the element are forwarded to the core
    pub handle_mouse_events: bool,
    /// Whether text inserted at the start of the range joins the mark
    pub inclusive_left: bool,
    /// Whether text inserted at the end of the range joins the mark
    pub inclusive_right: bool,
    /// Whether the caret skips over the range as a single unit
    pub atomic: bool,
}

impl MarkOptions {
    /// Options used for rendered markdown: non-inclusive on both sides,
    /// mouse events forwarded.
    pub fn replaced_with(element: RenderedElement) -> Self {
        Self {
            replaced_with: element,
            handle_mouse_events: true,
            inclusive_left: false,
            inclusive_right: false,
            atomic: false,
        }
    }

    pub fn atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capabilities
// ─────────────────────────────────────────────────────────────────────────────

/// Capabilities a host surface advertises. The core refuses to attach to a
/// surface that lacks any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    /// `mark_text` / `find_mark` / `clear_mark` / `get_all_marks`
    pub marks: bool,
    /// `pos_from_index` / `index_from_pos`
    pub position_mapping: bool,
    /// `begin_operation` / `end_operation`
    pub batching: bool,
    /// Change and cursor notifications reach the core
    pub events: bool,
}

impl SurfaceCapabilities {
    pub const fn all() -> Self {
        Self {
            marks: true,
            position_mapping: true,
            batching: true,
            events: true,
        }
    }

    /// Name of the first missing capability, if any.
    pub fn missing(&self) -> Option<&'static str> {
        if !self.marks {
            Some("mark_text")
        } else if !self.position_mapping {
            Some("pos_from_index")
        } else if !self.batching {
            Some("operation")
        } else if !self.events {
            Some("events")
        } else {
            None
        }
    }
}

impl Default for SurfaceCapabilities {
    fn default() -> Self {
        Self::all()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Raw input notification: the text the user just typed. The surface has
/// already inserted it and the caret sits after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputChange {
    pub text: String,
}

impl InputChange {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// First typed character, if any.
    pub fn first_char(&self) -> Option<char> {
        self.text.chars().next()
    }
}

/// A pointer click on a rendered element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickEvent {
    /// Mark whose element received the click
    pub mark: MarkId,
    /// Horizontal pointer coordinate
    pub x: f32,
    /// Left edge of the element's bounding box
    pub element_left: f32,
    /// Width of the element's bounding box
    pub element_width: f32,
}

impl ClickEvent {
    /// Click position as a fraction of the element width, clamped to `[0, 1]`.
    pub fn relative_position(&self) -> f64 {
        if self.element_width <= 0.0 || !self.element_width.is_finite() {
            return 0.0;
        }
        let relative = f64::from(self.x - self.element_left) / f64::from(self.element_width);
        if relative.is_nan() {
            0.0
        } else {
            relative.clamp(0.0, 1.0)
        }
    }
}

/// Events a host surface delivers to the core.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Change,
    CursorActivity,
    InputRead(InputChange),
    Focus,
    Blur,
    Click(ClickEvent),
}

// ─────────────────────────────────────────────────────────────────────────────
// TextSurface Trait
// ─────────────────────────────────────────────────────────────────────────────

/// The host editing widget, as seen by the rendering core.
///
/// All offsets are flat character offsets into the document.
pub trait TextSurface {
    fn capabilities(&self) -> SurfaceCapabilities {
        SurfaceCapabilities::all()
    }

    /// Full document text.
    fn get_value(&self) -> String;

    /// Text of `line` without its line terminator.
    fn get_line(&self, line: usize) -> Option<String>;

    fn line_count(&self) -> usize;

    fn get_cursor(&self) -> Position;

    fn set_cursor(&mut self, pos: Position);

    /// Current selection as `(anchor, head)`, or `None` when only a caret exists.
    fn get_selection(&self) -> Option<(Position, Position)> {
        None
    }

    fn set_selection(&mut self, _anchor: Position, head: Position) {
        self.set_cursor(head);
    }

    fn pos_from_index(&self, offset: usize) -> Position;

    fn index_from_pos(&self, pos: Position) -> usize;

    /// Replace `[from, to)` with `text`; inserts at `from` when `to` is `None`.
    fn replace_range(&mut self, text: &str, from: Position, to: Option<Position>);

    /// Text between two positions.
    fn get_range(&self, from: Position, to: Position) -> String {
        let start = self.index_from_pos(from);
        let end = self.index_from_pos(to);
        if start >= end {
            return String::new();
        }
        self.get_value().chars().skip(start).take(end - start).collect()
    }

    fn mark_text(&mut self, from: Position, to: Position, options: MarkOptions) -> MarkId;

    /// Current range of a mark, or `None` once it has been cleared.
    fn find_mark(&self, mark: MarkId) -> Option<(Position, Position)>;

    fn clear_mark(&mut self, mark: MarkId);

    fn get_all_marks(&self) -> Vec<MarkId>;

    /// Start a batch; the surface must not repaint until the matching
    /// [`end_operation`](Self::end_operation).
    fn begin_operation(&mut self);

    fn end_operation(&mut self);

    /// Run `f` as a single batched update.
    fn operation<R, F>(&mut self, f: F) -> R
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> R,
    {
        self.begin_operation();
        let result = f(self);
        self.end_operation();
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
