//! Note editor facade
//!
//! `NoteEditor` owns a text surface together with the render manager and the
//! auto-pair handler, and routes surface events to them in a fixed order.

use crate::autopair::AutoPairHandler;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::markdown::formatting::{apply_raw_format, FormatResult, MarkdownFormatCommand};
use crate::render::{DecorationSnapshot, RenderManager};
use crate::surface::{ClickEvent, InputChange, RopeSurface, SurfaceEvent, TextSurface};
use log::{debug, info, warn};
use std::time::Instant;

/// Upper bound on event rounds drained by [`NoteEditor::pump_events`].
const MAX_EVENT_ROUNDS: usize = 64;

/// A note: one text surface plus the live-rendering and auto-pair features.
#[derive(Debug)]
pub struct NoteEditor<S: TextSurface> {
    surface: S,
    renderer: RenderManager,
    auto_pair: AutoPairHandler,
}

impl<S: TextSurface> NoteEditor<S> {
    /// Attach to `surface`.
    ///
    /// # Errors
    ///
    /// Returns `Error::SurfaceCapability` if the surface lacks marks, position
    /// mapping, batching or events.
    pub fn new(surface: S, settings: &Settings) -> Result<Self> {
        if let Some(capability) = surface.capabilities().missing() {
            warn!("Text surface is missing '{}'", capability);
            return Err(Error::SurfaceCapability { capability });
        }

        info!(
            "Note editor attached (render: {}, auto-pair: {})",
            settings.render.enabled, settings.auto_pair.enabled
        );
        Ok(Self {
            surface,
            renderer: RenderManager::new(settings.render),
            auto_pair: AutoPairHandler::from_settings(&settings.auto_pair),
        })
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn renderer(&self) -> &RenderManager {
        &self.renderer
    }

    pub fn auto_pair(&self) -> &AutoPairHandler {
        &self.auto_pair
    }

    /// Swap in new settings; a pending auto-pair insert is dropped.
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.renderer.set_settings(settings.render);
        self.auto_pair = AutoPairHandler::from_settings(&settings.auto_pair);
        self.update_rendering();
    }

    /// Run a full render pass.
    pub fn update_rendering(&mut self) {
        self.renderer.update_rendering(&mut self.surface);
    }

    /// Live decorations as the surface currently sees them.
    pub fn snapshot(&self) -> Vec<DecorationSnapshot> {
        self.renderer.snapshot(&self.surface)
    }

    /// Feed a raw input notification to the auto-pair handler.
    pub fn handle_input_read(&mut self, change: &InputChange) {
        self.handle_input_read_at(change, Instant::now());
    }

    /// [`handle_input_read`](Self::handle_input_read) with an explicit clock.
    pub fn handle_input_read_at(&mut self, change: &InputChange, now: Instant) {
        self.auto_pair
            .handle_input_read(&mut self.surface, change, now);
    }

    /// Fire a due auto-pair insert. Returns whether the document changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.auto_pair.tick(&mut self.surface, now)
    }

    /// Handle a click on a rendered element. Returns `false` if it hit no
    /// live decoration.
    pub fn click(&mut self, click: &ClickEvent) -> bool {
        self.renderer.handle_click(&mut self.surface, click)
    }

    /// Route one surface event.
    pub fn dispatch(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Change | SurfaceEvent::Focus | SurfaceEvent::Blur => {
                self.update_rendering();
            }
            SurfaceEvent::CursorActivity => {
                self.renderer.handle_cursor_activity(&mut self.surface);
                self.update_rendering();
            }
            SurfaceEvent::InputRead(change) => self.handle_input_read(&change),
            SurfaceEvent::Click(click) => {
                self.click(&click);
            }
        }
    }

    /// Apply a formatting command to the current selection or caret.
    ///
    /// The document is changed with a single `replace_range` covering only
    /// the characters that differ.
    pub fn apply_format(&mut self, command: MarkdownFormatCommand) -> FormatResult {
        let text = self.surface.get_value();
        let selection = match self.surface.get_selection() {
            Some((anchor, head)) => (
                self.surface.index_from_pos(anchor),
                self.surface.index_from_pos(head),
            ),
            None => {
                let caret = self.surface.index_from_pos(self.surface.get_cursor());
                (caret, caret)
            }
        };

        let result = apply_raw_format(&text, selection, command);
        debug!(
            "{:?} ({}) applied: {}",
            command,
            command.shortcut_label(),
            result.applied
        );

        let (prefix, old_mid, new_mid) = changed_span(&text, &result.text);
        let new_text: String = result.text.chars().skip(prefix).take(new_mid).collect();
        self.surface.operation(|s| {
            if old_mid > 0 || new_mid > 0 {
                let from = s.pos_from_index(prefix);
                let to = s.pos_from_index(prefix + old_mid);
                s.replace_range(&new_text, from, Some(to));
            }
            match result.selection {
                Some((start, end)) => {
                    let anchor = s.pos_from_index(start);
                    let head = s.pos_from_index(end);
                    s.set_selection(anchor, head);
                }
                None => {
                    let caret = s.pos_from_index(result.cursor);
                    s.set_cursor(caret);
                }
            }
        });
        result
    }

    /// Move the caret to a character offset.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOffset` if `offset` lies past the document end.
    pub fn set_cursor_offset(&mut self, offset: usize) -> Result<()> {
        let len = self.surface.get_value().chars().count();
        if offset > len {
            return Err(Error::InvalidOffset { offset, len });
        }
        let pos = self.surface.pos_from_index(offset);
        self.surface.set_cursor(pos);
        Ok(())
    }
}

impl NoteEditor<RopeSurface> {
    /// Dispatch every queued surface event, including the ones raised while
    /// handling earlier events. Returns the number of events handled.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        for _ in 0..MAX_EVENT_ROUNDS {
            let events = self.surface.drain_events();
            if events.is_empty() {
                return handled;
            }
            handled += events.len();
            for event in events {
                self.dispatch(event);
            }
        }
        warn!("Event queue still busy after {} rounds", MAX_EVENT_ROUNDS);
        handled
    }
}

/// Length of the common prefix, and of the differing middle part in the old
/// and new text, all in characters.
fn changed_span(old: &str, new: &str) -> (usize, usize, usize) {
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let prefix = old_chars
        .iter()
        .zip(&new_chars)
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = old_chars.len().min(new_chars.len()) - prefix;
    let suffix = old_chars
        .iter()
        .rev()
        .zip(new_chars.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    (
        prefix,
        old_chars.len() - prefix - suffix,
        new_chars.len() - prefix - suffix,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
