//! Auto-pairing of inline markdown markers
//!
//! Typing an emphasis, strikethrough or code marker inserts its closer so the
//! caret ends up between the pair. Closers for a freshly typed single marker
//! are inserted after a short deferral, re-validated against the line as it
//! is when the deferral fires.

use crate::config::AutoPairSettings;
use crate::string_utils::{char_len, count_non_overlapping, split_at_char};
use crate::surface::{InputChange, Position, TextSurface};
use log::{debug, trace};
use std::time::{Duration, Instant};

// ─────────────────────────────────────────────────────────────────────────────
// Rules
// ─────────────────────────────────────────────────────────────────────────────

/// A validated pairing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub opener: char,
    pub closer: char,
    pub double_only: bool,
}

impl Pair {
    fn double_opener(&self) -> String {
        self.opener.to_string().repeat(2)
    }

    fn double_closer(&self) -> String {
        self.closer.to_string().repeat(2)
    }
}

/// Whether `text` holds an opener without its closer.
fn is_unbalanced(text: &str, opener: &str, closer: &str) -> bool {
    let opened = count_non_overlapping(text, opener);
    if opener == closer {
        opened % 2 == 1
    } else {
        opened > count_non_overlapping(text, closer)
    }
}

fn trailing_run(text: &str, c: char, cap: usize) -> usize {
    text.chars().rev().take_while(|&x| x == c).take(cap).count()
}

fn leading_run(text: &str, c: char, cap: usize) -> usize {
    text.chars().take_while(|&x| x == c).take(cap).count()
}

/// `text` without its final character.
fn without_last_char(text: &str) -> &str {
    match text.char_indices().next_back() {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Deferred Insert
// ─────────────────────────────────────────────────────────────────────────────

/// What must hold at fire time for a deferred closer to be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// The text after the target does not already start with the closer
    NotFollowedByCloser,
    /// As above, and the rest of the line is not blank
    NotFollowedByCloserOrBlank,
}

/// A scheduled closer insertion. Only the target position is trusted; the
/// line is re-read when the action fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredInsert {
    pub target: Position,
    pub closer: char,
    pub count: usize,
    pub guard: Guard,
    pub deadline: Instant,
}

impl DeferredInsert {
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Insert the closer if the line still allows it. Returns whether the
    /// document changed.
    fn fire<S: TextSurface>(&self, surface: &mut S) -> bool {
        let Some(line) = surface.get_line(self.target.line) else {
            trace!("deferred insert discarded: line {} is gone", self.target.line);
            return false;
        };
        if self.target.ch > char_len(&line) {
            trace!("deferred insert discarded: {:?} is past the line end", self.target);
            return false;
        }

        let (_, after) = split_at_char(&line, self.target.ch);
        let blocked = match self.guard {
            Guard::NotFollowedByCloser => after.starts_with(self.closer),
            Guard::NotFollowedByCloserOrBlank => {
                after.starts_with(self.closer) || after.trim().is_empty()
            }
        };
        if blocked {
            return false;
        }

        let text = self.closer.to_string().repeat(self.count);
        surface.operation(|s| {
            s.replace_range(&text, self.target, None);
            s.set_cursor(self.target);
        });
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handler
// ─────────────────────────────────────────────────────────────────────────────

/// Input filter that inserts closing markers.
///
/// Holds at most one pending deferred insert; every marker input cancels it
/// before doing anything else.
#[derive(Debug, Clone)]
pub struct AutoPairHandler {
    pairs: Vec<Pair>,
    enabled: bool,
    delay: Duration,
    pending: Option<DeferredInsert>,
}

impl Default for AutoPairHandler {
    fn default() -> Self {
        Self::from_settings(&AutoPairSettings::default())
    }
}

impl AutoPairHandler {
    pub fn from_settings(settings: &AutoPairSettings) -> Self {
        let pairs = settings
            .rules
            .iter()
            .filter_map(|rule| {
                Some(Pair {
                    opener: rule.opener_char()?,
                    closer: rule.closer_char()?,
                    double_only: rule.double_only,
                })
            })
            .collect();

        Self {
            pairs,
            enabled: settings.enabled,
            delay: Duration::from_millis(settings.defer_ms),
            pending: None,
        }
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&DeferredInsert> {
        self.pending.as_ref()
    }

    /// Drop the pending deferred insert, if any.
    pub fn cancel(&mut self) {
        if let Some(action) = self.pending.take() {
            trace!("cancelled deferred insert at {:?}", action.target);
        }
    }

    /// React to text the user just typed. The surface has already inserted
    /// it and the caret sits right after it.
    pub fn handle_input_read<S: TextSurface>(
        &mut self,
        surface: &mut S,
        change: &InputChange,
        now: Instant,
    ) {
        if !self.enabled {
            return;
        }
        // Pastes and multi-character input are left alone
        let Some(typed) = change.first_char() else {
            return;
        };
        if change.text.chars().nth(1).is_some() {
            return;
        }

        let cursor = surface.get_cursor();
        let Some(line) = surface.get_line(cursor.line) else {
            return;
        };
        let (before, after) = split_at_char(&line, cursor.ch);

        if let Some(pair) = self.pairs.iter().find(|p| p.opener == typed).copied() {
            self.cancel();
            if pair.double_only {
                self.handle_double_only(pair, cursor, before, now);
            } else {
                self.handle_opener(surface, pair, cursor, before, after, now);
            }
        } else if !typed.is_whitespace() {
            self.handle_regular(surface, cursor, before, after);
        }
    }

    /// Fire the pending insert once its deadline has passed. Returns whether
    /// the document changed.
    pub fn tick<S: TextSurface>(&mut self, surface: &mut S, now: Instant) -> bool {
        if !self.pending.as_ref().is_some_and(|p| p.is_due(now)) {
            return false;
        }
        match self.pending.take() {
            Some(action) => action.fire(surface),
            None => false,
        }
    }

    fn schedule(&mut self, target: Position, closer: char, count: usize, guard: Guard, now: Instant) {
        debug!("deferring {}x{:?} at {}:{}", count, closer, target.line, target.ch);
        self.pending = Some(DeferredInsert {
            target,
            closer,
            count,
            guard,
            deadline: now + self.delay,
        });
    }

    fn handle_double_only(&mut self, pair: Pair, cursor: Position, before: &str, now: Instant) {
        if trailing_run(before, pair.opener, 2) == 2
            && is_unbalanced(before, &pair.double_opener(), &pair.double_closer())
        {
            self.schedule(cursor, pair.closer, 2, Guard::NotFollowedByCloser, now);
        }
    }

    fn handle_opener<S: TextSurface>(
        &mut self,
        surface: &mut S,
        pair: Pair,
        cursor: Position,
        before: &str,
        after: &str,
        now: Instant,
    ) {
        let run = trailing_run(before, pair.opener, 3);
        if run >= 2 {
            if is_unbalanced(before, &pair.double_opener(), &pair.double_closer()) {
                let present = leading_run(after, pair.closer, run);
                insert_closers(surface, cursor, pair.closer, run - present);
            }
            return;
        }

        self.schedule(
            cursor,
            pair.closer,
            1,
            Guard::NotFollowedByCloserOrBlank,
            now,
        );
    }

    fn handle_regular<S: TextSurface>(
        &mut self,
        surface: &mut S,
        cursor: Position,
        before: &str,
        after: &str,
    ) {
        let preceding = without_last_char(before);

        for pair in self.pairs.clone() {
            let run = trailing_run(preceding, pair.opener, 3);
            if run >= 2 {
                if is_unbalanced(preceding, &pair.double_opener(), &pair.double_closer()) {
                    let missing = run - leading_run(after, pair.closer, run);
                    if missing > 0 {
                        self.cancel();
                        insert_closers(surface, cursor, pair.closer, missing);
                    }
                }
                return;
            }

            if run == 1
                && !pair.double_only
                && self.pending.is_some()
                && is_unbalanced(preceding, &pair.opener.to_string(), &pair.closer.to_string())
            {
                self.cancel();
                if !after.starts_with(pair.closer) {
                    insert_closers(surface, cursor, pair.closer, 1);
                }
                return;
            }
        }
    }
}

/// Insert `count` closers at `cursor`, leaving the caret in front of them.
fn insert_closers<S: TextSurface>(surface: &mut S, cursor: Position, closer: char, count: usize) {
    if count == 0 {
        return;
    }
    let text = closer.to_string().repeat(count);
    trace!("inserting {:?} at {}:{}", text, cursor.line, cursor.ch);
    surface.operation(|s| {
        s.replace_range(&text, cursor, None);
        s.set_cursor(cursor);
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PairingRule;
    use crate::surface::RopeSurface;

    fn surface_at(text: &str, ch: usize) -> RopeSurface {
        let mut surface = RopeSurface::from_str(text);
        surface.set_cursor(Position::new(0, ch));
        surface
    }

    fn type_str(handler: &mut AutoPairHandler, surface: &mut RopeSurface, text: &str, now: Instant) {
        surface.type_text(text);
        handler.handle_input_read(surface, &InputChange::new(text), now);
    }

    fn later(now: Instant) -> Instant {
        now + Duration::from_millis(50)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_is_unbalanced() {
        assert!(is_unbalanced("a *b", "*", "*"));
        assert!(!is_unbalanced("*a* b", "*", "*"));
        assert!(is_unbalanced("**x** **", "**", "**"));
        assert!(is_unbalanced("[a", "[", "]"));
        assert!(!is_unbalanced("[a]", "[", "]"));
    }

    #[test]
    fn test_runs() {
        assert_eq!(trailing_run("ab***", '*', 3), 3);
        assert_eq!(trailing_run("ab****", '*', 3), 3);
        assert_eq!(trailing_run("ab", '*', 3), 0);
        assert_eq!(leading_run("*x", '*', 2), 1);
        assert_eq!(without_last_char("på"), "p");
        assert_eq!(without_last_char(""), "");
    }

    #[test]
    fn test_from_settings_skips_invalid_rules() {
        let mut settings = AutoPairSettings::default();
        settings.rules.push(PairingRule {
            opener: "++".to_string(),
            closer: "+".to_string(),
            double_only: false,
        });
        let handler = AutoPairHandler::from_settings(&settings);
        assert_eq!(handler.pairs().len(), 4);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Single Opener
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_deferred_single_opener() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("Hello world", 6);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "*", now);
        assert_eq!(surface.get_value(), "Hello *world");
        assert!(handler.has_pending());

        assert!(!handler.tick(&mut surface, now));
        assert!(handler.tick(&mut surface, later(now)));
        assert_eq!(surface.get_value(), "Hello **world");
        assert_eq!(surface.get_cursor(), Position::new(0, 7));
        assert!(!handler.has_pending());
    }

    #[test]
    fn test_deferred_single_opener_skipped_at_line_end() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("Hello ", 6);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "*", now);
        assert!(!handler.tick(&mut surface, later(now)));
        assert_eq!(surface.get_value(), "Hello *");
        assert!(!handler.has_pending());
    }

    #[test]
    fn test_deferred_single_opener_skipped_before_closer() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("a `b", 2);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "`", now);
        assert_eq!(surface.get_value(), "a ``b");
        assert!(!handler.tick(&mut surface, later(now)));
        assert_eq!(surface.get_value(), "a ``b");
    }

    #[test]
    fn test_single_opener_paired_regardless_of_earlier_markers() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("*ab more", 3);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "*", now);
        assert!(handler.has_pending());
        assert_eq!(surface.get_value(), "*ab* more");

        assert!(handler.tick(&mut surface, later(now)));
        assert_eq!(surface.get_value(), "*ab** more");
        assert_eq!(surface.get_cursor(), Position::new(0, 4));
    }

    #[test]
    fn test_single_opener_after_open_marker_before_word() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("*x y", 3);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "*", now);
        assert!(handler.tick(&mut surface, now + Duration::from_millis(10)));
        assert_eq!(surface.get_value(), "*x **y");
        assert_eq!(surface.get_cursor(), Position::new(0, 4));
    }

    #[test]
    fn test_regular_char_flushes_pending_single() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("Hello ", 6);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "*", now);
        type_str(&mut handler, &mut surface, "w", now);

        assert_eq!(surface.get_value(), "Hello *w*");
        assert_eq!(surface.get_cursor(), Position::new(0, 8));
        assert!(!handler.has_pending());
        assert!(!handler.tick(&mut surface, later(now)));
    }

    #[test]
    fn test_marker_input_replaces_pending() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("Hello world", 6);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "*", now);
        type_str(&mut handler, &mut surface, "_", now);

        let pending = handler.pending().unwrap();
        assert_eq!(pending.target, Position::new(0, 8));
        assert_eq!(pending.closer, '_');
    }

    #[test]
    fn test_cancel_drops_pending() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("x y", 2);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "*", now);
        handler.cancel();
        assert!(!handler.tick(&mut surface, later(now)));
        assert_eq!(surface.get_value(), "x *y");
    }

    #[test]
    fn test_stale_target_is_discarded() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("ab cd", 3);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "*", now);
        surface.replace_range("", Position::new(0, 0), Some(Position::new(0, 6)));

        assert!(!handler.tick(&mut surface, later(now)));
        assert_eq!(surface.get_value(), "");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Double Opener
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_fast_double_opener_inserts_pair() {
        let mut handler = AutoPairHandler::default();
        let mut surface = RopeSurface::new();
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "*", now);
        type_str(&mut handler, &mut surface, "*", now);
        assert_eq!(surface.get_value(), "****");
        assert_eq!(surface.get_cursor(), Position::new(0, 2));

        type_str(&mut handler, &mut surface, "b", now);
        assert_eq!(surface.get_value(), "**b**");
        assert_eq!(surface.get_cursor(), Position::new(0, 3));
    }

    #[test]
    fn test_slow_double_opener_completes_pair() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("x y", 2);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "*", now);
        assert!(handler.tick(&mut surface, later(now)));
        assert_eq!(surface.get_value(), "x **y");

        type_str(&mut handler, &mut surface, "*", later(now));
        assert_eq!(surface.get_value(), "x ****y");
        assert_eq!(surface.get_cursor(), Position::new(0, 4));
    }

    #[test]
    fn test_closing_double_is_not_paired() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("**bold*", 7);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "*", now);
        assert_eq!(surface.get_value(), "**bold**");
        assert!(!handler.has_pending());
    }

    #[test]
    fn test_regular_char_after_unpaired_double() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("__", 2);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "x", now);
        assert_eq!(surface.get_value(), "__x__");
        assert_eq!(surface.get_cursor(), Position::new(0, 3));
    }

    #[test]
    fn test_regular_char_after_closed_double() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("**a**", 5);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "!", now);
        assert_eq!(surface.get_value(), "**a**!");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Double-Only Opener
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_single_tilde_does_nothing() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("a b", 2);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "~", now);
        assert!(!handler.has_pending());
    }

    #[test]
    fn test_double_tilde_deferred_pair() {
        let mut handler = AutoPairHandler::default();
        let mut surface = RopeSurface::new();
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "~", now);
        type_str(&mut handler, &mut surface, "~", now);
        assert!(handler.tick(&mut surface, later(now)));
        assert_eq!(surface.get_value(), "~~~~");
        assert_eq!(surface.get_cursor(), Position::new(0, 2));
    }

    #[test]
    fn test_regular_char_before_tilde_deferral_fires() {
        let mut handler = AutoPairHandler::default();
        let mut surface = RopeSurface::new();
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "~", now);
        type_str(&mut handler, &mut surface, "~", now);
        type_str(&mut handler, &mut surface, "x", now);

        assert_eq!(surface.get_value(), "~~x~~");
        assert!(!handler.tick(&mut surface, later(now)));
        assert_eq!(surface.get_value(), "~~x~~");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Settings
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_disabled_handler_is_inert() {
        let settings = AutoPairSettings {
            enabled: false,
            ..AutoPairSettings::default()
        };
        let mut handler = AutoPairHandler::from_settings(&settings);
        let mut surface = RopeSurface::new();
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "*", now);
        type_str(&mut handler, &mut surface, "*", now);
        assert_eq!(surface.get_value(), "**");
    }

    #[test]
    fn test_multi_char_input_is_ignored() {
        let mut handler = AutoPairHandler::default();
        let mut surface = surface_at("x y", 2);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "**", now);
        assert_eq!(surface.get_value(), "x **y");
        assert!(!handler.has_pending());
    }

    #[test]
    fn test_defer_delay_follows_settings() {
        let settings = AutoPairSettings {
            defer_ms: 200,
            ..AutoPairSettings::default()
        };
        let mut handler = AutoPairHandler::from_settings(&settings);
        let mut surface = surface_at("x y", 2);
        let now = Instant::now();

        type_str(&mut handler, &mut surface, "*", now);
        assert!(!handler.tick(&mut surface, now + Duration::from_millis(100)));
        assert!(handler.tick(&mut surface, now + Duration::from_millis(200)));
    }
}
