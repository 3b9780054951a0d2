//! UTF-8 Safe String Utilities
//!
//! The tokenizer works with regex byte offsets while the text surface
//! addresses the document in characters. These helpers convert between the
//! two and keep slicing on valid UTF-8 boundaries.
//!
//! # Example
//! ```ignore
//! use crate::string_utils::{char_index_to_byte_index, split_at_char};
//!
//! let text = "Hei på deg";
//! assert_eq!(char_index_to_byte_index(text, 6), 7);
//! assert_eq!(split_at_char(text, 6), ("Hei på", " deg"));
//! ```

// ─────────────────────────────────────────────────────────────────────────────
// Character Boundary Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the largest index that is less than or equal to `index`
/// and is on a UTF-8 character boundary.
///
/// If `index` is greater than the string length, returns the string length.
#[inline]
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

// ─────────────────────────────────────────────────────────────────────────────
// Index Conversion Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Convert a character index to a byte index.
///
/// Returns the string length if `char_index` is beyond the string.
pub fn char_index_to_byte_index(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Number of characters in `s`.
#[inline]
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `s` at a character index; indices past the end split at the end.
pub fn split_at_char(s: &str, char_index: usize) -> (&str, &str) {
    s.split_at(char_index_to_byte_index(s, char_index))
}

/// Non-overlapping occurrences of `pattern` in `text`, scanning left to right.
pub fn count_non_overlapping(text: &str, pattern: &str) -> usize {
    if pattern.is_empty() {
        return 0;
    }
    text.match_indices(pattern).count()
}

/// Forward-only byte → char offset converter.
///
/// Scanning a document produces matches in ascending byte order, so the
/// conversion can resume from the previous answer instead of recounting
/// from the start of the text each time.
#[derive(Debug)]
pub struct CharCursor<'a> {
    text: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> CharCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            byte: 0,
            chars: 0,
        }
    }

    /// Character offset of `byte_index`. Falls back to a full recount when
    /// asked to move backwards.
    pub fn char_offset(&mut self, byte_index: usize) -> usize {
        let target = floor_char_boundary(self.text, byte_index);
        if target < self.byte {
            self.byte = 0;
            self.chars = 0;
        }
        self.chars += self.text[self.byte..target].chars().count();
        self.byte = target;
        self.chars
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_norwegian() {
        let s = "Hei på deg"; // 'å' at byte 5-6
        assert_eq!(floor_char_boundary(s, 5), 5);
        assert_eq!(floor_char_boundary(s, 6), 5);
        assert_eq!(floor_char_boundary(s, 7), 7);
        assert_eq!(floor_char_boundary(s, 99), s.len());
    }

    #[test]
    fn test_char_to_byte_chinese() {
        let s = "你好世界";
        assert_eq!(char_index_to_byte_index(s, 2), 6);
        assert_eq!(char_index_to_byte_index(s, 10), s.len());
    }

    #[test]
    fn test_char_len() {
        assert_eq!(char_len(""), 0);
        assert_eq!(char_len("ø🎉a"), 3);
    }

    #[test]
    fn test_split_at_char() {
        assert_eq!(split_at_char("på deg", 2), ("på", " deg"));
        assert_eq!(split_at_char("ab", 9), ("ab", ""));
    }

    #[test]
    fn test_count_non_overlapping() {
        assert_eq!(count_non_overlapping("***", "**"), 1);
        assert_eq!(count_non_overlapping("**a** b **", "**"), 3);
        assert_eq!(count_non_overlapping("abc", ""), 0);
    }

    #[test]
    fn test_char_cursor_forward() {
        let s = "æ **b** ø *c*";
        let mut cursor = CharCursor::new(s);
        assert_eq!(cursor.char_offset(0), 0);
        assert_eq!(cursor.char_offset(3), 2);
        assert_eq!(cursor.char_offset(s.find("*c").unwrap()), 10);
    }

    #[test]
    fn test_char_cursor_backwards_recounts() {
        let s = "ååå";
        let mut cursor = CharCursor::new(s);
        assert_eq!(cursor.char_offset(6), 3);
        assert_eq!(cursor.char_offset(2), 1);
    }
}
