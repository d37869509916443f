//! Rope-based text buffer addressed in UTF-16 code units.
//!
//! Captured documents report every offset (`pos`, selection `index`) in the
//! code units of the capturing field, which are UTF-16 code units. The buffer
//! keeps its content in a `ropey::Rope` and translates at the API boundary so
//! callers never see char or byte indices.
//!
//! Offsets that land inside a surrogate pair snap to the start of the pair; a
//! Rust string cannot hold half a pair, so this is the only lossy conversion.

use ropey::Rope;
use std::fmt;
use std::ops::Range;

pub mod grapheme;
pub mod unit;

pub use unit::{DeleteUnit, Direction};

/// A text buffer backed by a `ropey::Rope`.
#[derive(Clone, Debug, Default)]
pub struct Buffer {
    rope: Rope,
}

impl Buffer {
    pub fn new(content: &str) -> Self {
        Self {
            rope: Rope::from_str(content),
        }
    }

    /// Replace the whole content.
    pub fn set(&mut self, content: &str) {
        self.rope = Rope::from_str(content);
    }

    /// Length in UTF-16 code units.
    pub fn len_utf16(&self) -> usize {
        self.rope.len_utf16_cu()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Clamp an offset into `[0, len]`, snapping it down onto a char boundary.
    pub fn clamp(&self, offset: usize) -> usize {
        let char_idx = self.char_idx(offset);
        self.rope.char_to_utf16_cu(char_idx)
    }

    /// Insert `text` at `offset` (clamped). Returns the UTF-16 range now occupied by `text`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Range<usize> {
        let char_idx = self.char_idx(offset);
        let start = self.rope.char_to_utf16_cu(char_idx);
        self.rope.insert(char_idx, text);
        start..start + utf16_len(text)
    }

    /// Remove the UTF-16 range (clamped, endpoints reordered if needed) and return the removed text.
    pub fn remove(&mut self, range: Range<usize>) -> String {
        let (start, end) = self.char_range(range);
        if start == end {
            return String::new();
        }
        let removed = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);
        removed
    }

    /// Replace a UTF-16 range with `text`. Returns the range now occupied by `text`.
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> Range<usize> {
        let (start, end) = self.char_range(range);
        if start != end {
            self.rope.remove(start..end);
        }
        let at = self.rope.char_to_utf16_cu(start);
        self.rope.insert(start, text);
        at..at + utf16_len(text)
    }

    /// Copy out the text covered by a UTF-16 range (clamped).
    pub fn slice(&self, range: Range<usize>) -> String {
        let (start, end) = self.char_range(range);
        self.rope.slice(start..end).to_string()
    }

    pub(crate) fn rope(&self) -> &Rope {
        &self.rope
    }

    /// UTF-16 offset -> char index, clamped to the buffer end.
    pub(crate) fn char_idx(&self, offset: usize) -> usize {
        let offset = offset.min(self.rope.len_utf16_cu());
        self.rope.utf16_cu_to_char(offset)
    }

    pub(crate) fn utf16_of_char(&self, char_idx: usize) -> usize {
        self.rope.char_to_utf16_cu(char_idx.min(self.rope.len_chars()))
    }

    fn char_range(&self, range: Range<usize>) -> (usize, usize) {
        let a = self.char_idx(range.start);
        let b = self.char_idx(range.end);
        (a.min(b), a.max(b))
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.rope, f)
    }
}

impl From<&str> for Buffer {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

/// Length of `s` in UTF-16 code units.
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// Byte offset in `s` of a UTF-16 offset, clamped and snapped down onto a char boundary.
pub fn byte_offset(s: &str, utf16: usize) -> usize {
    let mut units = 0;
    for (byte, ch) in s.char_indices() {
        let next = units + ch.len_utf16();
        if next > utf16 {
            return byte;
        }
        units = next;
    }
    s.len()
}

/// Convert a raw (possibly malformed) numeric offset from a document into `[0, len]`.
///
/// NaN and negatives map to 0, values past the end map to `len`, fractions floor.
pub fn clamp_offset(raw: f64, len: usize) -> usize {
    if raw.is_nan() || raw <= 0.0 {
        0
    } else if raw >= len as f64 {
        len
    } else {
        raw.floor() as usize
    }
}
