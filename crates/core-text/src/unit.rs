//! Deletion units: how far a directional delete reaches from a caret.
//!
//! Browsers do not report how much a collapsed-selection delete removed, so the
//! reconstructor picks a unit per input verb. `Char` removes one Unicode scalar
//! (one or two UTF-16 code units); `Grapheme` and `Word` are resolved against the
//! line containing the caret (the previous line, including its line break, when
//! deleting backward from a line start); `Line` reaches the line edge and, when
//! already there, removes the line break.

use crate::{Buffer, grapheme};
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteUnit {
    Char,
    Grapheme,
    Word,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Backward,
    Forward,
}

impl Buffer {
    /// UTF-16 range of the unit adjacent to `offset` in `direction`. Empty at buffer edges.
    pub fn unit_range(&self, offset: usize, unit: DeleteUnit, direction: Direction) -> Range<usize> {
        let caret = self.char_idx(offset);
        let chars = match direction {
            Direction::Backward => self.unit_before(caret, unit)..caret,
            Direction::Forward => caret..self.unit_after(caret, unit),
        };
        self.utf16_of_char(chars.start)..self.utf16_of_char(chars.end)
    }

    fn unit_before(&self, caret: usize, unit: DeleteUnit) -> usize {
        if caret == 0 {
            return 0;
        }
        let rope = self.rope();
        let line = rope.char_to_line(caret);
        let line_start = rope.line_to_char(line);
        match unit {
            DeleteUnit::Char => caret - 1,
            DeleteUnit::Line if caret > line_start => line_start,
            DeleteUnit::Line => {
                let mut start = caret - 1;
                if start > 0 && rope.char(start) == '\n' && rope.char(start - 1) == '\r' {
                    start -= 1;
                }
                start
            }
            DeleteUnit::Grapheme | DeleteUnit::Word => {
                // At a line start the unit lives at the tail of the previous line.
                let ctx = if caret == line_start { line - 1 } else { line };
                let ctx_start = rope.line_to_char(ctx);
                let text = rope.line(ctx).to_string();
                let byte = byte_of_char(&text, caret - ctx_start);
                let boundary = match unit {
                    DeleteUnit::Grapheme => grapheme::prev_boundary(&text, byte),
                    _ => grapheme::prev_word_boundary(&text, byte),
                };
                ctx_start + text[..boundary].chars().count()
            }
        }
    }

    fn unit_after(&self, caret: usize, unit: DeleteUnit) -> usize {
        let rope = self.rope();
        let len = rope.len_chars();
        if caret >= len {
            return len;
        }
        let line = rope.char_to_line(caret);
        let line_start = rope.line_to_char(line);
        let text = rope.line(line).to_string();
        let byte = byte_of_char(&text, caret - line_start);
        let boundary = match unit {
            DeleteUnit::Char => return caret + 1,
            DeleteUnit::Grapheme => grapheme::next_boundary(&text, byte),
            DeleteUnit::Word => grapheme::next_word_boundary(&text, byte),
            DeleteUnit::Line => {
                let content = text.trim_end_matches(['\n', '\r']).len();
                if byte < content { content } else { text.len() }
            }
        };
        line_start + text[..boundary].chars().count()
    }
}

fn byte_of_char(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}
