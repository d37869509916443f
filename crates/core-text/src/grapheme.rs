//! Grapheme and word boundary helpers. Pure functions over a single line; byte offsets.

use unicode_segmentation::UnicodeSegmentation;

/// Previous grapheme boundary (returns 0 if already at or below 1st boundary).
pub fn prev_boundary(line: &str, byte: usize) -> usize {
    if byte == 0 || byte > line.len() {
        return 0;
    }
    let mut last = 0;
    for (idx, _) in line.grapheme_indices(true) {
        if idx >= byte {
            break;
        }
        last = idx;
    }
    last
}

/// Next grapheme boundary (returns line.len() if at or beyond end).
pub fn next_boundary(line: &str, byte: usize) -> usize {
    if byte >= line.len() {
        return line.len();
    }
    for (idx, _) in line.grapheme_indices(true) {
        if idx > byte {
            return idx;
        }
    }
    line.len()
}

fn is_blank(segment: &str) -> bool {
    segment.chars().all(char::is_whitespace)
}

/// Start of the word ending at or before `byte`, skipping any whitespace run in between.
pub fn prev_word_boundary(line: &str, byte: usize) -> usize {
    let byte = floor_char_boundary(line, byte);
    line[..byte]
        .split_word_bound_indices()
        .rev()
        .find(|(_, seg)| !is_blank(seg))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// End of the word starting at or after `byte`, skipping any whitespace run in between.
pub fn next_word_boundary(line: &str, byte: usize) -> usize {
    let byte = floor_char_boundary(line, byte);
    line[byte..]
        .split_word_bound_indices()
        .find(|(_, seg)| !is_blank(seg))
        .map(|(idx, seg)| byte + idx + seg.len())
        .unwrap_or(line.len())
}

fn floor_char_boundary(s: &str, byte: usize) -> usize {
    let mut b = byte.min(s.len());
    while !s.is_char_boundary(b) {
        b -= 1;
    }
    b
}
