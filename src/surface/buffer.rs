//! Rope-backed text buffer for the embedded surface
//!
//! All positions are char offsets. Out-of-range positions are clamped to the
//! end of the buffer rather than rejected.

use ropey::Rope;
use std::ops::Range;

/// Editable text
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    rope: Rope,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn clamp(&self, char_idx: usize) -> usize {
        char_idx.min(self.rope.len_chars())
    }

    fn clamp_range(&self, range: Range<usize>) -> Range<usize> {
        let start = self.clamp(range.start);
        let end = self.clamp(range.end).max(start);
        start..end
    }

    /// Insert text at a char position; returns the offset just after it
    pub fn insert(&mut self, char_idx: usize, text: &str) -> usize {
        let idx = self.clamp(char_idx);
        if !text.is_empty() {
            self.rope.insert(idx, text);
        }
        idx + text.chars().count()
    }

    /// Remove a range of chars
    pub fn delete(&mut self, range: Range<usize>) {
        let range = self.clamp_range(range);
        if !range.is_empty() {
            self.rope.remove(range);
        }
    }

    /// Replace a range; returns the offset just after the new text
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> usize {
        let range = self.clamp_range(range);
        let start = range.start;
        self.delete(range);
        self.insert(start, text)
    }

    /// Surround a range with `prefix` and `suffix`; returns the offset after the suffix
    pub fn wrap(&mut self, range: Range<usize>, prefix: &str, suffix: &str) -> usize {
        let range = self.clamp_range(range);
        let end = self.insert(range.end, suffix);
        self.insert(range.start, prefix);
        end + prefix.chars().count()
    }

    /// Replace the whole contents
    pub fn set_content(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }
}
