//! Byte-offset to line/column conversion.
//!
//! Line starts are recorded from actual byte positions, so offsets stay exact
//! for `\n`, `\r\n` and bare `\r` terminators alike. Nothing here assumes a
//! terminator width.

use crate::locality::Position;

/// Precomputed byte offset of every line start in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// `offsets[i]` is the byte offset where line `i` (0-indexed) begins.
    offsets: Vec<usize>,
}

impl LineIndex {
    /// Build a line index for `text`.
    pub fn new(text: &str) -> Self {
        let mut offsets = vec![0];
        let bytes = text.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\n' => offsets.push(i + 1),
                b'\r' => {
                    if bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                    offsets.push(i + 1);
                }
                _ => {}
            }
            i += 1;
        }

        Self { offsets }
    }

    /// Number of lines (an empty text has one line).
    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }

    /// Byte offset where the given line (0-indexed) starts.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.offsets.get(line).copied()
    }

    /// Convert a byte offset in `text` to a 1-indexed position.
    ///
    /// `text` must be the string the index was built from. Offsets past the
    /// end clamp to the end of the text.
    pub fn position(&self, text: &str, offset: usize) -> Position {
        let offset = offset.min(text.len());
        let line = match self.offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert_point) => insert_point.saturating_sub(1),
        };
        let start = self.offsets[line];
        let column = text
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        Position::new(line as u32 + 1, column as u32 + 1)
    }

    /// Convert a 1-indexed position back to a byte offset in `text`.
    ///
    /// Returns `None` if the line does not exist. Columns past the end of the
    /// line clamp to the line end.
    pub fn offset(&self, text: &str, pos: Position) -> Option<usize> {
        let line = (pos.line as usize).checked_sub(1)?;
        let start = self.line_start(line)?;
        let end = self.line_start(line + 1).unwrap_or(text.len());
        let line_text = text.get(start..end)?;
        let skip = (pos.column as usize).saturating_sub(1);
        let within = line_text
            .char_indices()
            .nth(skip)
            .map(|(i, _)| i)
            .unwrap_or(line_text.len());
        Some(start + within)
    }
}
