//! Conversion between LSP positions and byte offsets
//!
//!     LSP positions count lines from zero and columns in UTF-16 code units. The engine works in
//!     byte offsets. `LineIndex` records where each line starts so both directions are a binary
//!     search plus a walk over a single line.
//!
//!     Positions past the end of a line clamp to the line end, and lines past the end of the text
//!     clamp to the text length, matching how editors treat stale positions.

use lsp_types::Position;

/// Byte offsets where each line starts.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (byte_pos, ch) in text.char_indices() {
            if ch == '\n' {
                line_starts.push(byte_pos + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Byte offset of `position` in `text`, which must be the text this index was built from.
    pub fn offset(&self, text: &str, position: Position) -> usize {
        let Some(start) = self.line_start(position.line as usize) else {
            return self.len;
        };
        let line = &text[start..self.line_end(position.line as usize)];
        let line = line.strip_suffix('\r').unwrap_or(line);

        let mut units = 0usize;
        for (idx, ch) in line.char_indices() {
            if units >= position.character as usize {
                return start + idx;
            }
            units += ch.len_utf16();
        }
        start + line.len()
    }

    /// LSP position of byte `offset` in `text`. Offsets inside a character round down.
    pub fn position(&self, text: &str, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|i| i - 1);
        let start = self.line_starts[line];
        let character: usize = text[start..]
            .char_indices()
            .take_while(|&(idx, ch)| start + idx + ch.len_utf8() <= offset)
            .map(|(_, ch)| ch.len_utf16())
            .sum();
        Position::new(line as u32, character as u32)
    }

    /// End of the line's content, excluding its `\n`.
    fn line_end(&self, line: usize) -> usize {
        match self.line_starts.get(line + 1) {
            Some(next) => next - 1,
            None => self.len,
        }
    }
}
