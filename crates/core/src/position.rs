//! Line/column bookkeeping.
//!
//! Everything inside this crate is addressed by UTF-8 byte offsets (tree-sitter's model), while
//! sourcemaps speak `(line, column)` with columns counted in UTF-16 code units. This module owns
//! both views:
//!
//! - [`Position`] is the human-facing location used for comments, template chunks and errors
//!   (1-based line, 0-based byte column, absolute byte offset).
//! - [`LineIndex`] knows where each line starts.
//! - [`Utf16Cursor`] converts byte offsets to UTF-16 columns. Conversions are expected to arrive
//!   in roughly ascending order (sourcemap generation walks the output left to right), so the
//!   cursor remembers where it stopped instead of rescanning from the line start. This keeps
//!   single-line bundles (the usual shape of minified output) linear.

/// A location in a source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 0-based column, in bytes from the line start.
    pub column: usize,
    /// Absolute byte offset.
    pub offset: usize,
}

impl Position {
    /// Build a position from a tree-sitter point (0-based row) and a byte offset.
    pub fn from_point(point: tree_sitter::Point, offset: usize) -> Self {
        Self {
            line: point.row + 1,
            column: point.column,
            offset,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Line start table for a text. Lines are split on `\n` only.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0usize];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// 0-based line containing `offset`. Offsets past the end resolve to the last line.
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset) - 1
    }
}

/// Incremental byte offset to `(line, utf16_col)` converter over a [`LineIndex`].
#[derive(Debug, Clone)]
pub struct Utf16Cursor<'i, 'a> {
    index: &'i LineIndex<'a>,
    line: usize,
    byte: usize,
    col: usize,
}

impl<'i, 'a> Utf16Cursor<'i, 'a> {
    pub fn new(index: &'i LineIndex<'a>) -> Self {
        Self {
            index,
            line: 0,
            byte: 0,
            col: 0,
        }
    }

    /// Convert `offset` into a 0-based `(line, utf16_col)` pair.
    ///
    /// Offsets inside a multi-byte character clamp to the start of that character. Offsets past
    /// the end of the text clamp to the end.
    pub fn seek(&mut self, offset: usize) -> (u32, u32) {
        let text = self.index.text();
        let mut target = offset.min(text.len());
        while !text.is_char_boundary(target) {
            target -= 1;
        }

        let line = self.index.line_of(target);
        if line != self.line || target < self.byte {
            self.line = line;
            self.byte = self.index.line_starts[line];
            self.col = 0;
        }

        let rest = &text[self.byte..target];
        self.col += if rest.is_ascii() {
            rest.len()
        } else {
            rest.chars().map(char::len_utf16).sum()
        };
        self.byte = target;

        (self.line as u32, self.col as u32)
    }
}
