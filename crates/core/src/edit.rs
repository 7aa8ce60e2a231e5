//! Edit and sourcemap utilities.
//!
//! This module defines [`Edit`], a non-overlapping byte-range replacement over the original
//! JavaScript source, [`render`] which applies a list of edits in one left-to-right pass, and
//! [`create_sourcemap`] which maps the rendered output back to the input.
//!
//! Key ideas:
//!
//! - Internal offsets are byte-based (tree-sitter's model).
//! - Sourcemap columns are emitted as UTF-16 code unit columns (matching typical JS sourcemap
//!   consumers).
//! - Each edit carries a per-output-byte origin map (see [`Edit::output_byte_to_input_byte`]) so
//!   text kept inside a minified chunk still maps to where it came from. Collapsed whitespace maps
//!   to the start of the run it replaced.
//!
//! Invariants:
//!
//! - `edits` must be sorted by ascending `start` and must not overlap ([`validate_edits`]).
//! - Edit boundaries must fall on UTF-8 character boundaries of the input.

use sourcemap::{SourceMap, SourceMapBuilder};

use crate::{
    MinifyError,
    position::{LineIndex, Utf16Cursor},
};

/// A replacement of `input[start..end]` by `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Start byte offset (inclusive) in the input code.
    pub start: usize,
    /// End byte offset (exclusive) in the input code.
    pub end: usize,
    /// Replacement text inserted into the output code.
    pub replacement: String,
    /// For each output byte in `replacement`, the originating byte offset in the input code.
    ///
    /// `None` marks a newly inserted byte, which is emitted as unmapped.
    pub output_byte_to_input_byte: Vec<Option<usize>>,
}

impl Edit {
    /// Replace `start..end`, where `origins[i]` is the offset relative to `start` that output byte
    /// `i` came from.
    pub fn with_origins(start: usize, end: usize, replacement: String, origins: &[usize]) -> Self {
        Self {
            start,
            end,
            replacement,
            output_byte_to_input_byte: origins.iter().map(|&o| Some(start + o)).collect(),
        }
    }

    /// Change in length this edit introduces.
    pub fn delta(&self) -> isize {
        self.replacement.len() as isize - (self.end - self.start) as isize
    }
}

/// Options for [`create_sourcemap`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourcemapOptions<'a> {
    /// Name recorded in `sources` for the input.
    pub source: &'a str,
    /// Value of the map's `file` field.
    pub file: Option<&'a str>,
    /// Embed the input in `sourcesContent`.
    pub include_content: bool,
    /// Emit a mapping for every output character instead of only where the mapping changes.
    pub hires: bool,
}

impl<'a> SourcemapOptions<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }
}

/// Validate edit invariants required by this module.
///
/// - `start <= end <= input.len()`, both on char boundaries
/// - edits are in ascending order and non-overlapping
/// - `output_byte_to_input_byte.len() == replacement.len()`
/// - any `Some(input_byte)` origin is `< input.len()`
pub fn validate_edits(input: &str, edits: &[Edit]) -> Result<(), MinifyError> {
    let input_len = input.len();
    let mut prev_end: usize = 0;
    for (idx, e) in edits.iter().enumerate() {
        if e.start > e.end {
            return Err(MinifyError::InvalidEdit(format!(
                "start > end at index {idx}: start={}, end={}",
                e.start, e.end
            )));
        }
        if e.end > input_len {
            return Err(MinifyError::InvalidEdit(format!(
                "edit out of bounds at index {idx}: end={} > input_len={input_len}",
                e.end
            )));
        }
        if !input.is_char_boundary(e.start) || !input.is_char_boundary(e.end) {
            return Err(MinifyError::InvalidEdit(format!(
                "edit at index {idx} splits a character: [{},{})",
                e.start, e.end
            )));
        }
        if idx > 0 && e.start < prev_end {
            return Err(MinifyError::OverlappingEdits {
                a_start: edits[idx - 1].start,
                a_end: edits[idx - 1].end,
                b_start: e.start,
                b_end: e.end,
            });
        }
        if e.output_byte_to_input_byte.len() != e.replacement.len() {
            return Err(MinifyError::InvalidEdit(format!(
                "output_byte_to_input_byte length mismatch at index {idx}: map_len={}, replacement_len={}",
                e.output_byte_to_input_byte.len(),
                e.replacement.len()
            )));
        }
        if let Some(in_byte) = e
            .output_byte_to_input_byte
            .iter()
            .flatten()
            .find(|&&b| b >= input_len)
        {
            return Err(MinifyError::InvalidEdit(format!(
                "mapped input byte out of bounds at index {idx}: in_byte={in_byte} >= input_len={input_len}"
            )));
        }

        prev_end = e.end;
    }
    Ok(())
}

/// Apply `edits` to `input` in a single left-to-right pass.
pub fn render(input: &str, edits: &[Edit]) -> Result<String, MinifyError> {
    validate_edits(input, edits)?;

    let delta: isize = edits.iter().map(Edit::delta).sum();
    let mut out = String::with_capacity((input.len() as isize + delta).max(0) as usize);
    let mut cursor = 0usize;
    for edit in edits {
        // Copy unchanged text before the edit, then the replacement.
        out.push_str(&input[cursor..edit.start]);
        out.push_str(&edit.replacement);
        cursor = edit.end;
    }
    out.push_str(&input[cursor..]);

    Ok(out)
}

/// Create a sourcemap for `output_code` (the result of [`render`]) mapping back to `input_code`.
///
/// Mapping model:
///
/// - Unchanged bytes map 1:1.
/// - Bytes inside an edit map to their recorded origin.
/// - Inserted bytes (`None` origins) are marked unmapped.
///
/// A mapping is emitted at the start of every output line and wherever the origin stops being
/// contiguous with the previous character; with `hires`, at every character.
pub fn create_sourcemap(
    input_code: &str,
    output_code: &str,
    edits: &[Edit],
    options: &SourcemapOptions<'_>,
) -> Result<SourceMap, MinifyError> {
    validate_edits(input_code, edits)?;

    let expected_len = input_code.len() as isize + edits.iter().map(Edit::delta).sum::<isize>();
    if expected_len != output_code.len() as isize {
        return Err(MinifyError::InvalidEdit(format!(
            "output length {} does not match edits (expected {expected_len})",
            output_code.len()
        )));
    }

    let out_to_in = build_output_to_input_map(input_code.len(), output_code.len(), edits);

    let in_index = LineIndex::new(input_code);
    let out_index = LineIndex::new(output_code);
    let mut in_cursor = Utf16Cursor::new(&in_index);
    let mut out_cursor = Utf16Cursor::new(&out_index);

    let mut builder = SourceMapBuilder::new(options.file);
    let source_id = builder.add_source(options.source);
    if options.include_content {
        builder.set_source_contents(source_id, Some(input_code));
    }

    let out = output_code.as_bytes();
    // Origin and UTF-8 length of the previous output character.
    let mut prev: Option<(Option<usize>, usize)> = None;

    for (out_byte, ch) in output_code.char_indices() {
        let origin = out_to_in[out_byte];
        let line_start = out_byte == 0 || out[out_byte - 1] == b'\n';
        let contiguous = match (prev, origin) {
            (Some((Some(p), len)), Some(o)) => o == p + len,
            (Some((None, _)), None) => true,
            _ => false,
        };
        prev = Some((origin, ch.len_utf8()));

        let wanted = line_start || !contiguous || (options.hires && ch != '\n');
        if !wanted {
            continue;
        }

        let (out_line, out_col) = out_cursor.seek(out_byte);
        match origin {
            Some(in_byte) => {
                let (in_line, in_col) = in_cursor.seek(in_byte);
                builder.add(
                    out_line,
                    out_col,
                    in_line,
                    in_col,
                    Some(options.source),
                    None,
                    false,
                );
            }
            None => {
                builder.add(out_line, out_col, u32::MAX, u32::MAX, None, None, false);
            }
        }
    }

    Ok(builder.into_sourcemap())
}

/// Serialize a sourcemap to JSON.
pub fn sourcemap_to_json(map: &SourceMap) -> Result<String, MinifyError> {
    let mut buf: Vec<u8> = Vec::new();
    map.to_writer(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Build a map from output byte offset to input byte offset.
///
/// The returned vector has length `output_len`. `Some(input_byte)` means the output byte came
/// from the input at that byte offset; `None` means the output byte is inserted/unmapped.
fn build_output_to_input_map(
    input_len: usize,
    output_len: usize,
    edits: &[Edit],
) -> Vec<Option<usize>> {
    let mut out_to_in: Vec<Option<usize>> = Vec::with_capacity(output_len);

    let mut in_cursor: usize = 0;
    for e in edits {
        // Unchanged region before the edit.
        out_to_in.extend((in_cursor..e.start).map(Some));
        // Edit replacement bytes.
        out_to_in.extend_from_slice(&e.output_byte_to_input_byte);
        in_cursor = e.end;
    }
    // Trailing unchanged region.
    out_to_in.extend((in_cursor..input_len).map(Some));

    out_to_in
}
