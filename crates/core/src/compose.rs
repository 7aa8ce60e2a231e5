//! Source map composition.
//!
//! [`compose`] chains the map generated for the minified output through an upstream map (for
//! example the one a bundler wrote for its output) so the result points straight at the upstream
//! originals. Nothing is ever loaded from disk: both maps are in memory, and positions the
//! upstream map cannot resolve become unmapped tokens.

use sourcemap::{SourceMap, SourceMapBuilder};

/// A single point mapping entry (destination -> original source).
///
/// `dst_*` refers to the minified output. `src_*` refers to the upstream originals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mapping<'a> {
    dst_line: u32,
    dst_col: u32,
    /// `u32::MAX` means unmapped.
    src_line: u32,
    /// `u32::MAX` means unmapped.
    src_col: u32,
    source: Option<&'a str>,
    name: Option<&'a str>,
}

impl<'a> Mapping<'a> {
    fn unmapped(dst_line: u32, dst_col: u32) -> Self {
        Self {
            dst_line,
            dst_col,
            src_line: u32::MAX,
            src_col: u32::MAX,
            source: None,
            name: None,
        }
    }

    fn is_mapped(&self) -> bool {
        self.source.is_some()
    }

    /// Whether `self` adds nothing after `prev`: same line, same target (or both unmapped).
    fn repeats(&self, prev: &Mapping<'_>) -> bool {
        self.dst_line == prev.dst_line
            && self.src_line == prev.src_line
            && self.src_col == prev.src_col
            && self.source == prev.source
            && self.name == prev.name
    }
}

/// Compose `generated` (output -> input) with `upstream` (input -> originals).
///
/// With no upstream map the generated map is returned as is.
pub fn compose(generated: &SourceMap, upstream: Option<&SourceMap>) -> SourceMap {
    let Some(upstream) = upstream else {
        return generated.clone();
    };

    let mut builder = SourceMapBuilder::new(generated.get_file());
    // Register upstream sources first so their order and contents carry over.
    for (idx, source) in upstream.sources().enumerate() {
        let id = builder.add_source(source);
        builder.set_source_contents(id, upstream.get_source_contents(idx as u32));
    }

    let mut prev: Option<Mapping<'_>> = None;
    let mut gaps = 0usize;

    for token in generated.tokens() {
        let (dst_line, dst_col) = (token.get_dst_line(), token.get_dst_col());

        let mapping = match token.get_source() {
            None => Mapping::unmapped(dst_line, dst_col),
            Some(_) => {
                let (src_line, src_col) = (token.get_src_line(), token.get_src_col());
                match upstream.lookup_token(src_line, src_col) {
                    Some(up) if up.get_dst_line() == src_line && up.get_source().is_some() => {
                        Mapping {
                            dst_line,
                            dst_col,
                            src_line: up.get_src_line(),
                            src_col: up.get_src_col(),
                            source: up.get_source(),
                            name: up.get_name().or(token.get_name()),
                        }
                    }
                    _ => {
                        gaps += 1;
                        Mapping::unmapped(dst_line, dst_col)
                    }
                }
            }
        };

        let redundant = if mapping.is_mapped() {
            prev.is_some_and(|p| mapping.repeats(&p))
        } else {
            // Unmapped segments only matter when they end a mapped one on the same line.
            prev.is_none_or(|p| p.dst_line != dst_line || !p.is_mapped())
        };
        if redundant {
            continue;
        }

        builder.add(
            mapping.dst_line,
            mapping.dst_col,
            mapping.src_line,
            mapping.src_col,
            mapping.source,
            mapping.name,
            false,
        );
        prev = Some(mapping);
    }

    if gaps > 0 {
        tracing::debug!(gaps, "positions unresolved by upstream sourcemap");
    }

    builder.into_sourcemap()
}
