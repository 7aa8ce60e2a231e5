//! Minification entry points.
//!
//! [`minify`] parses the input, collects template chunk edits and renders the output. The
//! returned [`Minified`] keeps the edits around so a sourcemap can be generated on demand, either
//! standalone or composed with an upstream map. [`minify_with_sourcemap`] does both in one call
//! and returns JSON.

use sourcemap::SourceMap;
use tracing::debug;

use crate::{
    MinifyError,
    compose::compose,
    edit::{Edit, SourcemapOptions, create_sourcemap, render, sourcemap_to_json},
    ignore::IgnoreRegions,
    locate::locate_edits,
    parse::{SourceType, parse},
};

/// Options for [`minify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinifyOptions {
    /// Only minify template literals that are the template of a tagged template expression.
    pub tagged_only: bool,
    /// Keep `<!-- ... -->` comments inside template literals.
    pub keep_comments: bool,
    /// Grammar the input is parsed with.
    pub source_type: SourceType,
}

/// Output code and its corresponding sourcemap JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAndSourcemap {
    /// The minified JavaScript.
    pub code: String,
    /// The generated (or composed) sourcemap JSON.
    pub sourcemap: String,
}

/// Result of [`minify`]: the output code plus what is needed to map it back to the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Minified<'s> {
    source: &'s str,
    code: String,
    edits: Vec<Edit>,
}

impl<'s> Minified<'s> {
    pub fn source(&self) -> &'s str {
        self.source
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn into_code(self) -> String {
        self.code
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// True when no template chunk changed, so the output equals the input.
    pub fn is_unchanged(&self) -> bool {
        self.edits.is_empty()
    }

    /// Generate a sourcemap from the output back to the input.
    pub fn generate_map(&self, options: &SourcemapOptions<'_>) -> Result<SourceMap, MinifyError> {
        create_sourcemap(self.source, &self.code, &self.edits, options)
    }

    /// Generate a sourcemap and, when `upstream` describes where the input came from, compose
    /// the two so the result points at the upstream originals.
    ///
    /// Composition always uses a high-resolution map, so every output character is traced.
    pub fn sourcemap(
        &self,
        upstream: Option<&SourceMap>,
        options: &SourcemapOptions<'_>,
    ) -> Result<SourceMap, MinifyError> {
        match upstream {
            Some(upstream) => {
                let generated = self.generate_map(&SourcemapOptions {
                    hires: true,
                    ..*options
                })?;
                Ok(compose(&generated, Some(upstream)))
            }
            None => self.generate_map(options),
        }
    }
}

/// Minify whitespace inside the template literals of `source`.
///
/// Everything outside template literal static text is copied through byte for byte. Fails when
/// `source` does not parse under `options.source_type`.
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len(), source_type = %options.source_type))]
pub fn minify<'s>(source: &'s str, options: &MinifyOptions) -> Result<Minified<'s>, MinifyError> {
    let mut ignore = IgnoreRegions::new();
    let tree = parse(source, options.source_type, |comment| ignore.observe(&comment))?;

    let located = locate_edits(source, tree.root_node(), &ignore, options);
    let code = render(source, &located.edits)?;

    debug!(
        literals = located.literals,
        ignored = located.ignored,
        markers = ignore.marker_count(),
        edits = located.edits.len(),
        saved = source.len().saturating_sub(code.len()),
        "minified template literals"
    );

    Ok(Minified {
        source,
        code,
        edits: located.edits,
    })
}

/// Minify `source` and return the code together with sourcemap JSON.
///
/// When `upstream_map_json` is given the returned map is composed with it; its `sources` then name
/// the upstream originals instead of `map_options.source`.
pub fn minify_with_sourcemap(
    source: &str,
    upstream_map_json: Option<&str>,
    options: &MinifyOptions,
    map_options: &SourcemapOptions<'_>,
) -> Result<CodeAndSourcemap, MinifyError> {
    let upstream = upstream_map_json
        .map(|json| SourceMap::from_slice(json.as_bytes()))
        .transpose()?;

    let minified = minify(source, options)?;
    let map = minified.sourcemap(upstream.as_ref(), map_options)?;
    let sourcemap = sourcemap_to_json(&map)?;

    Ok(CodeAndSourcemap {
        code: minified.into_code(),
        sourcemap,
    })
}
