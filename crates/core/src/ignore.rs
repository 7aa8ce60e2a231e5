//! `minify-templates-ignore` marker comments.
//!
//! A block comment whose body is exactly the marker (after trimming, and after an optional
//! leading `!` so bundler-preserved legal comments work) opts template literals out of
//! minification:
//!
//! ```js
//! /* minify-templates-ignore */
//! let css = `
//!   body { color: coral; }
//! `;
//! ```
//!
//! A marker guards every template literal that starts on the line after the line the comment ends
//! on, plus any literal that starts later on the comment's own final line. Matching is by line
//! number rather than by syntactic adjacency, so unrelated code sharing the guarded line is
//! covered too. Literals nested inside a guarded literal are excluded by the walker, not here.

use crate::{
    parse::{Comment, CommentKind},
    position::Position,
};

/// The directive text recognised inside a block comment.
pub const IGNORE_MARKER: &str = "minify-templates-ignore";

/// Marker comments collected from one input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRegions {
    /// End position of each marker comment, in document order.
    markers: Vec<Position>,
}

impl IgnoreRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one parsed comment; non-marker comments are ignored.
    pub fn observe(&mut self, comment: &Comment<'_>) {
        if is_marker(comment) {
            self.markers.push(comment.end);
        }
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Whether a template literal starting at `start` is guarded by a marker.
    pub fn covers(&self, start: Position) -> bool {
        self.markers.iter().any(|end| {
            start.line == end.line + 1 || (start.line == end.line && start.offset >= end.offset)
        })
    }
}

fn is_marker(comment: &Comment<'_>) -> bool {
    if comment.kind != CommentKind::Block {
        return false;
    }
    let body = comment.body().trim();
    body.strip_prefix('!').unwrap_or(body).trim() == IGNORE_MARKER
}
