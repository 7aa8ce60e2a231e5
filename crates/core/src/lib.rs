//! Template literal whitespace minifier for compiled JavaScript.
//!
//! This crate collapses insignificant whitespace inside template literals (typically HTML markup
//! embedded with tagged or untagged template strings) while leaving all other code byte-identical,
//! and produces a sourcemap from the minified output back to the input. When the input already
//! has a sourcemap (e.g. from a bundler), the two maps are composed so the result still points at
//! the true original sources.
//!
//! Entry points:
//!
//! - [`minify`] contains the core Rust APIs for minifying and (re)mapping sourcemaps.
//! - [`batch`] applies the transform to a set of in-memory build output files.
//!
//! Internals:
//!
//! - [`alloc`] contains the tree-sitter allocator override for WASM targets.
//! - [`parse`] wraps the tree-sitter JavaScript parser and reports comments.
//! - [`ignore`] tracks `minify-templates-ignore` marker comments.
//! - [`locate`] walks the syntax tree and turns template chunks into edits.
//! - [`normalize`] is the whitespace collapsing text function.
//! - [`edit`] holds the edit model, rendering and sourcemap creation.
//! - [`compose`] chains a freshly generated sourcemap through an upstream one.
//! - [`position`] provides line/column and UTF-16 column indexing.

pub mod alloc;
pub mod batch;
pub mod compose;
pub mod edit;
pub mod ignore;
pub mod locate;
pub mod minify;
pub mod normalize;
pub mod parse;
pub mod position;

pub use batch::{FileFailure, OutputFile, minify_output_files};
pub use edit::SourcemapOptions;
pub use minify::{CodeAndSourcemap, MinifyOptions, Minified, minify, minify_with_sourcemap};
pub use parse::SourceType;

use std::path::PathBuf;

/// Errors that can occur while minifying.
#[derive(thiserror::Error, Debug)]
pub enum MinifyError {
    #[error("tree-sitter failed to produce a syntax tree")]
    ParseAborted,

    #[error("syntax error at {line}:{column}")]
    Syntax { line: usize, column: usize },

    #[error("module declaration at {line}:{column} is not allowed in script source")]
    ModuleSyntaxInScript { line: usize, column: usize },

    #[error("invalid edit: {0}")]
    InvalidEdit(String),

    #[error("overlapping edits: [{a_start},{a_end}) overlaps [{b_start},{b_end})")]
    OverlappingEdits {
        a_start: usize,
        a_end: usize,
        b_start: usize,
        b_end: usize,
    },

    #[error("invalid sourcemap: {0}")]
    SourceMap(#[from] sourcemap::Error),

    #[error("{} is not valid utf-8", path.display())]
    InvalidUtf8 { path: PathBuf },
}
