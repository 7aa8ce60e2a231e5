//! Minification of in-memory build output.
//!
//! A bundler hands over its output files as `(path, bytes)` pairs. Every `.js` file is minified
//! in place and, when the set also holds `<path>.map`, that map is replaced by one composed
//! through it, so it keeps pointing at the original sources. Files are independent and are
//! processed in parallel; one file failing leaves it and its map untouched and does not affect
//! the others.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use sourcemap::SourceMap;
use tracing::{debug, warn};

use crate::{
    MinifyError,
    edit::{SourcemapOptions, sourcemap_to_json},
    minify::{MinifyOptions, minify},
};

/// One file of build output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl OutputFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    fn is_js(&self) -> bool {
        self.path.extension().is_some_and(|ext| ext == "js")
    }
}

/// A file that could not be minified.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: MinifyError,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

impl std::error::Error for FileFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// New contents for a `.js` file and its map.
struct Rewritten {
    js: usize,
    code: String,
    map: Option<(usize, String)>,
}

/// Minify every `.js` file in `files`, updating sibling `.map` files.
///
/// Returns the files that failed, in input order. Those files are left as they were.
pub fn minify_output_files(files: &mut [OutputFile], options: &MinifyOptions) -> Vec<FileFailure> {
    let all: &[OutputFile] = files;
    let maps: HashMap<&Path, usize> = all
        .iter()
        .enumerate()
        .filter(|(_, f)| f.path.extension().is_some_and(|ext| ext == "map"))
        .map(|(i, f)| (f.path.as_path(), i))
        .collect();

    let results: Vec<Result<Option<Rewritten>, FileFailure>> = all
        .par_iter()
        .enumerate()
        .filter(|(_, f)| f.is_js())
        .map(|(i, js)| {
            let map_path = map_path_for(&js.path);
            let map = maps.get(map_path.as_path()).map(|&m| (m, &all[m]));
            rewrite_file(i, js, map, options).map_err(|error| FileFailure {
                path: js.path.clone(),
                error,
            })
        })
        .collect();

    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(Some(rewritten)) => {
                files[rewritten.js].contents = rewritten.code.into_bytes();
                if let Some((m, json)) = rewritten.map {
                    files[m].contents = json.into_bytes();
                }
            }
            Ok(None) => {}
            Err(failure) => {
                warn!(path = %failure.path.display(), error = %failure.error, "failed to minify");
                failures.push(failure);
            }
        }
    }
    failures
}

fn map_path_for(js: &Path) -> PathBuf {
    let mut path = js.as_os_str().to_owned();
    path.push(".map");
    PathBuf::from(path)
}

/// Minify one file. `None` when nothing changed.
fn rewrite_file(
    index: usize,
    js: &OutputFile,
    map: Option<(usize, &OutputFile)>,
    options: &MinifyOptions,
) -> Result<Option<Rewritten>, MinifyError> {
    let source = std::str::from_utf8(&js.contents).map_err(|_| MinifyError::InvalidUtf8 {
        path: js.path.clone(),
    })?;

    let minified = minify(source, options)?;
    if minified.is_unchanged() {
        debug!(path = %js.path.display(), "no template literal changed");
        return Ok(None);
    }

    let map = match map {
        Some((m, map_file)) => {
            let upstream = SourceMap::from_slice(&map_file.contents)?;
            let source_name = js.path.to_string_lossy();
            let file_name = js.path.file_name().map(|n| n.to_string_lossy());
            let map_options = SourcemapOptions {
                source: &source_name,
                file: file_name.as_deref(),
                include_content: false,
                hires: true,
            };
            let composed = minified.sourcemap(Some(&upstream), &map_options)?;
            Some((m, sourcemap_to_json(&composed)?))
        }
        None => None,
    };

    debug!(
        path = %js.path.display(),
        saved = source.len().saturating_sub(minified.code().len()),
        remapped = map.is_some(),
        "minified output file"
    );

    Ok(Some(Rewritten {
        js: index,
        code: minified.into_code(),
        map,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream_map(source: &str, lines: u32) -> Vec<u8> {
        let mut builder = sourcemap::SourceMapBuilder::new(Some("app.js"));
        builder.add_source(source);
        for line in 0..lines {
            builder.add(line, 0, line, 0, Some(source), None, false);
        }
        let mut buf = Vec::new();
        builder.into_sourcemap().to_writer(&mut buf).unwrap();
        buf
    }

    /// `.js` files are minified and other files are left alone.
    #[test]
    fn minifies_js_files_only() {
        let mut files = vec![
            OutputFile::new("dist/app.js", "let a = `x   y`;"),
            OutputFile::new("dist/app.css", "a {   color: red; }"),
            OutputFile::new("dist/app.mjs", "let a = `x   y`;"),
        ];
        let failures = minify_output_files(&mut files, &MinifyOptions::default());
        assert!(failures.is_empty());
        assert_eq!(files[0].contents, b"let a = `x y`;");
        assert_eq!(files[1].contents, b"a {   color: red; }");
        assert_eq!(files[2].contents, b"let a = `x   y`;");
    }

    /// A sibling map is replaced by one composed through it.
    #[test]
    fn rewrites_sibling_map() {
        let mut files = vec![
            OutputFile::new("dist/app.js", "let a = `\n  <p>  x  </p>\n`;\nlet b = 1;"),
            OutputFile::new("dist/app.js.map", upstream_map("src/app.ts", 4)),
        ];
        let failures = minify_output_files(&mut files, &MinifyOptions::default());
        assert!(failures.is_empty());
        assert_eq!(files[0].contents, b"let a = `<p> x </p>`;\nlet b = 1;");

        let map = SourceMap::from_slice(&files[1].contents).unwrap();
        assert_eq!(map.get_source(0), Some("src/app.ts"));
        assert_eq!(map.get_file(), Some("app.js"));
        // `let b` moved from input line 3 to output line 1.
        let t = map.lookup_token(1, 0).unwrap();
        assert_eq!(t.get_src_line(), 3);
    }

    /// A broken file is reported and left untouched while other files still get minified.
    #[test]
    fn isolates_failures() {
        let map = upstream_map("src/broken.ts", 1);
        let mut files = vec![
            OutputFile::new("broken.js", "let a = `x   y"),
            OutputFile::new("broken.js.map", map.clone()),
            OutputFile::new("ok.js", "let a = `x   y`;"),
            OutputFile::new("binary.js", vec![0xff, 0xfe]),
        ];
        let failures = minify_output_files(&mut files, &MinifyOptions::default());

        let failed: Vec<&Path> = failures.iter().map(|f| f.path.as_path()).collect();
        assert_eq!(failed, vec![Path::new("broken.js"), Path::new("binary.js")]);
        assert!(matches!(failures[0].error, MinifyError::Syntax { .. }));
        assert!(matches!(failures[1].error, MinifyError::InvalidUtf8 { .. }));

        assert_eq!(files[0].contents, b"let a = `x   y");
        assert_eq!(files[1].contents, map);
        assert_eq!(files[2].contents, b"let a = `x y`;");
    }

    /// Files without changes keep their map byte for byte.
    #[test]
    fn unchanged_files_keep_their_map() {
        let map = upstream_map("src/a.ts", 1);
        let mut files = vec![
            OutputFile::new("a.js", "let a = `x y`;"),
            OutputFile::new("a.js.map", map.clone()),
        ];
        assert!(minify_output_files(&mut files, &MinifyOptions::default()).is_empty());
        assert_eq!(files[1].contents, map);
    }

    /// Failure messages name the file.
    #[test]
    fn failure_display_includes_path() {
        let failure = FileFailure {
            path: PathBuf::from("dist/x.js"),
            error: MinifyError::Syntax { line: 1, column: 2 },
        };
        assert_eq!(failure.to_string(), "dist/x.js: syntax error at 1:2");
    }
}
