#![no_main]

use libfuzzer_sys::fuzz_target;
use minify_templates::{MinifyOptions, SourceType, SourcemapOptions, minify_with_sourcemap};

fuzz_target!(|data: &[u8]| {
    let data = if data.len() > 256 * 1024 {
        &data[..256 * 1024]
    } else {
        data
    };

    let source = String::from_utf8_lossy(data);

    for &source_type in &[SourceType::Module, SourceType::Script] {
        for &(tagged_only, keep_comments) in &[(false, false), (true, true)] {
            let options = MinifyOptions {
                tagged_only,
                keep_comments,
                source_type,
            };
            let map_options = SourcemapOptions {
                source: "input.js",
                file: Some("output.js"),
                include_content: true,
                hires: tagged_only,
            };

            if let Ok(out) = minify_with_sourcemap(&source, None, &options, &map_options) {
                // If minification succeeds, the sourcemap must be parseable JSON.
                // Any panic here is a bug we want the fuzzer to catch.
                let _ = serde_json::from_str::<serde_json::Value>(&out.sourcemap)
                    .expect("sourcemap must be valid JSON when minify returns Ok");
            }
        }
    }
});
