#![no_main]

use libfuzzer_sys::fuzz_target;
use minify_templates::{MinifyOptions, minify};

fuzz_target!(|data: &[u8]| {
    // Limit input size to keep the fuzzer fast and avoid OOM in pathological cases.
    let data = if data.len() > 256 * 1024 {
        &data[..256 * 1024]
    } else {
        data
    };

    let source = String::from_utf8_lossy(data);

    // Parse errors are expected outcomes and must never crash.
    for keep_comments in [false, true] {
        let options = MinifyOptions {
            keep_comments,
            ..MinifyOptions::default()
        };
        if let Ok(out) = minify(&source, &options) {
            assert!(out.code().len() <= source.len(), "minified output grew");
            if !source.contains('`') {
                assert_eq!(out.code(), source, "output changed without template literals");
            }
        }
    }
});
