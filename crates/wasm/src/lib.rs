//! wasm-bindgen exports.
//!
//! This module exposes the template literal minifier to JavaScript build tools via
//! `wasm-bindgen`. The underlying logic lives in the `minify-templates` crate.

use wasm_bindgen::prelude::*;

use minify_templates::{
    MinifyOptions, SourceType, SourcemapOptions, minify as minify_inner,
    minify_with_sourcemap as minify_with_sourcemap_inner,
};

/// Configuration options for template literal minification.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize, tsify::Tsify)]
#[serde(rename_all = "camelCase", default)]
#[tsify(from_wasm_abi)]
pub struct MinifyConfig {
    /// Only minify tagged template literals
    #[tsify(optional)]
    pub tagged_only: bool,
    /// Keep HTML comments inside template literals
    #[tsify(optional)]
    pub keep_comments: bool,
    /// Parse as an ES module (default) or, when `false`, as a classic script
    #[tsify(optional)]
    pub module: Option<bool>,
}

impl From<MinifyConfig> for MinifyOptions {
    fn from(val: MinifyConfig) -> Self {
        MinifyOptions {
            tagged_only: val.tagged_only,
            keep_comments: val.keep_comments,
            source_type: match val.module {
                Some(false) => SourceType::Script,
                _ => SourceType::Module,
            },
        }
    }
}

/// Output from the wasm API when a sourcemap is requested.
#[derive(Debug, Clone, serde::Serialize, tsify::Tsify)]
#[tsify(into_wasm_abi)]
pub struct MinifyOutput {
    /// The minified JavaScript.
    pub code: String,
    /// The generated (or composed) sourcemap JSON.
    pub sourcemap: String,
}

/// Minify template literals and produce a sourcemap.
///
/// `source_name` is recorded as the sourcemap's source filename. When `input_sourcemap` holds the
/// sourcemap of `code`, the result is composed with it and points at its original sources.
#[wasm_bindgen(js_name = minifyWithSourcemap)]
pub fn minify_with_sourcemap(
    code: String,
    source_name: String,
    input_sourcemap: Option<String>,
    config: MinifyConfig,
) -> Result<MinifyOutput, JsValue> {
    console_error_panic_hook::set_once();

    let res = minify_with_sourcemap_inner(
        &code,
        input_sourcemap.as_deref(),
        &config.into(),
        &SourcemapOptions {
            source: &source_name,
            file: None,
            include_content: true,
            hires: true,
        },
    )
    .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(MinifyOutput {
        code: res.code,
        sourcemap: res.sourcemap,
    })
}

/// Minify template literals without producing a sourcemap.
#[wasm_bindgen]
pub fn minify(code: String, config: MinifyConfig) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let res = minify_inner(&code, &config.into()).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(res.into_code())
}
