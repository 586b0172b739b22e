//! Shared helpers for the end-to-end suites.

use hxsl_backend_core::{Backend, BackendError, BackendOptions, ShaderStage};
use hxsl_backend_glsl::GlslBackend;
use hxsl_backend_hlsl::HlslBackend;

/// Parses `source` and runs the GLSL backend.
#[allow(dead_code)]
pub fn translate_glsl(source: &str, stage: ShaderStage, entry: &str) -> Result<String, String> {
    let module = hxsl_parser::parse(source, "e2e.fx").map_err(|e| e.to_string())?;
    let opts = BackendOptions {
        stage,
        entry_point: entry.into(),
        legacy: false,
    };
    GlslBackend
        .compile(&module, &opts)
        .map_err(|e| e.to_string())
}

/// Parses `source` and runs the HLSL backend.
#[allow(dead_code)]
pub fn translate_hlsl(source: &str, legacy: bool) -> Result<String, BackendError> {
    let module = hxsl_parser::parse(source, "e2e.fx").expect("e2e source should parse");
    let opts = BackendOptions {
        legacy,
        ..BackendOptions::default()
    };
    HlslBackend.compile(&module, &opts)
}
