//! GLSL 1.40 backend for HXSL.
//!
//! Walks a parsed module and emits a complete GLSL shader: helper
//! functions papering over HLSL/GLSL mismatches, the translated user
//! code, and a synthesized `void main()` wrapper that plumbs semantics
//! into attributes and built-ins.

mod emit;

use hxsl_ast::Module;
use hxsl_backend_core::{Backend, BackendError, BackendOptions};

/// The GLSL backend.
#[derive(Debug)]
pub struct GlslBackend;

impl Backend for GlslBackend {
    fn name(&self) -> &str {
        "GLSL 1.40"
    }

    fn targets(&self) -> &[&str] {
        &["glsl"]
    }

    fn compile(&self, module: &Module, opts: &BackendOptions) -> Result<String, BackendError> {
        emit::GlslEmitter::new(module, opts).run()
    }
}
