//! Modernized-HLSL backend for HXSL.
//!
//! Re-emits a parsed program as D3D11-style (shader model 5) HLSL:
//! `cbuffer` blocks pass through, `sampler2D`/`samplerCUBE` globals are
//! split into `Texture2D`/`TextureCube` plus `SamplerState` pairs, and
//! the legacy sampling intrinsics are rewritten onto synthesized
//! helpers implemented with `Sample`/`SampleLevel`/`SampleBias`. In
//! legacy mode all of these transforms are disabled and the program is
//! emitted with its original D3D9-era surface.

mod emit;

use hxsl_ast::Module;
use hxsl_backend_core::{Backend, BackendError, BackendOptions};

/// The modernized-HLSL backend.
#[derive(Debug)]
pub struct HlslBackend;

impl Backend for HlslBackend {
    fn name(&self) -> &str {
        "HLSL SM5"
    }

    fn targets(&self) -> &[&str] {
        &["hlsl", "hlsl-legacy"]
    }

    fn compile(&self, module: &Module, opts: &BackendOptions) -> Result<String, BackendError> {
        emit::HlslEmitter::new(module, opts).run()
    }
}
