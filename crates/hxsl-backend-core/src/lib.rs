#![warn(missing_docs)]
//! Backend trait and dispatch for HXSL.
//!
//! Defines the [`Backend`] trait that all code emitters implement,
//! along with supporting types ([`BackendOptions`], [`BackendError`],
//! [`ShaderStage`]) and a [`BackendRegistry`] for CLI dispatch.

mod writer;

pub use writer::{format_float, CodeWriter};

use std::fmt::{self, Debug};

use hxsl_ast::Module;

/// The pipeline stage a shader is compiled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment (pixel) shader.
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

/// Options passed to a backend during compilation.
#[derive(Clone, Debug)]
pub struct BackendOptions {
    /// Target pipeline stage.
    pub stage: ShaderStage,
    /// Name of the entry-point function in the parsed module.
    pub entry_point: String,
    /// Emit pre-SM4 constructs (no `cbuffer` wrapping, no
    /// texture/sampler splitting). Only meaningful to the HLSL backend.
    pub legacy: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            stage: ShaderStage::Fragment,
            entry_point: "main".into(),
            legacy: false,
        }
    }
}

impl fmt::Display for BackendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BackendOptions {{ stage: {}, entry_point: {} }}",
            self.stage, self.entry_point
        )
    }
}

/// Errors that can occur during backend code generation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The module uses a construct the target language cannot express.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// A general backend error.
    #[error("{0}")]
    Other(String),
}

/// A backend that emits shader source text from a parsed module.
pub trait Backend: Debug {
    /// Human-readable name (e.g. "GLSL 1.40").
    fn name(&self) -> &str;

    /// Target identifiers this backend handles (for `--target` style
    /// dispatch).
    fn targets(&self) -> &[&str];

    /// Compiles a module to target source text.
    fn compile(&self, module: &Module, opts: &BackendOptions) -> Result<String, BackendError>;
}

/// Registry of available backends.
#[derive(Default)]
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend.
    pub fn register(&mut self, backend: Box<dyn Backend>) {
        self.backends.push(backend);
    }

    /// Finds a backend that handles the given target identifier.
    pub fn find(&self, target: &str) -> Option<&dyn Backend> {
        self.backends
            .iter()
            .find(|b| b.targets().contains(&target))
            .map(|b| &**b)
    }

    /// Lists all supported target identifiers.
    pub fn list_targets(&self) -> Vec<&str> {
        self.backends
            .iter()
            .flat_map(|b| b.targets().iter().copied())
            .collect()
    }
}
