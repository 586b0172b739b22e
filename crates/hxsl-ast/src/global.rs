//! Top-level declarations: structs and constant buffers.

use crate::intern::Symbol;
use crate::types::{Span, Type};

/// A field of a struct declaration.
#[derive(Clone, Debug)]
pub struct StructField {
    pub name: Symbol,
    pub ty: Type,
    pub semantic: Option<Symbol>,
    pub span: Span,
}

/// A `struct` declaration.
#[derive(Clone, Debug)]
pub struct StructDecl {
    pub name: Symbol,
    pub fields: Vec<StructField>,
    pub span: Span,
}

impl StructDecl {
    /// Looks up a field by interned name.
    pub fn field(&self, name: Symbol) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A field of a `cbuffer`/`tbuffer`. Any `packoffset` annotation was
/// discarded during parsing.
#[derive(Clone, Debug)]
pub struct BufferField {
    pub name: Symbol,
    pub ty: Type,
    pub span: Span,
}

/// A `cbuffer` or `tbuffer` declaration. The fields also live in the
/// global variable scope.
#[derive(Clone, Debug)]
pub struct Buffer {
    pub name: Option<Symbol>,
    /// `: register(…)` name.
    pub register: Option<Symbol>,
    pub fields: Vec<BufferField>,
    pub span: Span,
}
