//! Function declarations.

use crate::intern::Symbol;
use crate::stmt::Block;
use crate::types::{Span, Type};

/// A parameter passing modifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArgumentModifier {
    #[default]
    None,
    In,
    Inout,
    Uniform,
}

/// A formal parameter of a function.
#[derive(Clone, Debug)]
pub struct Argument {
    pub name: Symbol,
    pub modifier: ArgumentModifier,
    pub ty: Type,
    /// Optional semantic annotation (e.g. `POSITION`, `TEXCOORD0`).
    pub semantic: Option<Symbol>,
    pub span: Span,
}

/// A user-defined function.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: Symbol,
    pub return_type: Type,
    /// Optional semantic on the return value.
    pub semantic: Option<Symbol>,
    pub arguments: Vec<Argument>,
    pub body: Block,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BaseType;
    use crate::{Interner, Type};

    #[test]
    fn default_modifier_is_none() {
        assert_eq!(ArgumentModifier::default(), ArgumentModifier::None);
    }

    #[test]
    fn build_function() {
        let mut interner = Interner::new();
        let file = interner.intern("shader.fx");
        let span = Span { file, line: 3 };
        let f = Function {
            name: interner.intern("main"),
            return_type: Type::new(BaseType::Float4),
            semantic: Some(interner.intern("SV_POSITION")),
            arguments: vec![Argument {
                name: interner.intern("p"),
                modifier: ArgumentModifier::None,
                ty: Type::new(BaseType::Float4),
                semantic: Some(interner.intern("POSITION")),
                span,
            }],
            body: vec![],
            span,
        };
        assert_eq!(f.arguments.len(), 1);
        assert_eq!(interner.resolve(f.name), "main");
    }
}
