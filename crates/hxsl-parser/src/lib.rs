//! Recursive-descent HLSL parser with fused semantic analysis.
//!
//! Consumes legacy (D3D9-era) HLSL source text and produces a typed
//! [`hxsl_ast::Module`]. Name resolution, implicit-cast checking,
//! operator typing, and overload resolution all happen during the
//! parse; a successful result carries a resolved type on every
//! expression node.

mod lexer;
mod overload;
mod parser;
mod stream;

pub use lexer::{lex, token_name, Token};
pub use overload::{compare_candidates, type_cast_rank, Comparison, Signature};

use hxsl_ast::{Interner, Module};

/// A parse failure. The parser stops at the first error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{file}:{line}: {message}")]
pub struct ParseError {
    pub file: String,
    pub line: u32,
    pub message: String,
}

/// Parses HLSL source into a typed module.
pub fn parse(source: &str, file_name: &str) -> Result<Module, ParseError> {
    let mut interner = Interner::new();
    let file = interner.intern(file_name);
    let tokens = lexer::lex(source, file_name, &mut interner)?;
    let stream = stream::TokenStream::new(file_name, file, tokens);
    parser::Parser::new(stream, interner).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hxsl_ast::{BaseType, ExprKind, StmtKind, TopLevel};

    #[test]
    fn parse_error_formatting() {
        let err = ParseError {
            file: "shader.fx".into(),
            line: 12,
            message: "Syntax error: expected ';' near '}'".into(),
        };
        assert_eq!(
            err.to_string(),
            "shader.fx:12: Syntax error: expected ';' near '}'"
        );
    }

    #[test]
    fn every_expression_is_typed() {
        let source = r#"
            float4 tint;
            float4 shade(float4 color, float amount) {
                float4 mixed = color * amount + tint;
                return mixed.wzyx;
            }
        "#;
        let module = parse(source, "typed.fx").expect("should parse");
        for (_, expression) in module.expressions.iter() {
            // Only a call's bare callee identifier may stay untyped;
            // it is not reachable from the tree.
            if let ExprKind::Ident { name, global } = &expression.kind {
                if *global && module.find_function(module.name(*name)).is_some() {
                    continue;
                }
            }
            assert_ne!(expression.ty.base, BaseType::Unknown, "{expression:?}");
        }
    }

    #[test]
    fn top_level_order_is_source_order() {
        let source = r#"
            struct V { float4 p : POSITION; };
            cbuffer Frame { float time; };
            float gain;
            float4 main(V v) : SV_POSITION { return v.p; }
        "#;
        let module = parse(source, "order.fx").unwrap();
        assert!(matches!(module.order[0], TopLevel::Struct(_)));
        assert!(matches!(module.order[1], TopLevel::Buffer(_)));
        assert!(matches!(module.order[2], TopLevel::Global(_)));
        assert!(matches!(module.order[3], TopLevel::Function(_)));
    }

    #[test]
    fn buffer_fields_are_global_variables() {
        let source = r#"
            cbuffer Frame { float4x4 viewProjection; };
            float4 main(float4 p : POSITION) : SV_POSITION {
                return mul(p, viewProjection);
            }
        "#;
        parse(source, "cbuffer.fx").expect("buffer fields resolve as globals");
    }

    #[test]
    fn for_with_empty_headers() {
        let source = r#"
            float main(float x : TEXCOORD0) : SV_TARGET {
                for (;;) {
                    x = x + 1.0;
                    if (x > 4.0) break;
                }
                return x;
            }
        "#;
        let module = parse(source, "for.fx").unwrap();
        let function = &module.functions[module.find_function("main").unwrap()];
        let for_stmt = function
            .body
            .iter()
            .find_map(|s| match &s.kind {
                StmtKind::For {
                    init,
                    condition,
                    increment,
                    ..
                } => Some((init.is_none(), condition.is_none(), increment.is_none())),
                _ => None,
            })
            .expect("has a for loop");
        assert_eq!(for_stmt, (true, true, true));
    }

    #[test]
    fn multiple_declarators_are_rejected() {
        let err = parse("float main() { float a, b; return a; }", "multi.fx").unwrap_err();
        assert!(err.message.contains("expected ';' near ','"), "{err}");
    }
}
