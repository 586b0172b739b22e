//! Integration tests for the HLSL parser and its semantic analysis.

use hxsl_ast::{BaseType, Callee, ExprKind, StmtKind};
use hxsl_parser::parse;

#[test]
fn parse_identity_vertex_shader() {
    let source = "float4 main(float4 p : POSITION) : SV_POSITION { return p; }";
    let module = parse(source, "identity.fx").expect("should parse");

    let main = module.find_function("main").expect("has main");
    let function = &module.functions[main];
    assert_eq!(function.return_type.base, BaseType::Float4);
    assert_eq!(module.name(function.semantic.unwrap()), "SV_POSITION");
    assert_eq!(function.arguments.len(), 1);
    assert_eq!(
        module.name(function.arguments[0].semantic.unwrap()),
        "POSITION"
    );
}

#[test]
fn overload_direct_match_beats_promotion() {
    // f(float) and f(float2); f(1) must pick f(float).
    let source = r#"
        float f(float x) { return x; }
        float2 f(float2 x) { return x; }
        float main() {
            float a = f(1);
            float2 b = f(float2(1, 2));
            return a + b.x;
        }
    "#;
    let module = parse(source, "overload.fx").expect("should parse");

    let mut calls = Vec::new();
    for (_, expression) in module.expressions.iter() {
        if let ExprKind::Call { callee, .. } = &expression.kind {
            if let Callee::User(handle) = callee {
                let f = &module.functions[*handle];
                if module.name(f.name) == "f" {
                    calls.push(f.arguments[0].ty.base);
                }
            }
        }
    }
    assert_eq!(calls, vec![BaseType::Float, BaseType::Float2]);
}

#[test]
fn ambiguous_overload_is_reported() {
    let source = r#"
        float g(float a, int b) { return a; }
        float g(int a, float b) { return b; }
        float main() { return g(1, 1); }
    "#;
    let err = parse(source, "ambiguous.fx").unwrap_err();
    assert!(
        err.message.contains("2 overloads have similar conversions"),
        "{err}"
    );
}

#[test]
fn no_viable_overload_is_reported() {
    let source = r#"
        float f(float x) { return x; }
        float main() {
            float2 v = float2(1, 2);
            return f(v, v);
        }
    "#;
    let err = parse(source, "inviable.fx").unwrap_err();
    assert!(
        err.message
            .contains("no overloaded function matched all of the arguments"),
        "{err}"
    );
}

#[test]
fn undeclared_identifier_is_reported() {
    let err = parse("float main() { return missing; }", "undeclared.fx").unwrap_err();
    assert!(err.message.contains("Undeclared identifier 'missing'"), "{err}");
}

#[test]
fn swizzle_typing() {
    let source = r#"
        float main() {
            float4 v = float4(1, 2, 3, 4);
            float3 x = v.wwx;
            float s = v.y;
            float4 rgba = v.rgba;
            return x.z + s + rgba.w;
        }
    "#;
    parse(source, "swizzle.fx").expect("swizzles type-check");
}

#[test]
fn swizzle_on_swizzle_matrix_accessor_fails() {
    // v.xy is a float2; _m00 is a matrix accessor and must fail on it.
    let source = r#"
        float main() {
            float4 v = float4(1, 2, 3, 4);
            return v.xy._m00;
        }
    "#;
    let err = parse(source, "badswizzle.fx").unwrap_err();
    assert!(err.message.contains("Invalid swizzle '_m00'"), "{err}");
}

#[test]
fn swizzle_length_five_is_rejected() {
    let source = r#"
        float main() {
            float4 v = float4(1, 2, 3, 4);
            return v.xxxxx.x;
        }
    "#;
    let err = parse(source, "longswizzle.fx").unwrap_err();
    assert!(err.message.contains("Invalid swizzle 'xxxxx'"), "{err}");
}

#[test]
fn matrix_accessor_bounds() {
    // _m22 is in range for a 3x3, _m33 is not.
    let ok = r#"
        float main() {
            float3x3 m = float3x3(1, 0, 0, 0, 1, 0, 0, 0, 1);
            return m._m22;
        }
    "#;
    parse(ok, "m22.fx").expect("_m22 on a 3x3 is valid");

    let bad = r#"
        float main() {
            float3x3 m = float3x3(1, 0, 0, 0, 1, 0, 0, 0, 1);
            return m._m33;
        }
    "#;
    let err = parse(bad, "m33.fx").unwrap_err();
    assert!(err.message.contains("Couldn't access '_m33'"), "{err}");
}

#[test]
fn one_based_matrix_accessor() {
    let source = r#"
        float main() {
            float4x4 m = float4x4(1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1);
            return m._11 + m._44;
        }
    "#;
    parse(source, "onebased.fx").expect("one-based accessors are valid");
}

#[test]
fn struct_member_access() {
    let source = r#"
        struct Light { float3 direction; float intensity; };
        float main() {
            Light light;
            light.intensity = 2.0;
            return light.intensity;
        }
    "#;
    parse(source, "member.fx").expect("struct members resolve");
}

#[test]
fn unknown_struct_member_fails() {
    let source = r#"
        struct Light { float intensity; };
        float main() {
            Light light;
            return light.color;
        }
    "#;
    let err = parse(source, "badmember.fx").unwrap_err();
    assert!(err.message.contains("Couldn't access 'color'"), "{err}");
}

#[test]
fn struct_redefinition_fails() {
    let source = "struct A { float x; }; struct A { float y; };";
    let err = parse(source, "redef.fx").unwrap_err();
    assert!(err.message.contains("struct A already defined"), "{err}");
}

#[test]
fn undeclared_type_fails() {
    let err = parse("Missing main() { return x; }", "badtype.fx").unwrap_err();
    // `Missing` is not a type, so the top level expects a `;`.
    assert!(err.message.contains("Syntax error"), "{err}");
}

#[test]
fn implicit_cast_rejection() {
    let source = r#"
        struct S { float x; };
        float main() {
            S s;
            float f;
            f = s;
            return f;
        }
    "#;
    let err = parse(source, "badcast.fx").unwrap_err();
    assert!(
        err.message.contains("Cannot implicitly convert from 'S' to 'float'"),
        "{err}"
    );
}

#[test]
fn binary_operator_rejection() {
    let source = r#"
        float main() {
            float3 v = float3(1, 2, 3);
            float3x3 m = float3x3(1, 0, 0, 0, 1, 0, 0, 0, 1);
            float3 r = v * m;
            return r.x;
        }
    "#;
    let err = parse(source, "badbinary.fx").unwrap_err();
    assert!(
        err.message.contains("no global operator found which takes types 'float3' and 'float3x3'"),
        "{err}"
    );
}

#[test]
fn mul_covers_vector_matrix() {
    let source = r#"
        float3 main() {
            float3 v = float3(1, 2, 3);
            float3x3 m = float3x3(1, 0, 0, 0, 1, 0, 0, 0, 1);
            return mul(v, m);
        }
    "#;
    parse(source, "mul.fx").expect("mul(float3, float3x3) resolves");
}

#[test]
fn assignment_is_right_associative() {
    let source = r#"
        float main() {
            float a = 0.0;
            float b = 0.0;
            float c = 3.0;
            a = b = c;
            return a;
        }
    "#;
    let module = parse(source, "assign.fx").unwrap();
    // The statement `a = b = c;` must parse as a = (b = c): the outer
    // assignment's right operand is itself an assignment.
    let found = module.expressions.iter().any(|(_, e)| {
        if let ExprKind::Binary { op, right, .. } = &e.kind {
            op.is_assign()
                && matches!(
                    &module.expressions[*right].kind,
                    ExprKind::Binary { op: inner, .. } if inner.is_assign()
                )
        } else {
            false
        }
    });
    assert!(found, "chained assignment should nest to the right");
}

#[test]
fn precedence_of_arithmetic() {
    let source = r#"
        float main() {
            float r = 1.0 + 2.0 * 3.0;
            return r;
        }
    "#;
    let module = parse(source, "prec.fx").unwrap();
    // The root of the initializer must be the addition.
    let add_is_root = module.expressions.iter().any(|(_, e)| {
        matches!(
            &e.kind,
            ExprKind::Binary { op: hxsl_ast::BinaryOp::Add, right, .. }
                if matches!(
                    &module.expressions[*right].kind,
                    ExprKind::Binary { op: hxsl_ast::BinaryOp::Mul, .. }
                )
        )
    });
    assert!(add_is_root);
}

#[test]
fn conditional_expression_types() {
    let source = r#"
        float main(float x : TEXCOORD0) : SV_TARGET {
            return x > 0.5 ? 1.0 : 0.0;
        }
    "#;
    parse(source, "cond.fx").expect("conditional parses");
}

#[test]
fn parenthesized_member_access() {
    let source = r#"
        float main() {
            float4 v = float4(1, 2, 3, 4);
            return (v).x;
        }
    "#;
    parse(source, "paren.fx").expect("(expr).field parses");
}

#[test]
fn call_on_non_identifier_fails() {
    let source = r#"
        struct S { float x; };
        float main() {
            S s;
            return s.x();
        }
    "#;
    let err = parse(source, "badcall.fx").unwrap_err();
    assert!(err.message.contains("Expected function identifier"), "{err}");
}

#[test]
fn function_name_without_call_fails() {
    let err = parse("float main() { return tex2D; }", "barefn.fx").unwrap_err();
    assert!(err.message.contains("Undeclared identifier 'tex2D'"), "{err}");
}

#[test]
fn unexpected_end_of_stream() {
    let err = parse("struct S { float x;", "eof.fx").unwrap_err();
    assert!(
        err.message.contains("Unexpected end of file while looking for '}'"),
        "{err}"
    );
}

#[test]
fn scope_shadows_innermost_first() {
    let source = r#"
        float x;
        float main() {
            float x = 1.0;
            if (true) {
                float x = 2.0;
                x = 3.0;
            }
            return x;
        }
    "#;
    parse(source, "shadow.fx").expect("shadowing parses");
}

#[test]
fn locals_out_of_scope_after_block() {
    let source = r#"
        float main() {
            if (true) {
                float inner = 1.0;
            }
            return inner;
        }
    "#;
    let err = parse(source, "outofscope.fx").unwrap_err();
    assert!(err.message.contains("Undeclared identifier 'inner'"), "{err}");
}

#[test]
fn sampler_declarations_and_calls() {
    let source = r#"
        sampler2D albedo : register(s0);
        float4 main(float2 uv : TEXCOORD0) : SV_TARGET {
            return tex2D(albedo, uv);
        }
    "#;
    let module = parse(source, "sampler.fx").unwrap();
    let called_intrinsic = module.expressions.iter().any(|(_, e)| {
        matches!(e.kind, ExprKind::Call { callee: Callee::Intrinsic(_), .. })
    });
    assert!(called_intrinsic);
}

#[test]
fn array_declarations_and_access() {
    let source = r#"
        float4 bones[16];
        float4 main(int i : TEXCOORD0) : SV_TARGET {
            return bones[i];
        }
    "#;
    parse(source, "array.fx").expect("arrays parse");
}

#[test]
fn array_initializer_with_trailing_comma() {
    let source = r#"
        float weights[3] = { 0.25, 0.5, 0.25, };
        float main() { return weights[1]; }
    "#;
    parse(source, "arrayinit.fx").expect("trailing comma accepted");
}

#[test]
fn matrix_row_indexing_types() {
    let source = r#"
        float3 main() {
            float3x3 m = float3x3(1, 0, 0, 0, 1, 0, 0, 0, 1);
            return m[0];
        }
    "#;
    parse(source, "matrow.fx").expect("matrix row access yields a vector");
}

#[test]
fn indexing_a_scalar_fails() {
    let source = "float main() { float x = 1.0; return x[0]; }";
    let err = parse(source, "badindex.fx").unwrap_err();
    assert!(err.message.contains("index expression"), "{err}");
}

#[test]
fn packoffset_is_discarded() {
    let source = r#"
        cbuffer Frame { float4 color : packoffset(c0.x); };
        float4 main() : SV_TARGET { return color; }
    "#;
    let module = parse(source, "packoffset.fx").unwrap();
    let (_, buffer) = module.buffers.iter().next().unwrap();
    assert_eq!(buffer.fields.len(), 1);
}

#[test]
fn interpolation_modifiers_are_ignored() {
    let source = r#"
        float4 main(float2 uv : TEXCOORD0 linear) : SV_TARGET {
            return float4(uv, 0.0, 1.0);
        }
    "#;
    let module = parse(source, "interp.fx").unwrap();
    let main = &module.functions[module.find_function("main").unwrap()];
    assert_eq!(main.arguments.len(), 1);
}

#[test]
fn return_type_mismatch_fails() {
    let source = r#"
        struct S { float x; };
        float main() {
            S s;
            return s;
        }
    "#;
    let err = parse(source, "badreturn.fx").unwrap_err();
    assert!(err.message.contains("Cannot implicitly convert"), "{err}");
}

#[test]
fn pre_and_post_increment() {
    let source = r#"
        float main() {
            float sum = 0.0;
            for (int i = 0; i < 4; ++i) {
                sum = sum + 1.0;
            }
            for (int j = 0; j < 4; j++) {
                sum = sum + 1.0;
            }
            return sum;
        }
    "#;
    let module = parse(source, "incr.fx").unwrap();
    let kinds: Vec<_> = module
        .expressions
        .iter()
        .filter_map(|(_, e)| match &e.kind {
            ExprKind::Unary { op, .. } => Some(*op),
            _ => None,
        })
        .collect();
    assert!(kinds.contains(&hxsl_ast::UnaryOp::PreIncrement));
    assert!(kinds.contains(&hxsl_ast::UnaryOp::PostIncrement));
}

#[test]
fn discard_break_continue_statements() {
    let source = r#"
        float4 main(float2 uv : TEXCOORD0) : SV_TARGET {
            for (int i = 0; i < 8; ++i) {
                if (uv.x > 0.5) break;
                if (uv.y > 0.5) continue;
            }
            if (uv.x < 0.0) discard;
            return float4(uv, 0.0, 1.0);
        }
    "#;
    let module = parse(source, "flow.fx").unwrap();
    let main = &module.functions[module.find_function("main").unwrap()];
    let has_discard = main
        .body
        .iter()
        .any(|s| matches!(s.kind, StmtKind::If { ref then_block, .. } if then_block
            .iter()
            .any(|t| matches!(t.kind, StmtKind::Discard))));
    assert!(has_discard);
}
