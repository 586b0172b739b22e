//! The built-in intrinsic function catalogue.
//!
//! Process-wide immutable data, built once on first use. Overload
//! resolution consults it alongside the per-compilation user-function
//! list, and the backends read parameter types from it when rewriting
//! intrinsic calls.

use std::sync::OnceLock;

use crate::types::BaseType;

/// One overload of a built-in function.
#[derive(Clone, Debug)]
pub struct Intrinsic {
    pub name: &'static str,
    pub return_type: BaseType,
    pub args: Vec<BaseType>,
}

const FLOAT_VECS: [BaseType; 4] = [
    BaseType::Float,
    BaseType::Float2,
    BaseType::Float3,
    BaseType::Float4,
];

const HALF_VECS: [BaseType; 4] = [
    BaseType::Half,
    BaseType::Half2,
    BaseType::Half3,
    BaseType::Half4,
];

/// `T name(T)` for float/half of widths 1..4.
fn unary(table: &mut Vec<Intrinsic>, name: &'static str) {
    for ty in FLOAT_VECS.into_iter().chain(HALF_VECS) {
        table.push(Intrinsic {
            name,
            return_type: ty,
            args: vec![ty],
        });
    }
}

/// `T name(T, T)` for float/half of widths 1..4.
fn binary(table: &mut Vec<Intrinsic>, name: &'static str) {
    for ty in FLOAT_VECS.into_iter().chain(HALF_VECS) {
        table.push(Intrinsic {
            name,
            return_type: ty,
            args: vec![ty, ty],
        });
    }
}

/// The three-argument family shape shared by `clamp`, `lerp`,
/// `smoothstep`, and `sincos`: the float variants take a scalar middle
/// argument, the half variants take the full vector in every slot.
fn ternary(table: &mut Vec<Intrinsic>, name: &'static str, return_void: bool) {
    for ty in FLOAT_VECS {
        table.push(Intrinsic {
            name,
            return_type: if return_void { BaseType::Void } else { ty },
            args: vec![ty, BaseType::Float, ty],
        });
    }
    for ty in HALF_VECS {
        table.push(Intrinsic {
            name,
            return_type: if return_void { BaseType::Void } else { ty },
            args: vec![ty, ty, ty],
        });
    }
}

fn build() -> Vec<Intrinsic> {
    use BaseType::*;

    let mut t = Vec::new();

    unary(&mut t, "abs");
    binary(&mut t, "atan2");
    ternary(&mut t, "clamp", false);
    unary(&mut t, "cos");

    ternary(&mut t, "lerp", false);
    ternary(&mut t, "smoothstep", false);

    unary(&mut t, "floor");
    unary(&mut t, "ceil");
    unary(&mut t, "frac");

    binary(&mut t, "fmod");

    for ty in FLOAT_VECS.into_iter().chain(HALF_VECS) {
        t.push(Intrinsic {
            name: "clip",
            return_type: Void,
            args: vec![ty],
        });
    }

    for (vecs, scalar) in [(FLOAT_VECS, Float), (HALF_VECS, Half)] {
        for ty in vecs {
            t.push(Intrinsic {
                name: "dot",
                return_type: scalar,
                args: vec![ty, ty],
            });
        }
    }

    t.push(Intrinsic {
        name: "cross",
        return_type: Float3,
        args: vec![Float3, Float3],
    });

    for (vecs, scalar) in [(FLOAT_VECS, Float), (HALF_VECS, Half)] {
        for ty in vecs {
            t.push(Intrinsic {
                name: "length",
                return_type: scalar,
                args: vec![ty],
            });
        }
    }

    binary(&mut t, "max");
    binary(&mut t, "min");

    binary(&mut t, "mul");
    t.push(Intrinsic {
        name: "mul",
        return_type: Float3,
        args: vec![Float3, Float3x3],
    });
    t.push(Intrinsic {
        name: "mul",
        return_type: Float4,
        args: vec![Float4, Float4x4],
    });

    t.push(Intrinsic {
        name: "transpose",
        return_type: Float3x3,
        args: vec![Float3x3],
    });
    t.push(Intrinsic {
        name: "transpose",
        return_type: Float4x4,
        args: vec![Float4x4],
    });

    unary(&mut t, "normalize");
    binary(&mut t, "pow");
    unary(&mut t, "saturate");
    unary(&mut t, "sin");
    unary(&mut t, "sqrt");
    unary(&mut t, "rsqrt");
    unary(&mut t, "rcp");

    unary(&mut t, "ddx");
    unary(&mut t, "ddy");

    unary(&mut t, "sign");
    binary(&mut t, "step");
    binary(&mut t, "reflect");

    t.push(Intrinsic {
        name: "tex2D",
        return_type: Float4,
        args: vec![Sampler2D, Float2],
    });
    t.push(Intrinsic {
        name: "tex2Dproj",
        return_type: Float4,
        args: vec![Sampler2D, Float4],
    });
    t.push(Intrinsic {
        name: "tex2Dlod",
        return_type: Float4,
        args: vec![Sampler2D, Float4],
    });

    t.push(Intrinsic {
        name: "texCUBE",
        return_type: Float4,
        args: vec![SamplerCube, Float3],
    });
    t.push(Intrinsic {
        name: "texCUBEbias",
        return_type: Float4,
        args: vec![SamplerCube, Float4],
    });

    // sincos(x, out s, out c)
    ternary(&mut t, "sincos", true);

    t
}

/// Returns the process-wide intrinsic table.
pub fn intrinsics() -> &'static [Intrinsic] {
    static TABLE: OnceLock<Vec<Intrinsic>> = OnceLock::new();
    TABLE.get_or_init(build)
}
