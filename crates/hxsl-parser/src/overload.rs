//! Implicit-cast ranking and overload comparison.

use hxsl_ast::{Function, Intrinsic, Type};

/// How one candidate compares against another for a given call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    FirstBetter,
    SecondBetter,
}

/// A uniform signature view over user functions and intrinsics.
#[derive(Clone, Copy, Debug)]
pub enum Signature<'a> {
    User(&'a Function),
    Intrinsic(&'a Intrinsic),
}

impl Signature<'_> {
    pub fn num_args(&self) -> usize {
        match self {
            Signature::User(f) => f.arguments.len(),
            Signature::Intrinsic(i) => i.args.len(),
        }
    }

    pub fn arg_type(&self, index: usize) -> Type {
        match self {
            Signature::User(f) => f.arguments[index].ty,
            Signature::Intrinsic(i) => {
                let mut ty = Type::new(i.args[index]);
                ty.constant = true;
                ty
            }
        }
    }
}

/// Ranks an implicit conversion from `src` to `dst`.
///
/// Returns -1 when the conversion is impossible. Otherwise the result
/// packs, from best to worst: exact match (0), scalar dimension
/// promotion (bit 0), cross-family conversion (rank shifted left by
/// one), and truncation (bit 4). Smaller is better.
pub fn type_cast_rank(src: &Type, dst: &Type) -> i32 {
    if src.array != dst.array || src.array_size != dst.array_size {
        return -1;
    }

    if src.base == hxsl_ast::BaseType::UserDefined && dst.base == hxsl_ast::BaseType::UserDefined {
        return if src.name == dst.name { 0 } else { -1 };
    }

    if src.base == dst.base {
        return 0;
    }

    let src_desc = src.base.desc();
    let dst_desc = dst.base.desc();
    let (src_kind, dst_kind) = match (src_desc.kind, dst_desc.kind) {
        (Some(s), Some(d)) => (s, d),
        _ => return -1,
    };

    let mut result = (src_kind.conversion_rank(dst_kind) << 1) as i32;

    if src_desc.dimensions == 0 && dst_desc.dimensions > 0 {
        // Scalar dimension promotion.
        result |= 1 << 0;
    } else if (src_desc.dimensions == dst_desc.dimensions
        && src_desc.components > dst_desc.components)
        || (src_desc.dimensions > 0 && dst_desc.dimensions == 0)
    {
        // Truncation.
        result |= 1 << 4;
    } else if src_desc.dimensions != dst_desc.dimensions
        || src_desc.components != dst_desc.components
    {
        return -1;
    }

    result
}

/// Per-argument cast ranks of a call against a candidate, or `None` if
/// the candidate is not viable (arity mismatch or an impossible cast).
fn call_ranks(args: &[Type], candidate: &Signature) -> Option<Vec<i32>> {
    if candidate.num_args() != args.len() {
        return None;
    }
    let mut ranks = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        let rank = type_cast_rank(arg, &candidate.arg_type(index));
        if rank == -1 {
            return None;
        }
        ranks.push(rank);
    }
    Some(ranks)
}

/// Compares two candidates for a call with the given argument types.
///
/// Each candidate's rank vector is sorted in descending order and the
/// vectors are compared element-wise; the first position with a smaller
/// rank wins. A missing (`None`) second candidate is never better.
pub fn compare_candidates(
    args: &[Type],
    first: &Signature,
    second: Option<&Signature>,
) -> Comparison {
    let first_ranks = call_ranks(args, first);
    let second_ranks = second.and_then(|s| call_ranks(args, s));

    let (mut first_ranks, mut second_ranks) = match (first_ranks, second_ranks) {
        (Some(a), Some(b)) => (a, b),
        (Some(_), None) => return Comparison::FirstBetter,
        (None, Some(_)) => return Comparison::SecondBetter,
        (None, None) => return Comparison::Equal,
    };

    first_ranks.sort_unstable_by(|a, b| b.cmp(a));
    second_ranks.sort_unstable_by(|a, b| b.cmp(a));

    for (a, b) in first_ranks.iter().zip(&second_ranks) {
        if a < b {
            return Comparison::FirstBetter;
        }
        if b < a {
            return Comparison::SecondBetter;
        }
    }

    Comparison::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use hxsl_ast::{BaseType, Intrinsic, Type};

    fn ty(base: BaseType) -> Type {
        Type::new(base)
    }

    #[test]
    fn identity_rank_is_zero() {
        for base in [
            BaseType::Float,
            BaseType::Float4,
            BaseType::Half3x3,
            BaseType::Bool,
            BaseType::Int2,
            BaseType::Uint4,
            BaseType::Sampler2D,
            BaseType::Texture,
            BaseType::Void,
        ] {
            assert_eq!(type_cast_rank(&ty(base), &ty(base)), 0, "{base:?}");
        }
    }

    #[test]
    fn scalar_promotion_beats_conversion() {
        // float -> float4: promotion only.
        let promo = type_cast_rank(&ty(BaseType::Float), &ty(BaseType::Float4));
        // int -> float: conversion only.
        let conv = type_cast_rank(&ty(BaseType::Int), &ty(BaseType::Float));
        assert_eq!(promo, 1);
        assert!(conv > promo);
    }

    #[test]
    fn truncation_is_expensive() {
        let trunc = type_cast_rank(&ty(BaseType::Float4), &ty(BaseType::Float2));
        assert_eq!(trunc, 1 << 4);
        let to_scalar = type_cast_rank(&ty(BaseType::Float3), &ty(BaseType::Float));
        assert_eq!(to_scalar, 1 << 4);
    }

    #[test]
    fn impossible_casts() {
        // Vector widening is not implicit.
        assert_eq!(type_cast_rank(&ty(BaseType::Float2), &ty(BaseType::Float4)), -1);
        // Opaque types never convert.
        assert_eq!(type_cast_rank(&ty(BaseType::Sampler2D), &ty(BaseType::Float)), -1);
        assert_eq!(type_cast_rank(&ty(BaseType::Float), &ty(BaseType::Void)), -1);
    }

    #[test]
    fn array_shape_must_match() {
        let mut arr = ty(BaseType::Float);
        arr.array = true;
        assert_eq!(type_cast_rank(&arr, &ty(BaseType::Float)), -1);
        assert_eq!(type_cast_rank(&ty(BaseType::Float), &arr), -1);
        assert_eq!(type_cast_rank(&arr, &arr), 0);
    }

    #[test]
    fn user_defined_compares_by_name() {
        let mut interner = hxsl_ast::Interner::new();
        let a = Type::user_defined(interner.intern("A"));
        let b = Type::user_defined(interner.intern("B"));
        assert_eq!(type_cast_rank(&a, &a), 0);
        assert_eq!(type_cast_rank(&a, &b), -1);
    }

    fn intrinsic(ret: BaseType, args: &[BaseType]) -> Intrinsic {
        Intrinsic {
            name: "f",
            return_type: ret,
            args: args.to_vec(),
        }
    }

    #[test]
    fn direct_match_beats_promotion() {
        // f(float) vs f(float2) called with a float: scenario from the
        // overload-rank requirement.
        let scalar = intrinsic(BaseType::Float, &[BaseType::Float]);
        let vector = intrinsic(BaseType::Float2, &[BaseType::Float2]);
        let args = [ty(BaseType::Float)];
        let result = compare_candidates(
            &args,
            &Signature::Intrinsic(&scalar),
            Some(&Signature::Intrinsic(&vector)),
        );
        assert_eq!(result, Comparison::FirstBetter);
    }

    #[test]
    fn symmetric_conversions_are_equal() {
        // g(float, int) vs g(int, float) called with (int, int): the
        // sorted rank vectors coincide.
        let g1 = intrinsic(BaseType::Float, &[BaseType::Float, BaseType::Int]);
        let g2 = intrinsic(BaseType::Float, &[BaseType::Int, BaseType::Float]);
        let args = [ty(BaseType::Int), ty(BaseType::Int)];
        let result = compare_candidates(
            &args,
            &Signature::Intrinsic(&g1),
            Some(&Signature::Intrinsic(&g2)),
        );
        assert_eq!(result, Comparison::Equal);
    }

    #[test]
    fn arity_mismatch_is_not_viable() {
        let unary = intrinsic(BaseType::Float, &[BaseType::Float]);
        let args = [ty(BaseType::Float), ty(BaseType::Float)];
        assert_eq!(
            compare_candidates(&args, &Signature::Intrinsic(&unary), None),
            Comparison::Equal
        );
    }

    #[test]
    fn viable_beats_missing() {
        let f = intrinsic(BaseType::Float, &[BaseType::Float]);
        let args = [ty(BaseType::Float)];
        assert_eq!(
            compare_candidates(&args, &Signature::Intrinsic(&f), None),
            Comparison::FirstBetter
        );
    }
}
