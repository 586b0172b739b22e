//! The fixed base-type catalogue and type records.

use crate::arena::Handle;
use crate::expr::Expression;
use crate::intern::Symbol;

/// A source location: interned file name plus 1-based line number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub file: Symbol,
    pub line: u32,
}

/// The numeric family of a scalar/vector/matrix base type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumericKind {
    Float,
    Half,
    Bool,
    Int,
    Uint,
}

impl NumericKind {
    /// Cross-family conversion rank (rows: source, columns: destination).
    ///
    /// Same-family pairs never reach this table; their entries are 0.
    /// Smaller is a better implicit conversion.
    pub fn conversion_rank(self, dst: NumericKind) -> u32 {
        const RANK: [[u32; 5]; 5] = [
            // F  H  B  I  U
            [0, 4, 4, 4, 4], // Float
            [1, 0, 4, 4, 4], // Half
            [5, 5, 0, 5, 5], // Bool
            [5, 5, 4, 0, 3], // Int
            [5, 5, 4, 2, 0], // Uint
        ];
        RANK[self as usize][dst as usize]
    }

    /// Rank used to pick the result family of a mixed binary operation.
    /// The family with the smaller rank wins.
    pub fn binary_op_rank(self) -> u32 {
        match self {
            NumericKind::Float => 0,
            NumericKind::Half => 1,
            NumericKind::Uint => 2,
            NumericKind::Int => 3,
            NumericKind::Bool => 4,
        }
    }
}

/// One of the fixed HLSL base types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BaseType {
    Unknown,
    Void,
    Float,
    Float2,
    Float3,
    Float4,
    Float3x3,
    Float4x4,
    Half,
    Half2,
    Half3,
    Half4,
    Half3x3,
    Half4x4,
    Bool,
    Int,
    Int2,
    Int3,
    Int4,
    Uint,
    Uint2,
    Uint3,
    Uint4,
    Texture,
    Sampler2D,
    SamplerCube,
    UserDefined,
}

/// Static description of a base type.
#[derive(Clone, Copy, Debug)]
pub struct TypeDesc {
    /// HLSL spelling, used in diagnostics.
    pub name: &'static str,
    /// Numeric family, or `None` for opaque/void/unknown types.
    pub kind: Option<NumericKind>,
    /// Component count (vector length or matrix column length), 1..4.
    pub components: u8,
    /// 0 = scalar, 1 = vector, 2 = matrix.
    pub dimensions: u8,
    /// Row count; only meaningful for matrices.
    pub height: u8,
}

impl BaseType {
    /// Returns the static description for this base type.
    pub fn desc(self) -> &'static TypeDesc {
        use NumericKind::*;
        macro_rules! desc {
            ($name:literal, $kind:expr, $c:literal, $d:literal, $h:literal) => {
                &TypeDesc {
                    name: $name,
                    kind: $kind,
                    components: $c,
                    dimensions: $d,
                    height: $h,
                }
            };
        }
        match self {
            BaseType::Unknown => desc!("unknown type", None, 0, 0, 0),
            BaseType::Void => desc!("void", None, 0, 0, 0),
            BaseType::Float => desc!("float", Some(Float), 1, 0, 1),
            BaseType::Float2 => desc!("float2", Some(Float), 2, 1, 1),
            BaseType::Float3 => desc!("float3", Some(Float), 3, 1, 1),
            BaseType::Float4 => desc!("float4", Some(Float), 4, 1, 1),
            BaseType::Float3x3 => desc!("float3x3", Some(Float), 3, 2, 3),
            BaseType::Float4x4 => desc!("float4x4", Some(Float), 4, 2, 4),
            BaseType::Half => desc!("half", Some(Half), 1, 0, 1),
            BaseType::Half2 => desc!("half2", Some(Half), 2, 1, 1),
            BaseType::Half3 => desc!("half3", Some(Half), 3, 1, 1),
            BaseType::Half4 => desc!("half4", Some(Half), 4, 1, 1),
            BaseType::Half3x3 => desc!("half3x3", Some(Half), 3, 2, 3),
            BaseType::Half4x4 => desc!("half4x4", Some(Half), 4, 2, 4),
            BaseType::Bool => desc!("bool", Some(Bool), 1, 0, 1),
            BaseType::Int => desc!("int", Some(Int), 1, 0, 1),
            BaseType::Int2 => desc!("int2", Some(Int), 2, 1, 1),
            BaseType::Int3 => desc!("int3", Some(Int), 3, 1, 1),
            BaseType::Int4 => desc!("int4", Some(Int), 4, 1, 1),
            BaseType::Uint => desc!("uint", Some(Uint), 1, 0, 1),
            BaseType::Uint2 => desc!("uint2", Some(Uint), 2, 1, 1),
            BaseType::Uint3 => desc!("uint3", Some(Uint), 3, 1, 1),
            BaseType::Uint4 => desc!("uint4", Some(Uint), 4, 1, 1),
            BaseType::Texture => desc!("texture", None, 1, 0, 0),
            BaseType::Sampler2D => desc!("sampler2D", None, 1, 0, 0),
            BaseType::SamplerCube => desc!("samplerCUBE", None, 1, 0, 0),
            BaseType::UserDefined => desc!("user defined", None, 1, 0, 0),
        }
    }

    /// Returns `true` for the scalar/vector/matrix numeric types.
    pub fn is_numeric(self) -> bool {
        self.desc().kind.is_some()
    }

    /// The numeric type with the given family and shape.
    ///
    /// Panics on shapes that do not exist in the catalogue (the binary
    /// result rule never produces one).
    fn numeric(kind: NumericKind, dimensions: u8, components: u8) -> BaseType {
        use BaseType::*;
        match (kind, dimensions, components) {
            (NumericKind::Float, 0, 1) => Float,
            (NumericKind::Float, 1, 2) => Float2,
            (NumericKind::Float, 1, 3) => Float3,
            (NumericKind::Float, 1, 4) => Float4,
            (NumericKind::Float, 2, 3) => Float3x3,
            (NumericKind::Float, 2, 4) => Float4x4,
            (NumericKind::Half, 0, 1) => Half,
            (NumericKind::Half, 1, 2) => Half2,
            (NumericKind::Half, 1, 3) => Half3,
            (NumericKind::Half, 1, 4) => Half4,
            (NumericKind::Half, 2, 3) => Half3x3,
            (NumericKind::Half, 2, 4) => Half4x4,
            (NumericKind::Int, 0, 1) => Int,
            (NumericKind::Int, 1, 2) => Int2,
            (NumericKind::Int, 1, 3) => Int3,
            (NumericKind::Int, 1, 4) => Int4,
            (NumericKind::Uint, 0, 1) => Uint,
            (NumericKind::Uint, 1, 2) => Uint2,
            (NumericKind::Uint, 1, 3) => Uint3,
            (NumericKind::Uint, 1, 4) => Uint4,
            _ => panic!("no numeric type for {kind:?} dims {dimensions} components {components}"),
        }
    }

    /// Vector of the given family and length (length 1 gives the scalar).
    pub fn vector_of(kind: NumericKind, length: u8) -> BaseType {
        if length == 1 {
            BaseType::numeric(kind, 0, 1)
        } else {
            BaseType::numeric(kind, 1, length)
        }
    }
}

/// Result base type of an arithmetic binary operation on two numeric
/// operands, following HLSL's broadcasting rules:
///
/// - the result family is the operand family with the smaller
///   binary-op rank, with bool promoting to int;
/// - equal dimensions combine component-wise to the smaller width;
/// - a scalar broadcasts to the other operand's shape;
/// - vector-with-matrix has no operator (`mul` covers it) → `Unknown`.
pub fn binary_result_base(left: BaseType, right: BaseType) -> BaseType {
    let (ld, rd) = (left.desc(), right.desc());
    let (lk, rk) = match (ld.kind, rd.kind) {
        (Some(l), Some(r)) => (l, r),
        _ => return BaseType::Unknown,
    };

    let mut kind = if lk.binary_op_rank() <= rk.binary_op_rank() {
        lk
    } else {
        rk
    };
    if kind == NumericKind::Bool {
        kind = NumericKind::Int;
    }

    if ld.dimensions == rd.dimensions {
        let components = ld.components.min(rd.components);
        BaseType::numeric(kind, ld.dimensions, components)
    } else if ld.dimensions == 0 {
        BaseType::numeric(kind, rd.dimensions, rd.components)
    } else if rd.dimensions == 0 {
        BaseType::numeric(kind, ld.dimensions, ld.components)
    } else {
        BaseType::Unknown
    }
}

/// A full type record: base type plus user-type name, array shape, and
/// constness.
///
/// `array_size` identity (handle equality) stands in for the array-size
/// expression identity used by the implicit-cast rules.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Type {
    pub base: BaseType,
    /// Interned struct name, for `BaseType::UserDefined`.
    pub name: Option<Symbol>,
    pub array: bool,
    pub array_size: Option<Handle<Expression>>,
    pub constant: bool,
}

impl Type {
    /// A plain non-array, non-const type.
    pub fn new(base: BaseType) -> Self {
        Self {
            base,
            name: None,
            array: false,
            array_size: None,
            constant: false,
        }
    }

    /// A user-defined (struct) type with the given interned name.
    pub fn user_defined(name: Symbol) -> Self {
        Self {
            base: BaseType::UserDefined,
            name: Some(name),
            ..Self::new(BaseType::UserDefined)
        }
    }

    /// The same type with the const flag set.
    pub fn as_const(mut self) -> Self {
        self.constant = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions() {
        assert_eq!(BaseType::Float3.desc().components, 3);
        assert_eq!(BaseType::Float3.desc().dimensions, 1);
        assert_eq!(BaseType::Float4x4.desc().dimensions, 2);
        assert_eq!(BaseType::Float4x4.desc().height, 4);
        assert_eq!(BaseType::Bool.desc().kind, Some(NumericKind::Bool));
        assert_eq!(BaseType::Sampler2D.desc().kind, None);
        assert!(!BaseType::Texture.is_numeric());
        assert!(BaseType::Uint2.is_numeric());
    }

    #[test]
    fn conversion_rank_table() {
        use NumericKind::*;
        assert_eq!(Float.conversion_rank(Half), 4);
        assert_eq!(Half.conversion_rank(Float), 1);
        assert_eq!(Bool.conversion_rank(Int), 5);
        assert_eq!(Int.conversion_rank(Uint), 3);
        assert_eq!(Uint.conversion_rank(Int), 2);
        assert_eq!(Int.conversion_rank(Bool), 4);
    }

    // Entries pinned against the original generator's lookup table.
    #[test]
    fn binary_result_scalar_broadcast() {
        assert_eq!(
            binary_result_base(BaseType::Float, BaseType::Float2),
            BaseType::Float2
        );
        assert_eq!(
            binary_result_base(BaseType::Float, BaseType::Float3x3),
            BaseType::Float3x3
        );
        assert_eq!(
            binary_result_base(BaseType::Float3x3, BaseType::Float),
            BaseType::Float3x3
        );
    }

    #[test]
    fn binary_result_componentwise_min() {
        assert_eq!(
            binary_result_base(BaseType::Float2, BaseType::Float3),
            BaseType::Float2
        );
        assert_eq!(
            binary_result_base(BaseType::Float3, BaseType::Float2),
            BaseType::Float2
        );
        assert_eq!(
            binary_result_base(BaseType::Float4x4, BaseType::Float3x3),
            BaseType::Float3x3
        );
    }

    #[test]
    fn binary_result_family_promotion() {
        assert_eq!(
            binary_result_base(BaseType::Half, BaseType::Float),
            BaseType::Float
        );
        assert_eq!(
            binary_result_base(BaseType::Int, BaseType::Half),
            BaseType::Half
        );
        assert_eq!(
            binary_result_base(BaseType::Int, BaseType::Uint),
            BaseType::Uint
        );
        assert_eq!(
            binary_result_base(BaseType::Bool, BaseType::Bool),
            BaseType::Int
        );
        assert_eq!(
            binary_result_base(BaseType::Bool, BaseType::Float4),
            BaseType::Float4
        );
    }

    #[test]
    fn binary_result_vector_matrix_is_unknown() {
        assert_eq!(
            binary_result_base(BaseType::Float3, BaseType::Float3x3),
            BaseType::Unknown
        );
        assert_eq!(
            binary_result_base(BaseType::Float2, BaseType::Half3x3),
            BaseType::Unknown
        );
    }

    #[test]
    fn binary_result_non_numeric_is_unknown() {
        assert_eq!(
            binary_result_base(BaseType::Sampler2D, BaseType::Float),
            BaseType::Unknown
        );
        assert_eq!(
            binary_result_base(BaseType::Float, BaseType::Void),
            BaseType::Unknown
        );
    }

    #[test]
    fn vector_of_lengths() {
        assert_eq!(BaseType::vector_of(NumericKind::Float, 1), BaseType::Float);
        assert_eq!(BaseType::vector_of(NumericKind::Half, 3), BaseType::Half3);
        assert_eq!(BaseType::vector_of(NumericKind::Uint, 4), BaseType::Uint4);
    }
}
