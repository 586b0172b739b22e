//! Expression nodes.

use crate::arena::Handle;
use crate::func::Function;
use crate::intern::Symbol;
use crate::types::{Span, Type};

/// A literal constant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i32),
    Float(f32),
}

/// A unary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Negate,
    /// `+x`
    Positive,
    /// `!x`
    Not,
    /// `++x`
    PreIncrement,
    /// `--x`
    PreDecrement,
    /// `x++`
    PostIncrement,
    /// `x--`
    PostDecrement,
}

/// A binary operator, including the assignment forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl BinaryOp {
    /// Precedence-climbing priority. Assignment forms are parsed
    /// separately at the top of the expression grammar and have none.
    pub fn priority(self) -> Option<u32> {
        match self {
            BinaryOp::And => Some(2),
            BinaryOp::Or => Some(1),
            BinaryOp::Add | BinaryOp::Sub => Some(5),
            BinaryOp::Mul | BinaryOp::Div => Some(6),
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEqual | BinaryOp::GreaterEqual => {
                Some(4)
            }
            BinaryOp::Equal | BinaryOp::NotEqual => Some(3),
            BinaryOp::Assign
            | BinaryOp::AddAssign
            | BinaryOp::SubAssign
            | BinaryOp::MulAssign
            | BinaryOp::DivAssign => None,
        }
    }

    /// The source spelling, used in diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Assign => "=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
        }
    }

    /// `true` for `=` and the compound assignment forms.
    pub fn is_assign(self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
        )
    }
}

/// The resolved target of a function call.
///
/// `User` is a non-owning handle into the module's function arena;
/// `Intrinsic` indexes the process-wide intrinsic table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Callee {
    User(Handle<Function>),
    Intrinsic(usize),
}

/// An expression node. `ty` is the resolved expression type; after a
/// successful parse it is never `BaseType::Unknown`.
#[derive(Clone, Debug)]
pub struct Expression {
    pub kind: ExprKind,
    pub ty: Type,
    pub span: Span,
}

/// The expression variants.
#[derive(Clone, Debug)]
pub enum ExprKind {
    Literal(Literal),
    /// An identifier; `global` records whether it resolved outside any
    /// function scope.
    Ident {
        name: Symbol,
        global: bool,
    },
    Unary {
        op: UnaryOp,
        expr: Handle<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Handle<Expression>,
        right: Handle<Expression>,
    },
    /// `cond ? accept : reject`
    Conditional {
        condition: Handle<Expression>,
        accept: Handle<Expression>,
        reject: Handle<Expression>,
    },
    /// `(T)expr`; the target type is the node's `ty`.
    Cast {
        expr: Handle<Expression>,
    },
    /// `T(args…)`; the constructed type is the node's `ty`.
    Constructor {
        args: Vec<Handle<Expression>>,
    },
    /// `object.field` — a struct field, a swizzle, or a matrix element
    /// access, decided by the object's type.
    Member {
        object: Handle<Expression>,
        field: Symbol,
    },
    /// `object[index]`
    Index {
        object: Handle<Expression>,
        index: Handle<Expression>,
    },
    /// A call to the resolved `callee`.
    Call {
        callee: Callee,
        args: Vec<Handle<Expression>>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_match_grammar_table() {
        assert_eq!(BinaryOp::And.priority(), Some(2));
        assert_eq!(BinaryOp::Or.priority(), Some(1));
        assert_eq!(BinaryOp::Add.priority(), Some(5));
        assert_eq!(BinaryOp::Mul.priority(), Some(6));
        assert_eq!(BinaryOp::LessEqual.priority(), Some(4));
        assert_eq!(BinaryOp::NotEqual.priority(), Some(3));
        assert_eq!(BinaryOp::Assign.priority(), None);
    }

    #[test]
    fn assign_classification() {
        assert!(BinaryOp::Assign.is_assign());
        assert!(BinaryOp::DivAssign.is_assign());
        assert!(!BinaryOp::Div.is_assign());
        assert!(!BinaryOp::Equal.is_assign());
    }

    #[test]
    fn symbols() {
        assert_eq!(BinaryOp::And.symbol(), "&&");
        assert_eq!(BinaryOp::AddAssign.symbol(), "+=");
        assert_eq!(BinaryOp::Greater.symbol(), ">");
    }
}
