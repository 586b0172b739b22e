//! Statement nodes.

use crate::arena::Handle;
use crate::expr::Expression;
use crate::intern::Symbol;
use crate::types::{Span, Type};

/// A sequence of statements.
pub type Block = Vec<Statement>;

/// The initializer of a declaration.
#[derive(Clone, Debug)]
pub enum Initializer {
    /// `= expr`
    Expr(Handle<Expression>),
    /// `= { expr, … }` (array initialization)
    List(Vec<Handle<Expression>>),
}

/// A variable declaration, either at the top level or inside a
/// function body.
#[derive(Clone, Debug)]
pub struct Declaration {
    pub name: Symbol,
    pub ty: Type,
    /// `: register(…)` name, for top-level declarations.
    pub register: Option<Symbol>,
    pub init: Option<Initializer>,
    pub span: Span,
}

/// A statement node.
#[derive(Clone, Debug)]
pub struct Statement {
    pub kind: StmtKind,
    pub span: Span,
}

/// The statement variants.
#[derive(Clone, Debug)]
pub enum StmtKind {
    Declaration(Declaration),
    Expr(Handle<Expression>),
    Return(Option<Handle<Expression>>),
    Discard,
    Break,
    Continue,
    If {
        condition: Handle<Expression>,
        then_block: Block,
        else_block: Block,
    },
    /// All three headers may be empty (`for (;;)`).
    For {
        init: Option<Declaration>,
        condition: Option<Handle<Expression>>,
        increment: Option<Handle<Expression>>,
        body: Block,
    },
    /// A bare `{ … }` block.
    Block(Block),
}
