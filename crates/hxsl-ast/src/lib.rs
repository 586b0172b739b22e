//! Arena-based abstract syntax tree for the HXSL shader transpiler.
//!
//! The parser produces a [`Module`]: top-level declarations in arenas,
//! expressions in one module-wide arena, and every string interned in
//! the module's [`Interner`]. All cross-references are typed
//! [`Handle`]s, so the tree carries no ownership cycles; the two
//! deliberate non-tree edges (function call → function, member access
//! → struct field) are resolved handles and name lookups respectively.

pub mod arena;
mod expr;
mod func;
mod global;
mod intern;
pub mod intrinsics;
mod stmt;
mod types;

pub use arena::{Arena, Handle};
pub use expr::{BinaryOp, Callee, ExprKind, Expression, Literal, UnaryOp};
pub use func::{Argument, ArgumentModifier, Function};
pub use global::{Buffer, BufferField, StructDecl, StructField};
pub use intern::{Interner, Symbol};
pub use intrinsics::{intrinsics, Intrinsic};
pub use stmt::{Block, Declaration, Initializer, Statement, StmtKind};
pub use types::{binary_result_base, BaseType, NumericKind, Span, Type, TypeDesc};

/// A top-level item, in source order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopLevel {
    Struct(Handle<StructDecl>),
    Buffer(Handle<Buffer>),
    Global(Handle<Declaration>),
    Function(Handle<Function>),
}

/// A parsed translation unit.
#[derive(Clone, Debug, Default)]
pub struct Module {
    /// Struct declarations.
    pub structs: Arena<StructDecl>,
    /// `cbuffer`/`tbuffer` declarations.
    pub buffers: Arena<Buffer>,
    /// Top-level variable declarations.
    pub globals: Arena<Declaration>,
    /// User-defined functions.
    pub functions: Arena<Function>,
    /// Module-wide expression arena.
    pub expressions: Arena<Expression>,
    /// Top-level items in source order, for emission.
    pub order: Vec<TopLevel>,
    /// The string pool backing every [`Symbol`] in the tree.
    pub interner: Interner,
}

impl Module {
    /// Looks up a struct declaration by interned name.
    pub fn find_struct(&self, name: Symbol) -> Option<&StructDecl> {
        self.structs.iter().map(|(_, s)| s).find(|s| s.name == name)
    }

    /// Looks up a function by source name.
    pub fn find_function(&self, name: &str) -> Option<Handle<Function>> {
        let symbol = self.interner.get(name)?;
        self.functions
            .iter()
            .find(|(_, f)| f.name == symbol)
            .map(|(h, _)| h)
    }

    /// Resolves an interned symbol.
    pub fn name(&self, symbol: Symbol) -> &str {
        self.interner.resolve(symbol)
    }

    /// The name and signature view of a call's resolved target.
    pub fn callee_name(&self, callee: Callee) -> &str {
        match callee {
            Callee::User(handle) => self.name(self.functions[handle].name),
            Callee::Intrinsic(index) => intrinsics()[index].name,
        }
    }

    /// The declared parameter type at `index` of a call's resolved
    /// target, used by the backends to cast arguments into place.
    pub fn callee_arg_type(&self, callee: Callee, index: usize) -> Type {
        match callee {
            Callee::User(handle) => self.functions[handle].arguments[index].ty,
            Callee::Intrinsic(intrinsic) => {
                let mut ty = Type::new(intrinsics()[intrinsic].args[index]);
                ty.constant = true;
                ty
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_function_by_name() {
        let mut module = Module::default();
        let file = module.interner.intern("m.fx");
        let span = Span { file, line: 1 };
        let name = module.interner.intern("shade");
        let handle = module.functions.append(Function {
            name,
            return_type: Type::new(BaseType::Float4),
            semantic: None,
            arguments: vec![],
            body: vec![],
            span,
        });
        module.order.push(TopLevel::Function(handle));

        assert_eq!(module.find_function("shade"), Some(handle));
        assert_eq!(module.find_function("missing"), None);
    }

    #[test]
    fn callee_accessors() {
        let module = Module::default();
        let index = intrinsics()
            .iter()
            .position(|i| i.name == "dot")
            .expect("dot is an intrinsic");
        assert_eq!(module.callee_name(Callee::Intrinsic(index)), "dot");
        let ty = module.callee_arg_type(Callee::Intrinsic(index), 0);
        assert!(ty.constant);
        assert_eq!(ty.base, BaseType::Float);
    }

    #[test]
    fn find_struct_by_symbol() {
        let mut module = Module::default();
        let file = module.interner.intern("m.fx");
        let span = Span { file, line: 2 };
        let name = module.interner.intern("Varyings");
        let handle = module.structs.append(StructDecl {
            name,
            fields: vec![],
            span,
        });
        module.order.push(TopLevel::Struct(handle));
        assert!(module.find_struct(name).is_some());
        let other = module.interner.intern("Other");
        assert!(module.find_struct(other).is_none());
    }
}
