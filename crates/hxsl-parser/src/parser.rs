//! Recursive-descent parser with fused semantic analysis.
//!
//! Parsing and type checking happen in one pass: every expression node
//! is given its resolved type as it is built, identifiers are resolved
//! against the scope stack, and function calls are bound to their
//! overload before the next token is consumed.

use hxsl_ast::{
    binary_result_base, intrinsics, Argument, ArgumentModifier, BaseType, BinaryOp, Buffer,
    BufferField, Callee, Declaration, ExprKind, Expression, Function, Handle, Initializer,
    Interner, Literal, Module, NumericKind, Span, Statement, StmtKind, StructDecl, StructField,
    Symbol, TopLevel, Type, UnaryOp,
};

use crate::lexer::Token;
use crate::overload::{compare_candidates, type_cast_rank, Comparison, Signature};
use crate::stream::TokenStream;
use crate::ParseError;

/// Priority of the `?:` operator.
const CONDITIONAL_PRIORITY: u32 = 1;

struct ScopeVariable {
    /// `None` marks a scope boundary sentinel.
    name: Option<Symbol>,
    ty: Type,
}

pub(crate) struct Parser {
    stream: TokenStream,
    interner: Interner,
    module: Module,
    variables: Vec<ScopeVariable>,
    num_globals: usize,
}

type Result<T> = std::result::Result<T, ParseError>;

impl Parser {
    pub(crate) fn new(stream: TokenStream, interner: Interner) -> Self {
        Self {
            stream,
            interner,
            module: Module::default(),
            variables: Vec::new(),
            num_globals: 0,
        }
    }

    pub(crate) fn run(mut self) -> Result<Module> {
        while !self.stream.accept(Token::EndOfStream) {
            self.parse_top_level()?;
        }
        self.module.interner = self.interner;
        Ok(self.module)
    }

    // -----------------------------------------------------------------
    // Token helpers
    // -----------------------------------------------------------------

    fn span(&self) -> Span {
        Span {
            file: self.stream.file(),
            line: self.stream.line(),
        }
    }

    fn accept(&mut self, token: Token) -> bool {
        self.stream.accept(token)
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        self.stream.expect(token, &self.interner)
    }

    fn accept_punct(&mut self, c: u8) -> bool {
        self.stream.accept(Token::Punct(c))
    }

    fn expect_punct(&mut self, c: u8) -> Result<()> {
        self.stream.expect(Token::Punct(c), &self.interner)
    }

    fn accept_identifier(&mut self) -> Option<Symbol> {
        if let Token::Identifier(symbol) = self.stream.token() {
            self.stream.advance();
            return Some(symbol);
        }
        None
    }

    fn expect_identifier(&mut self) -> Result<Symbol> {
        self.accept_identifier().ok_or_else(|| {
            let near = crate::lexer::token_name(self.stream.token(), &self.interner);
            self.stream
                .error(format!("Syntax error: expected identifier near '{near}'"))
        })
    }

    /// Accepts an identifier whose spelling equals `word`. Used for
    /// keywords that are only meaningful in specific contexts, such as
    /// interpolation modifiers.
    fn accept_word(&mut self, word: &str) -> bool {
        if let Token::Identifier(symbol) = self.stream.token() {
            if self.interner.resolve(symbol) == word {
                self.stream.advance();
                return true;
            }
        }
        false
    }

    fn check_eos(&mut self, looking_for: Token) -> Result<()> {
        if self.stream.token() == Token::EndOfStream {
            let what = crate::lexer::token_name(looking_for, &self.interner);
            return Err(self
                .stream
                .error(format!("Unexpected end of file while looking for '{what}'")));
        }
        Ok(())
    }

    fn type_name(&self, ty: &Type) -> String {
        match (ty.base, ty.name) {
            (BaseType::UserDefined, Some(name)) => self.interner.resolve(name).to_string(),
            _ => ty.base.desc().name.to_string(),
        }
    }

    // -----------------------------------------------------------------
    // Scope
    // -----------------------------------------------------------------

    fn begin_scope(&mut self) {
        self.variables.push(ScopeVariable {
            name: None,
            ty: Type::new(BaseType::Unknown),
        });
    }

    fn end_scope(&mut self) {
        while let Some(variable) = self.variables.pop() {
            if variable.name.is_none() {
                return;
            }
        }
        unreachable!("end_scope without matching begin_scope");
    }

    fn declare_variable(&mut self, name: Symbol, ty: Type) {
        if self.variables.len() == self.num_globals {
            self.num_globals += 1;
        }
        self.variables.push(ScopeVariable {
            name: Some(name),
            ty,
        });
    }

    /// Innermost-first lookup; the second value reports whether the
    /// variable lives in global scope.
    fn find_variable(&self, name: Symbol) -> Option<(Type, bool)> {
        for (index, variable) in self.variables.iter().enumerate().rev() {
            if variable.name == Some(name) {
                return Some((variable.ty, index < self.num_globals));
            }
        }
        None
    }

    fn find_user_type(&self, name: Symbol) -> Option<Handle<StructDecl>> {
        self.module
            .structs
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(h, _)| h)
    }

    fn is_function(&self, name: Symbol) -> bool {
        if self.module.functions.iter().any(|(_, f)| f.name == name) {
            return true;
        }
        let text = self.interner.resolve(name);
        intrinsics().iter().any(|i| i.name == text)
    }

    // -----------------------------------------------------------------
    // Types and declarations
    // -----------------------------------------------------------------

    /// Accepts a type, returning `(base, user-type name, const)`.
    fn accept_type(
        &mut self,
        allow_void: bool,
        allow_const: bool,
    ) -> Option<(BaseType, Option<Symbol>, bool)> {
        let saved = self.stream.save();
        let constant = allow_const && self.accept(Token::Const);

        match self.stream.token() {
            Token::Type(base) => {
                self.stream.advance();
                Some((base, None, constant))
            }
            Token::Void if allow_void => {
                self.stream.advance();
                Some((BaseType::Void, None, constant))
            }
            Token::Identifier(name) if self.find_user_type(name).is_some() => {
                self.stream.advance();
                Some((BaseType::UserDefined, Some(name), constant))
            }
            _ => {
                self.stream.restore(saved);
                None
            }
        }
    }

    /// Accepts `type name` with optional `[size]`. Returns `None`
    /// without consuming anything when no type starts here; fails when
    /// a type was present but the declaration is malformed.
    fn accept_declaration(&mut self, allow_unsized_array: bool) -> Result<Option<(Type, Symbol)>> {
        let (base, type_name, constant) = match self.accept_type(false, true) {
            Some(parts) => parts,
            None => return Ok(None),
        };
        let mut ty = Type {
            base,
            name: type_name,
            array: false,
            array_size: None,
            constant,
        };

        let name = self.expect_identifier()?;

        if self.accept_punct(b'[') {
            ty.array = true;
            if self.accept_punct(b']') {
                if !allow_unsized_array {
                    return Err(self.stream.error("Expected array size"));
                }
            } else {
                ty.array_size = Some(self.parse_expression()?);
                self.expect_punct(b']')?;
            }
        }

        Ok(Some((ty, name)))
    }

    fn expect_declaration(&mut self, allow_unsized_array: bool) -> Result<(Type, Symbol)> {
        match self.accept_declaration(allow_unsized_array)? {
            Some(declaration) => Ok(declaration),
            None => Err(self.stream.error("Expected declaration")),
        }
    }

    fn check_type_cast(&self, src: &Type, dst: &Type) -> Result<()> {
        if type_cast_rank(src, dst) == -1 {
            return Err(self.stream.error(format!(
                "Cannot implicitly convert from '{}' to '{}'",
                self.type_name(src),
                self.type_name(dst)
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Top level
    // -----------------------------------------------------------------

    fn parse_top_level(&mut self) -> Result<()> {
        let span = self.span();

        if self.accept(Token::Struct) {
            self.parse_struct(span)?;
        } else if self.accept(Token::CBuffer) || self.accept(Token::TBuffer) {
            self.parse_buffer(span)?;
        } else if let Some((base, type_name, constant)) = self.accept_type(true, true) {
            let name = self.expect_identifier()?;
            if self.accept_punct(b'(') {
                return self.parse_function(span, base, type_name, name);
            }
            self.parse_global_declaration(span, base, type_name, constant, name)?;
        }

        self.expect_punct(b';')
    }

    fn parse_struct(&mut self, span: Span) -> Result<()> {
        let name = self.expect_identifier()?;
        if self.find_user_type(name).is_some() {
            return Err(self.stream.error(format!(
                "struct {} already defined",
                self.interner.resolve(name)
            )));
        }
        self.expect_punct(b'{')?;

        // Register the type before the fields so that nested use of the
        // name (not supported, but diagnosed) resolves consistently.
        let handle = self.module.structs.append(StructDecl {
            name,
            fields: Vec::new(),
            span,
        });
        self.module.order.push(TopLevel::Struct(handle));

        while !self.accept_punct(b'}') {
            self.check_eos(Token::Punct(b'}'))?;
            let field = self.parse_field_declaration()?;
            self.module.structs[handle].fields.push(field);
        }
        Ok(())
    }

    fn parse_field_declaration(&mut self) -> Result<StructField> {
        let span = self.span();
        let (ty, name) = self.expect_declaration(false)?;
        let semantic = if self.accept_punct(b':') {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        self.expect_punct(b';')?;
        Ok(StructField {
            name,
            ty,
            semantic,
            span,
        })
    }

    fn parse_buffer(&mut self, span: Span) -> Result<()> {
        let name = self.accept_identifier();

        let register = if self.accept_punct(b':') {
            self.expect(Token::Register)?;
            self.expect_punct(b'(')?;
            let register = self.expect_identifier()?;
            self.expect_punct(b')')?;
            Some(register)
        } else {
            None
        };

        self.expect_punct(b'{')?;
        let mut fields = Vec::new();
        while !self.accept_punct(b'}') {
            self.check_eos(Token::Punct(b'}'))?;
            let field = self.parse_buffer_field()?;
            self.declare_variable(field.name, field.ty);
            fields.push(field);
        }

        let handle = self.module.buffers.append(Buffer {
            name,
            register,
            fields,
            span,
        });
        self.module.order.push(TopLevel::Buffer(handle));
        Ok(())
    }

    fn parse_buffer_field(&mut self) -> Result<BufferField> {
        let span = self.span();
        let (ty, name) = match self.accept_declaration(false)? {
            Some(declaration) => declaration,
            None => return Err(self.stream.error("Expected variable declaration")),
        };
        // Optional packoffset, parsed and discarded.
        if self.accept_punct(b':') {
            self.expect(Token::PackOffset)?;
            self.expect_punct(b'(')?;
            self.expect_identifier()?;
            self.expect_punct(b'.')?;
            self.expect_identifier()?;
            self.expect_punct(b')')?;
        }
        self.expect_punct(b';')?;
        Ok(BufferField { name, ty, span })
    }

    fn parse_function(
        &mut self,
        span: Span,
        return_base: BaseType,
        return_type_name: Option<Symbol>,
        name: Symbol,
    ) -> Result<()> {
        let return_type = Type {
            base: return_base,
            name: return_type_name,
            array: false,
            array_size: None,
            constant: false,
        };

        self.begin_scope();
        let arguments = self.parse_argument_list()?;

        let semantic = if self.accept_punct(b':') {
            Some(self.expect_identifier()?)
        } else {
            None
        };

        // Register the function before parsing the body so that
        // recursive calls resolve against it.
        let handle = self.module.functions.append(Function {
            name,
            return_type,
            semantic,
            arguments,
            body: Vec::new(),
            span,
        });
        self.module.order.push(TopLevel::Function(handle));

        self.expect_punct(b'{')?;
        let body = self.parse_block(return_type)?;
        self.end_scope();
        self.module.functions[handle].body = body;

        // No semicolon after a function definition.
        Ok(())
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Argument>> {
        let mut arguments = Vec::new();
        while !self.accept_punct(b')') {
            self.check_eos(Token::Punct(b')'))?;
            if !arguments.is_empty() {
                self.expect_punct(b',')?;
            }
            let span = self.span();

            let modifier = if self.accept(Token::Uniform) {
                ArgumentModifier::Uniform
            } else if self.accept(Token::In) {
                ArgumentModifier::In
            } else if self.accept(Token::Inout) {
                ArgumentModifier::Inout
            } else {
                ArgumentModifier::None
            };

            let (ty, name) = self.expect_declaration(true)?;
            self.declare_variable(name, ty);

            let semantic = if self.accept_punct(b':') {
                Some(self.expect_identifier()?)
            } else {
                None
            };

            // Interpolation modifiers are accepted and ignored.
            let _ = self.accept_word("linear")
                || self.accept_word("centroid")
                || self.accept_word("nointerpolation")
                || self.accept_word("noperspective")
                || self.accept_word("sample");

            arguments.push(Argument {
                name,
                modifier,
                ty,
                semantic,
                span,
            });
        }
        Ok(arguments)
    }

    fn parse_global_declaration(
        &mut self,
        span: Span,
        base: BaseType,
        type_name: Option<Symbol>,
        constant: bool,
        name: Symbol,
    ) -> Result<()> {
        let mut ty = Type {
            base,
            name: type_name,
            array: false,
            array_size: None,
            constant,
        };

        if self.accept_punct(b'[') {
            if !self.accept_punct(b']') {
                ty.array_size = Some(self.parse_expression()?);
                self.expect_punct(b']')?;
            }
            ty.array = true;
        }

        let register = if self.accept_punct(b':') {
            self.expect(Token::Register)?;
            self.expect_punct(b'(')?;
            let register = self.expect_identifier()?;
            self.expect_punct(b')')?;
            Some(register)
        } else {
            None
        };

        self.declare_variable(name, ty);
        let init = self.parse_declaration_assignment(&ty)?;

        let handle = self.module.globals.append(Declaration {
            name,
            ty,
            register,
            init,
            span,
        });
        self.module.order.push(TopLevel::Global(handle));
        Ok(())
    }

    fn parse_declaration_assignment(&mut self, ty: &Type) -> Result<Option<Initializer>> {
        if !self.accept_punct(b'=') {
            return Ok(None);
        }
        if ty.array {
            self.expect_punct(b'{')?;
            let values = self.parse_expression_list(Token::Punct(b'}'), true)?;
            Ok(Some(Initializer::List(values)))
        } else {
            Ok(Some(Initializer::Expr(self.parse_expression()?)))
        }
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn parse_block(&mut self, return_type: Type) -> Result<Vec<Statement>> {
        let mut block = Vec::new();
        while !self.accept_punct(b'}') {
            self.check_eos(Token::Punct(b'}'))?;
            if let Some(statement) = self.parse_statement(return_type)? {
                block.push(statement);
            }
        }
        Ok(block)
    }

    fn parse_statement_or_block(&mut self, return_type: Type) -> Result<Vec<Statement>> {
        if self.accept_punct(b'{') {
            self.begin_scope();
            let block = self.parse_block(return_type)?;
            self.end_scope();
            return Ok(block);
        }
        Ok(self.parse_statement(return_type)?.into_iter().collect())
    }

    fn parse_statement(&mut self, return_type: Type) -> Result<Option<Statement>> {
        let span = self.span();

        // Empty statement.
        if self.accept_punct(b';') {
            return Ok(None);
        }

        // Bare block.
        if self.accept_punct(b'{') {
            self.begin_scope();
            let block = self.parse_block(return_type)?;
            self.end_scope();
            return Ok(Some(Statement {
                kind: StmtKind::Block(block),
                span,
            }));
        }

        if self.accept(Token::If) {
            self.expect_punct(b'(')?;
            let condition = self.parse_expression()?;
            self.expect_punct(b')')?;
            let then_block = self.parse_statement_or_block(return_type)?;
            let else_block = if self.accept(Token::Else) {
                self.parse_statement_or_block(return_type)?
            } else {
                Vec::new()
            };
            return Ok(Some(Statement {
                kind: StmtKind::If {
                    condition,
                    then_block,
                    else_block,
                },
                span,
            }));
        }

        if self.accept(Token::For) {
            self.expect_punct(b'(')?;
            self.begin_scope();

            let init = if self.stream.token() == Token::Punct(b';') {
                None
            } else {
                Some(self.parse_local_declaration()?)
            };
            self.expect_punct(b';')?;

            let condition = if self.stream.token() == Token::Punct(b';') {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.expect_punct(b';')?;

            let increment = if self.stream.token() == Token::Punct(b')') {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.expect_punct(b')')?;

            let body = self.parse_statement_or_block(return_type)?;
            self.end_scope();
            return Ok(Some(Statement {
                kind: StmtKind::For {
                    init,
                    condition,
                    increment,
                    body,
                },
                span,
            }));
        }

        if self.accept(Token::Discard) {
            self.expect_punct(b';')?;
            return Ok(Some(Statement {
                kind: StmtKind::Discard,
                span,
            }));
        }

        if self.accept(Token::Break) {
            self.expect_punct(b';')?;
            return Ok(Some(Statement {
                kind: StmtKind::Break,
                span,
            }));
        }

        if self.accept(Token::Continue) {
            self.expect_punct(b';')?;
            return Ok(Some(Statement {
                kind: StmtKind::Continue,
                span,
            }));
        }

        if self.accept(Token::Return) {
            if self.accept_punct(b';') {
                return Ok(Some(Statement {
                    kind: StmtKind::Return(None),
                    span,
                }));
            }
            let value = self.parse_expression()?;
            let value_ty = self.module.expressions[value].ty;
            self.check_type_cast(&value_ty, &return_type)?;
            self.expect_punct(b';')?;
            return Ok(Some(Statement {
                kind: StmtKind::Return(Some(value)),
                span,
            }));
        }

        // Local declaration or expression statement.
        let kind = if let Some(declaration) = self.try_parse_local_declaration()? {
            StmtKind::Declaration(declaration)
        } else {
            StmtKind::Expr(self.parse_expression()?)
        };
        self.expect_punct(b';')?;
        Ok(Some(Statement { kind, span }))
    }

    fn try_parse_local_declaration(&mut self) -> Result<Option<Declaration>> {
        let span = self.span();
        let (ty, name) = match self.accept_declaration(true)? {
            Some(declaration) => declaration,
            None => return Ok(None),
        };
        self.declare_variable(name, ty);
        let init = self.parse_declaration_assignment(&ty)?;
        Ok(Some(Declaration {
            name,
            ty,
            register: None,
            init,
            span,
        }))
    }

    fn parse_local_declaration(&mut self) -> Result<Declaration> {
        match self.try_parse_local_declaration()? {
            Some(declaration) => Ok(declaration),
            None => Err(self.stream.error("Expected declaration")),
        }
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn add_expr(&mut self, kind: ExprKind, ty: Type, span: Span) -> Handle<Expression> {
        self.module.expressions.append(Expression { kind, ty, span })
    }

    fn expr_ty(&self, handle: Handle<Expression>) -> Type {
        self.module.expressions[handle].ty
    }

    /// Assignment sits below every binary operator and recurses on its
    /// right operand, so `a = b = c` nests as `a = (b = c)`.
    fn parse_expression(&mut self) -> Result<Handle<Expression>> {
        let expression = self.parse_binary_expression(0)?;

        if let Some(op) = self.accept_assign() {
            let rhs = self.parse_expression()?;
            let lhs_ty = self.expr_ty(expression);
            let rhs_ty = self.expr_ty(rhs);
            self.check_type_cast(&rhs_ty, &lhs_ty)?;

            let span = self.module.expressions[expression].span;
            return Ok(self.add_expr(
                ExprKind::Binary {
                    op,
                    left: expression,
                    right: rhs,
                },
                lhs_ty,
                span,
            ));
        }

        Ok(expression)
    }

    fn accept_assign(&mut self) -> Option<BinaryOp> {
        let op = match self.stream.token() {
            Token::Punct(b'=') => BinaryOp::Assign,
            Token::PlusEqual => BinaryOp::AddAssign,
            Token::MinusEqual => BinaryOp::SubAssign,
            Token::TimesEqual => BinaryOp::MulAssign,
            Token::DivideEqual => BinaryOp::DivAssign,
            _ => return None,
        };
        self.stream.advance();
        Some(op)
    }

    fn accept_binary_operator(&mut self, priority: u32) -> Option<BinaryOp> {
        let op = match self.stream.token() {
            Token::Punct(b'+') => BinaryOp::Add,
            Token::Punct(b'-') => BinaryOp::Sub,
            Token::Punct(b'*') => BinaryOp::Mul,
            Token::Punct(b'/') => BinaryOp::Div,
            Token::Punct(b'<') => BinaryOp::Less,
            Token::Punct(b'>') => BinaryOp::Greater,
            Token::LessEqual => BinaryOp::LessEqual,
            Token::GreaterEqual => BinaryOp::GreaterEqual,
            Token::EqualEqual => BinaryOp::Equal,
            Token::NotEqual => BinaryOp::NotEqual,
            Token::AndAnd => BinaryOp::And,
            Token::OrOr => BinaryOp::Or,
            _ => return None,
        };
        let op_priority = op.priority().expect("non-assignment operator");
        if op_priority > priority {
            self.stream.advance();
            return Some(op);
        }
        None
    }

    fn accept_unary_operator(&mut self, pre: bool) -> Option<UnaryOp> {
        let op = match self.stream.token() {
            Token::PlusPlus => {
                if pre {
                    UnaryOp::PreIncrement
                } else {
                    UnaryOp::PostIncrement
                }
            }
            Token::MinusMinus => {
                if pre {
                    UnaryOp::PreDecrement
                } else {
                    UnaryOp::PostDecrement
                }
            }
            Token::Punct(b'-') if pre => UnaryOp::Negate,
            Token::Punct(b'+') if pre => UnaryOp::Positive,
            Token::Punct(b'!') if pre => UnaryOp::Not,
            _ => return None,
        };
        self.stream.advance();
        Some(op)
    }

    fn binary_op_result_type(&self, op: BinaryOp, left: &Type, right: &Type) -> Option<Type> {
        if !left.base.is_numeric() || !right.base.is_numeric() || left.array || right.array {
            return None;
        }
        let base = match op {
            BinaryOp::And
            | BinaryOp::Or
            | BinaryOp::Less
            | BinaryOp::Greater
            | BinaryOp::LessEqual
            | BinaryOp::GreaterEqual
            | BinaryOp::Equal
            | BinaryOp::NotEqual => BaseType::Bool,
            _ => binary_result_base(left.base, right.base),
        };
        if base == BaseType::Unknown {
            return None;
        }
        Some(Type::new(base))
    }

    fn parse_binary_expression(&mut self, priority: u32) -> Result<Handle<Expression>> {
        let span = self.span();
        let (mut expression, needs_end_paren) = self.parse_terminal_expression()?;

        loop {
            if let Some(op) = self.accept_binary_operator(priority) {
                let rhs = self.parse_binary_expression(op.priority().expect("binary op"))?;
                let left_ty = self.expr_ty(expression);
                let right_ty = self.expr_ty(rhs);
                let ty = self
                    .binary_op_result_type(op, &left_ty, &right_ty)
                    .ok_or_else(|| {
                        self.stream.error(format!(
                            "binary '{}' : no global operator found which takes types \
                             '{}' and '{}' (or there is no acceptable conversion)",
                            op.symbol(),
                            self.type_name(&left_ty),
                            self.type_name(&right_ty)
                        ))
                    })?;
                expression = self.add_expr(
                    ExprKind::Binary {
                        op,
                        left: expression,
                        right: rhs,
                    },
                    ty,
                    span,
                );
            } else if CONDITIONAL_PRIORITY > priority && self.accept_punct(b'?') {
                let accept = self.parse_binary_expression(CONDITIONAL_PRIORITY)?;
                self.expect_punct(b':')?;
                let reject = self.parse_binary_expression(CONDITIONAL_PRIORITY)?;

                let accept_ty = self.expr_ty(accept);
                let reject_ty = self.expr_ty(reject);
                if type_cast_rank(&accept_ty, &reject_ty) == -1 {
                    return Err(self.stream.error(format!(
                        "':' no possible conversion from '{}' to '{}'",
                        self.type_name(&reject_ty),
                        self.type_name(&accept_ty)
                    )));
                }

                expression = self.add_expr(
                    ExprKind::Conditional {
                        condition: expression,
                        accept,
                        reject,
                    },
                    accept_ty,
                    span,
                );
            } else {
                break;
            }
        }

        if needs_end_paren {
            self.expect_punct(b')')?;
        }
        Ok(expression)
    }

    fn parse_partial_constructor(
        &mut self,
        span: Span,
        base: BaseType,
        type_name: Option<Symbol>,
    ) -> Result<Handle<Expression>> {
        let args = self.parse_expression_list(Token::Punct(b')'), false)?;
        let ty = Type {
            base,
            name: type_name,
            array: false,
            array_size: None,
            constant: true,
        };
        Ok(self.add_expr(ExprKind::Constructor { args }, ty, span))
    }

    fn parse_expression_list(
        &mut self,
        end: Token,
        allow_empty_end: bool,
    ) -> Result<Vec<Handle<Expression>>> {
        let mut expressions = Vec::new();
        while !self.accept(end) {
            self.check_eos(end)?;
            if !expressions.is_empty() {
                self.expect_punct(b',')?;
            }
            // A trailing comma before the closing brace is allowed in
            // array initializer lists.
            if allow_empty_end && self.accept(end) {
                break;
            }
            expressions.push(self.parse_expression()?);
        }
        Ok(expressions)
    }

    /// Parses a terminal plus its postfix chain. The flag reports that
    /// the caller owes a closing `)` (the `(float2(…))` form).
    fn parse_terminal_expression(&mut self) -> Result<(Handle<Expression>, bool)> {
        let span = self.span();

        if let Some(op) = self.accept_unary_operator(true) {
            let (operand, needs_end_paren) = self.parse_terminal_expression()?;
            let ty = if op == UnaryOp::Not {
                Type::new(BaseType::Bool)
            } else {
                self.expr_ty(operand)
            };
            let expression = self.add_expr(ExprKind::Unary { op, expr: operand }, ty, span);
            return Ok((expression, needs_end_paren));
        }

        // Parenthesized expressions and casts.
        if self.accept_punct(b'(') {
            if let Some((base, type_name, constant)) = self.accept_type(false, true) {
                if self.accept_punct(b'(') {
                    // A parenthesized constructor: (float2(…)).
                    let expression = self.parse_partial_constructor(span, base, type_name)?;
                    return Ok((expression, true));
                }
                // A cast: (T)expr. Binds the whole trailing expression.
                self.expect_punct(b')')?;
                let ty = Type {
                    base,
                    name: type_name,
                    array: false,
                    array_size: None,
                    constant,
                };
                let inner = self.parse_expression()?;
                let expression = self.add_expr(ExprKind::Cast { expr: inner }, ty, span);
                return Ok((expression, false));
            }
            let expression = self.parse_expression()?;
            self.expect_punct(b')')?;
            // Fall through to the postfix chain so that (expr).field
            // and (expr)[index] parse.
            return Ok((self.parse_postfix(expression, span)?, false));
        }

        // Literals.
        if let Token::FloatLiteral(value) = self.stream.token() {
            self.stream.advance();
            let ty = Type::new(BaseType::Float).as_const();
            return Ok((self.add_expr(ExprKind::Literal(Literal::Float(value)), ty, span), false));
        }
        if let Token::IntLiteral(value) = self.stream.token() {
            self.stream.advance();
            let ty = Type::new(BaseType::Int).as_const();
            return Ok((self.add_expr(ExprKind::Literal(Literal::Int(value)), ty, span), false));
        }
        if self.accept(Token::True) {
            let ty = Type::new(BaseType::Bool).as_const();
            return Ok((self.add_expr(ExprKind::Literal(Literal::Bool(true)), ty, span), false));
        }
        if self.accept(Token::False) {
            let ty = Type::new(BaseType::Bool).as_const();
            return Ok((self.add_expr(ExprKind::Literal(Literal::Bool(false)), ty, span), false));
        }

        let expression = if let Some((base, type_name, _)) = self.accept_type(false, false) {
            // A type constructor: float2(…).
            self.expect_punct(b'(')?;
            self.parse_partial_constructor(span, base, type_name)?
        } else {
            let name = self.expect_identifier()?;
            if let Some((ty, global)) = self.find_variable(name) {
                self.add_expr(ExprKind::Ident { name, global }, ty, span)
            } else if self.is_function(name) {
                if self.stream.token() != Token::Punct(b'(') {
                    return Err(self.stream.error(format!(
                        "Undeclared identifier '{}'",
                        self.interner.resolve(name)
                    )));
                }
                // The callee of the call parsed just below; functions
                // are always global scope.
                self.add_expr(
                    ExprKind::Ident { name, global: true },
                    Type::new(BaseType::Unknown),
                    span,
                )
            } else {
                return Err(self.stream.error(format!(
                    "Undeclared identifier '{}'",
                    self.interner.resolve(name)
                )));
            }
        };

        Ok((self.parse_postfix(expression, span)?, false))
    }

    /// Postfix operators: `x++`, `.field`, `[index]`, and calls.
    fn parse_postfix(
        &mut self,
        mut expression: Handle<Expression>,
        span: Span,
    ) -> Result<Handle<Expression>> {
        loop {
            let mut progressed = false;

            while let Some(op) = self.accept_unary_operator(false) {
                let ty = self.expr_ty(expression);
                expression = self.add_expr(
                    ExprKind::Unary {
                        op,
                        expr: expression,
                    },
                    ty,
                    span,
                );
                progressed = true;
            }

            while self.accept_punct(b'.') {
                let field = self.expect_identifier()?;
                let object_ty = self.expr_ty(expression);
                let ty = self.member_type(&object_ty, field)?;
                expression = self.add_expr(
                    ExprKind::Member {
                        object: expression,
                        field,
                    },
                    ty,
                    span,
                );
                progressed = true;
            }

            while self.accept_punct(b'[') {
                let index = self.parse_expression()?;
                self.expect_punct(b']')?;
                let ty = self.index_type(&self.expr_ty(expression))?;
                expression = self.add_expr(
                    ExprKind::Index {
                        object: expression,
                        index,
                    },
                    ty,
                    span,
                );
                progressed = true;
            }

            if self.accept_punct(b'(') {
                let args = self.parse_expression_list(Token::Punct(b')'), false)?;

                let name = match self.module.expressions[expression].kind {
                    ExprKind::Ident { name, .. } => name,
                    _ => return Err(self.stream.error("Expected function identifier")),
                };

                let (callee, ty) = self.match_function_call(&args, name)?;
                expression = self.add_expr(ExprKind::Call { callee, args }, ty, span);
                progressed = true;
            }

            if !progressed {
                return Ok(expression);
            }
        }
    }

    // -----------------------------------------------------------------
    // Member, index, and call typing
    // -----------------------------------------------------------------

    fn member_type(&self, object_ty: &Type, field: Symbol) -> Result<Type> {
        let field_text = self.interner.resolve(field);
        let cannot_access = || {
            self.stream
                .error(format!("Couldn't access '{field_text}'"))
        };

        if object_ty.base == BaseType::UserDefined {
            let name = object_ty.name.ok_or_else(cannot_access)?;
            let structure = self.module.find_struct(name).ok_or_else(cannot_access)?;
            return structure
                .field(field)
                .map(|f| f.ty)
                .ok_or_else(cannot_access);
        }

        let desc = object_ty.base.desc();
        let kind = desc.kind.ok_or_else(cannot_access)?;

        let swizzle_length = if desc.dimensions <= 1 {
            // Swizzle on a scalar or vector.
            for c in field_text.bytes() {
                if !matches!(c, b'x' | b'y' | b'z' | b'w' | b'r' | b'g' | b'b' | b'a') {
                    return Err(self
                        .stream
                        .error(format!("Invalid swizzle '{field_text}'")));
                }
            }
            field_text.len()
        } else {
            // Matrix element access: a chain of `_mRC` (zero-based) or
            // `_RC` (one-based) pairs.
            let bytes = field_text.as_bytes();
            let mut i = 0usize;
            let mut length = 0usize;
            while bytes.get(i) == Some(&b'_') {
                i += 1;
                let base = if bytes.get(i) == Some(&b'm') {
                    i += 1;
                    b'0'
                } else {
                    b'1'
                };
                let (row, column) = match (bytes.get(i), bytes.get(i + 1)) {
                    (Some(r), Some(c)) if r.is_ascii_digit() && c.is_ascii_digit() => {
                        (*r as i32 - base as i32, *c as i32 - base as i32)
                    }
                    _ => return Err(cannot_access()),
                };
                if row < 0
                    || column < 0
                    || row >= desc.height as i32
                    || column >= desc.components as i32
                {
                    return Err(cannot_access());
                }
                length += 1;
                i += 2;
            }
            if i != bytes.len() || length == 0 {
                return Err(cannot_access());
            }
            length
        };

        if swizzle_length > 4 {
            return Err(self
                .stream
                .error(format!("Invalid swizzle '{field_text}'")));
        }

        match kind {
            NumericKind::Float | NumericKind::Half | NumericKind::Int | NumericKind::Uint => {
                Ok(Type::new(BaseType::vector_of(kind, swizzle_length as u8)))
            }
            NumericKind::Bool => Err(cannot_access()),
        }
    }

    fn index_type(&self, object_ty: &Type) -> Result<Type> {
        if object_ty.array {
            return Ok(Type {
                array: false,
                array_size: None,
                ..*object_ty
            });
        }
        use BaseType::*;
        let base = match object_ty.base {
            Float2 | Float3 | Float4 => Float,
            Float3x3 => Float3,
            Float4x4 => Float4,
            Half2 | Half3 | Half4 => Half,
            Half3x3 => Half3,
            Half4x4 => Half4,
            Int2 | Int3 | Int4 => Int,
            Uint2 | Uint3 | Uint4 => Uint,
            _ => {
                return Err(self.stream.error(
                    "array, matrix, vector, or indexable object type expected in index expression",
                ))
            }
        };
        Ok(Type::new(base))
    }

    fn match_function_call(
        &self,
        args: &[Handle<Expression>],
        name: Symbol,
    ) -> Result<(Callee, Type)> {
        let arg_types: Vec<Type> = args.iter().map(|&a| self.expr_ty(a)).collect();
        let name_text = self.interner.resolve(name);

        let mut matched: Option<(Callee, Signature)> = None;
        let mut num_matched = 0usize;
        let mut name_matches = false;

        fn consider<'a>(
            matched: &mut Option<(Callee, Signature<'a>)>,
            num_matched: &mut usize,
            name_matches: &mut bool,
            arg_types: &[Type],
            candidate_callee: Callee,
            candidate: Signature<'a>,
        ) {
            *name_matches = true;
            let current = matched.as_ref().map(|(_, s)| s);
            match compare_candidates(arg_types, &candidate, current) {
                Comparison::FirstBetter => {
                    *matched = Some((candidate_callee, candidate));
                    *num_matched = 1;
                }
                Comparison::Equal => *num_matched += 1,
                Comparison::SecondBetter => {}
            }
        }

        for (handle, function) in self.module.functions.iter() {
            if function.name == name {
                consider(
                    &mut matched,
                    &mut num_matched,
                    &mut name_matches,
                    &arg_types,
                    Callee::User(handle),
                    Signature::User(function),
                );
            }
        }
        for (index, intrinsic) in intrinsics().iter().enumerate() {
            if intrinsic.name == name_text {
                consider(
                    &mut matched,
                    &mut num_matched,
                    &mut name_matches,
                    &arg_types,
                    Callee::Intrinsic(index),
                    Signature::Intrinsic(intrinsic),
                );
            }
        }

        match matched {
            Some(_) if num_matched > 1 => Err(self.stream.error(format!(
                "'{name_text}' {num_matched} overloads have similar conversions"
            ))),
            Some((callee, _)) => {
                log::debug!("resolved call to '{name_text}' with {} arguments", args.len());
                let return_type = match callee {
                    Callee::User(handle) => self.module.functions[handle].return_type,
                    Callee::Intrinsic(index) => Type::new(intrinsics()[index].return_type),
                };
                Ok((callee, return_type))
            }
            None if name_matches => Err(self.stream.error(format!(
                "'{name_text}' no overloaded function matched all of the arguments"
            ))),
            None => Err(self
                .stream
                .error(format!("Undeclared identifier '{name_text}'"))),
        }
    }
}
