//! The GLSL emitter.

use hxsl_ast::{
    ArgumentModifier, BaseType, BinaryOp, Buffer, Callee, Declaration, ExprKind, Expression,
    Function, Handle, Initializer, Literal, Module, Span, Statement, StmtKind, StructDecl, Symbol,
    Type, UnaryOp,
};
use hxsl_backend_core::{format_float, BackendError, BackendOptions, CodeWriter, ShaderStage};

/// Semantics that map to GLSL built-in variables.
const BUILT_IN_SEMANTICS: [(&str, &str); 2] = [
    ("SV_POSITION", "gl_Position"),
    ("DEPTH", "gl_FragDepth"),
];

/// Reserved words in GLSL that are ordinary identifiers in HLSL.
const RESERVED_WORDS: [&str; 4] = ["output", "input", "mod", "mix"];

const BOOL_TYPE: Type = Type {
    base: BaseType::Bool,
    name: None,
    array: false,
    array_size: None,
    constant: false,
};

fn built_in_semantic(semantic: &str) -> Option<&'static str> {
    BUILT_IN_SEMANTICS
        .iter()
        .find(|(hlsl, _)| semantic.eq_ignore_ascii_case(hlsl))
        .map(|(_, glsl)| *glsl)
}

fn type_name<'m>(module: &'m Module, ty: &Type) -> &'m str {
    use BaseType::*;
    match ty.base {
        Void => "void",
        Float | Half => "float",
        Float2 | Half2 => "vec2",
        Float3 | Half3 => "vec3",
        Float4 | Half4 => "vec4",
        Float3x3 | Half3x3 => "mat3",
        Float4x4 | Half4x4 => "mat4",
        Bool => "bool",
        Int => "int",
        Int2 => "ivec2",
        Int3 => "ivec3",
        Int4 => "ivec4",
        Uint => "uint",
        Uint2 => "uvec2",
        Uint3 => "uvec3",
        Uint4 => "uvec4",
        Texture => "texture",
        Sampler2D => "sampler2D",
        SamplerCube => "samplerCube",
        UserDefined => match ty.name {
            Some(name) => module.name(name),
            None => "?",
        },
        Unknown => "?",
    }
}

/// An implicit cast is needed only when the base types differ.
fn can_implicit_cast(src: &Type, dst: &Type) -> bool {
    src.base == dst.base
}

fn is_matrix(base: BaseType) -> bool {
    matches!(
        base,
        BaseType::Float3x3 | BaseType::Float4x4 | BaseType::Half3x3 | BaseType::Half4x4
    )
}

/// Picks `base0`..`base1023`, returning the first name absent from the
/// module's string pool. The pool holds every identifier the parser
/// saw, so the result cannot collide with a user symbol.
fn unique_name(module: &Module, base: &str) -> Result<String, BackendError> {
    for i in 0..1024 {
        let candidate = format!("{base}{i}");
        if !module.interner.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(BackendError::Other(format!(
        "couldn't find a unique name for '{base}'"
    )))
}

pub(crate) struct GlslEmitter<'a> {
    module: &'a Module,
    stage: ShaderStage,
    entry_name: &'a str,
    writer: CodeWriter,
    in_prefix: &'static str,
    out_prefix: &'static str,
    matrix_row_fn: String,
    clip_fn: String,
    tex2dlod_fn: String,
    texcubebias_fn: String,
    scalar_swizzle_fns: [String; 3],
    sincos_fn: String,
    reserved: Vec<(&'static str, String)>,
    output_position: bool,
}

impl<'a> GlslEmitter<'a> {
    pub(crate) fn new(module: &'a Module, opts: &'a BackendOptions) -> Self {
        let (in_prefix, out_prefix) = match opts.stage {
            ShaderStage::Vertex => ("", "frag_"),
            ShaderStage::Fragment => ("frag_", "rast_"),
        };
        Self {
            module,
            stage: opts.stage,
            entry_name: &opts.entry_point,
            writer: CodeWriter::new(true),
            in_prefix,
            out_prefix,
            matrix_row_fn: String::new(),
            clip_fn: String::new(),
            tex2dlod_fn: String::new(),
            texcubebias_fn: String::new(),
            scalar_swizzle_fns: Default::default(),
            sincos_fn: String::new(),
            reserved: Vec::new(),
            output_position: false,
        }
    }

    pub(crate) fn run(mut self) -> Result<String, BackendError> {
        let module = self.module;
        let entry = module.find_function(self.entry_name).ok_or_else(|| {
            BackendError::Other(format!("Entry point '{}' doesn't exist", self.entry_name))
        })?;

        let uses_clip = module.interner.contains("clip");
        let uses_tex2dlod = module.interner.contains("tex2Dlod");
        let uses_texcubebias = module.interner.contains("texCUBEbias");
        let uses_sincos = module.interner.contains("sincos");

        self.matrix_row_fn = unique_name(module, "matrix_row")?;
        self.clip_fn = unique_name(module, "clip")?;
        self.tex2dlod_fn = unique_name(module, "tex2Dlod")?;
        self.texcubebias_fn = unique_name(module, "texCUBEbias")?;
        for word in RESERVED_WORDS {
            let replacement = unique_name(module, word)?;
            self.reserved.push((word, replacement));
        }
        for (i, slot) in self.scalar_swizzle_fns.iter_mut().enumerate() {
            *slot = unique_name(module, &format!("scalar_swizzle{}", i + 2))?;
        }
        self.sincos_fn = unique_name(module, "sincos")?;

        self.writer.write_line(0, "#version 140");

        // Pragmas for NVIDIA.
        self.writer.write_line(0, "#pragma optionNV(fastmath on)");
        self.writer.write_line(0, "#pragma optionNV(ifcvt none)");
        self.writer.write_line(0, "#pragma optionNV(inline all)");
        self.writer.write_line(0, "#pragma optionNV(strict on)");
        self.writer.write_line(0, "#pragma optionNV(unroll all)");

        self.emit_helpers(uses_clip, uses_tex2dlod, uses_texcubebias, uses_sincos);
        self.emit_attributes(entry);

        for &top in &module.order {
            match top {
                hxsl_ast::TopLevel::Struct(handle) => self.emit_struct(&module.structs[handle])?,
                hxsl_ast::TopLevel::Buffer(handle) => self.emit_buffer(&module.buffers[handle])?,
                hxsl_ast::TopLevel::Global(handle) => self.emit_global(&module.globals[handle])?,
                hxsl_ast::TopLevel::Function(handle) => {
                    self.emit_function(&module.functions[handle])?
                }
            }
        }

        self.emit_entry_caller(entry)?;

        // The GLSL compilers don't check for this, so produce our own
        // diagnostic.
        if self.stage == ShaderStage::Vertex && !self.output_position {
            return Err(BackendError::Other(
                "Vertex shader must output a position".into(),
            ));
        }

        Ok(self.writer.finish())
    }

    fn emit_helpers(&mut self, clip: bool, tex2dlod: bool, texcubebias: bool, sincos: bool) {
        // Row access: HLSL indexes matrix rows, GLSL indexes columns.
        let row = self.matrix_row_fn.clone();
        self.writer.write_line(
            0,
            &format!("vec3 {row}(mat3 m, int i) {{ return vec3( m[0][i], m[1][i], m[2][i] ); }}"),
        );
        self.writer.write_line(
            0,
            &format!(
                "vec4 {row}(mat4 m, int i) {{ return vec4( m[0][i], m[1][i], m[2][i], m[3][i] ); }}"
            ),
        );

        if clip {
            // clip() discards in fragment shaders and is a no-op in
            // vertex shaders.
            let discard = match self.stage {
                ShaderStage::Fragment => "discard",
                ShaderStage::Vertex => "",
            };
            let name = self.clip_fn.clone();
            self.writer.write_line(
                0,
                &format!("void {name}(float x) {{ if (x < 0.0) {discard}; }}"),
            );
            for n in 2..=4 {
                self.writer.write_line(
                    0,
                    &format!(
                        "void {name}(vec{n} x) {{ if (any(lessThan(x, vec{n}(0.0)))) {discard}; }}"
                    ),
                );
            }
        }

        if tex2dlod {
            let name = self.tex2dlod_fn.clone();
            self.writer.write_line(
                0,
                &format!("vec4 {name}(sampler2D s, vec4 texCoord) {{ return textureLod(s, texCoord.xy, texCoord.w); }}"),
            );
        }

        if texcubebias {
            let name = self.texcubebias_fn.clone();
            let line = match self.stage {
                ShaderStage::Fragment => format!(
                    "vec4 {name}(samplerCube s, vec4 texCoord) {{ return texture(s, texCoord.xyz, texCoord.w); }}"
                ),
                // The bias argument is not supported in vertex shaders.
                ShaderStage::Vertex => format!(
                    "vec4 {name}(samplerCube s, vec4 texCoord) {{ return texture(s, texCoord.xyz); }}"
                ),
            };
            self.writer.write_line(0, &line);
        }

        for i in 0..self.scalar_swizzle_fns.len() {
            let name = self.scalar_swizzle_fns[i].clone();
            let n = i + 2;
            let args = ["x"; 4][..n].join(", ");
            self.writer.write_line(
                0,
                &format!("vec{n} {name}(float x) {{ return vec{n}({args}); }}"),
            );
            self.writer.write_line(
                0,
                &format!("ivec{n} {name}(int x) {{ return ivec{n}({args}); }}"),
            );
            self.writer.write_line(
                0,
                &format!("uvec{n} {name}(uint x) {{ return uvec{n}({args}); }}"),
            );
        }

        if sincos {
            let name = self.sincos_fn.clone();
            for ty in ["float", "vec2", "vec3", "vec4"] {
                self.writer.write_line(
                    0,
                    &format!(
                        "void {name}({ty} x, out {ty} s, out {ty} c) {{ s = sin(x); c = cos(x); }}"
                    ),
                );
            }
        }
    }

    // -----------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------

    fn safe_name(&self, name: &'a str) -> &str {
        for (word, replacement) in &self.reserved {
            if *word == name {
                return replacement;
            }
        }
        name
    }

    fn loc(&self, span: Span) -> (&'a str, u32) {
        (self.module.name(span.file), span.line)
    }

    /// Writes an identifier, remapping renamed intrinsics and reserved
    /// words.
    fn emit_identifier(&mut self, name: &'a str) {
        let replaced: String = match name {
            "tex2D" => "texture".into(),
            "tex2Dproj" => "texture2DProj".into(),
            "texCUBE" => "texture".into(),
            "atan2" => "atan".into(),
            "lerp" => "mix".into(),
            // mod differs from fmod for negative operands; the faster
            // mod form is used deliberately.
            "fmod" => "mod".into(),
            "clip" => self.clip_fn.clone(),
            "tex2Dlod" => self.tex2dlod_fn.clone(),
            "texCUBEbias" => self.texcubebias_fn.clone(),
            "sincos" => self.sincos_fn.clone(),
            other => self.safe_name(other).to_string(),
        };
        self.writer.write(&replaced);
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn emit_expression(
        &mut self,
        handle: Handle<Expression>,
        dst: Option<&Type>,
    ) -> Result<(), BackendError> {
        let module = self.module;
        let expression: &'a Expression = &module.expressions[handle];

        // Wrap in a constructor cast when the expression's type doesn't
        // match the destination and the expression isn't already a
        // cast.
        let cast = match dst {
            Some(dst_ty) => {
                !can_implicit_cast(&expression.ty, dst_ty)
                    && !matches!(expression.kind, ExprKind::Cast { .. })
            }
            None => false,
        };
        if cast {
            let name = type_name(module, dst.expect("cast implies dst")).to_string();
            self.writer.write(&name);
            self.writer.write("(");
        }

        match &expression.kind {
            ExprKind::Ident { name, .. } => {
                self.emit_identifier(module.name(*name));
            }
            ExprKind::Constructor { args } => {
                let name = type_name(module, &expression.ty).to_string();
                self.writer.write(&name);
                self.writer.write("(");
                self.emit_expression_list(args, None)?;
                self.writer.write(")");
            }
            ExprKind::Cast { expr } => {
                let name = type_name(module, &expression.ty).to_string();
                self.writer.write(&name);
                self.writer.write("(");
                self.emit_expression(*expr, None)?;
                self.writer.write(")");
            }
            ExprKind::Literal(literal) => match literal {
                Literal::Float(value) => self.writer.write(&format_float(*value)),
                Literal::Int(value) => self.writer.write(&value.to_string()),
                Literal::Bool(value) => self.writer.write(if *value { "true" } else { "false" }),
            },
            ExprKind::Unary { op, expr } => {
                let (text, pre) = match op {
                    UnaryOp::Negate => ("-", true),
                    UnaryOp::Positive => ("+", true),
                    UnaryOp::Not => ("!", true),
                    UnaryOp::PreIncrement => ("++", true),
                    UnaryOp::PreDecrement => ("--", true),
                    UnaryOp::PostIncrement => ("++", false),
                    UnaryOp::PostDecrement => ("--", false),
                };
                // `!` needs its operand coerced to bool.
                let operand_dst = if *op == UnaryOp::Not {
                    Some(expression.ty)
                } else {
                    None
                };
                self.writer.write("(");
                if pre {
                    self.writer.write(text);
                    self.emit_expression(*expr, operand_dst.as_ref())?;
                } else {
                    self.emit_expression(*expr, operand_dst.as_ref())?;
                    self.writer.write(text);
                }
                self.writer.write(")");
            }
            ExprKind::Binary { op, left, right } => {
                let result_ty = expression.ty;
                // Destination hints: additive and logical operators
                // coerce both sides to the result type, assignments
                // coerce the right side to the left's type.
                let (dst1, dst2) = match op {
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::And | BinaryOp::Or => {
                        (Some(result_ty), Some(result_ty))
                    }
                    BinaryOp::Assign
                    | BinaryOp::AddAssign
                    | BinaryOp::SubAssign
                    | BinaryOp::MulAssign
                    | BinaryOp::DivAssign => (None, Some(result_ty)),
                    _ => (None, None),
                };
                self.writer.write("(");
                self.emit_expression(*left, dst1.as_ref())?;
                self.writer.write(&format!(" {} ", op.symbol()));
                self.emit_expression(*right, dst2.as_ref())?;
                self.writer.write(")");
            }
            ExprKind::Conditional {
                condition,
                accept,
                reject,
            } => {
                self.writer.write("((");
                self.emit_expression(*condition, Some(&BOOL_TYPE))?;
                self.writer.write(")?(");
                self.emit_expression(*accept, None)?;
                self.writer.write("):(");
                self.emit_expression(*reject, None)?;
                self.writer.write("))");
            }
            ExprKind::Member { object, field } => {
                self.emit_member_access(*object, *field)?;
            }
            ExprKind::Index { object, index } => {
                let object_ty = module.expressions[*object].ty;
                if !object_ty.array && is_matrix(object_ty.base) {
                    // GLSL indexes matrices as m[column][row] while
                    // HLSL row-indexes, so go through the helper.
                    let name = self.matrix_row_fn.clone();
                    self.writer.write(&name);
                    self.writer.write("(");
                    self.emit_expression(*object, None)?;
                    self.writer.write(",");
                    self.emit_expression(*index, None)?;
                    self.writer.write(")");
                } else {
                    self.emit_expression(*object, None)?;
                    self.writer.write("[");
                    self.emit_expression(*index, None)?;
                    self.writer.write("]");
                }
            }
            ExprKind::Call { callee, args } => {
                self.emit_call(*callee, args)?;
            }
        }

        if cast {
            self.writer.write(")");
        }
        Ok(())
    }

    fn emit_member_access(
        &mut self,
        object: Handle<Expression>,
        field: Symbol,
    ) -> Result<(), BackendError> {
        let module = self.module;
        let object_ty = module.expressions[object].ty;
        let field_text: &'a str = module.name(field);

        if matches!(
            object_ty.base,
            BaseType::Float | BaseType::Half | BaseType::Int | BaseType::Uint
        ) {
            // Swizzling a scalar goes through the replication helpers;
            // a single-component swizzle is the scalar itself.
            if let 2..=4 = field_text.len() {
                let name = self.scalar_swizzle_fns[field_text.len() - 2].clone();
                self.writer.write(&name);
            }
            self.writer.write("(");
            self.emit_expression(object, None)?;
            self.writer.write(")");
            return Ok(());
        }

        self.writer.write("(");
        self.emit_expression(object, None)?;
        self.writer.write(")");

        if is_matrix(object_ty.base) {
            // HLSL matrix element selection; swap to GLSL's
            // column-major indexing.
            let bytes = field_text.as_bytes();
            let mut i = 0usize;
            while i < bytes.len() && bytes[i] == b'_' {
                i += 1;
                let base = if bytes.get(i) == Some(&b'm') {
                    i += 1;
                    b'0'
                } else {
                    b'1'
                };
                match (bytes.get(i), bytes.get(i + 1)) {
                    (Some(&r), Some(&c)) if r.is_ascii_digit() && c.is_ascii_digit() => {
                        self.writer.write(&format!("[{}][{}]", c - base, r - base));
                        i += 2;
                    }
                    _ => {
                        return Err(BackendError::Other(format!(
                            "malformed matrix accessor '{field_text}'"
                        )))
                    }
                }
            }
        } else {
            self.writer.write(&format!(".{field_text}"));
        }
        Ok(())
    }

    fn emit_call(
        &mut self,
        callee: Callee,
        args: &[Handle<Expression>],
    ) -> Result<(), BackendError> {
        let module = self.module;
        let name: &'a str = module.callee_name(callee);

        if name == "mul" {
            if args.len() != 2 {
                return Err(BackendError::Other("mul expects 2 arguments".into()));
            }
            // mul(a, b) is plain multiplication in GLSL, with each
            // operand cast to the parameter type of the matched
            // overload.
            let dst0 = module.callee_arg_type(callee, 0);
            let dst1 = module.callee_arg_type(callee, 1);
            self.writer.write("((");
            self.emit_expression(args[0], Some(&dst0))?;
            self.writer.write(") * (");
            self.emit_expression(args[1], Some(&dst1))?;
            self.writer.write("))");
            return Ok(());
        }

        if name == "saturate" {
            if args.len() != 1 {
                return Err(BackendError::Other("saturate expects 1 argument".into()));
            }
            self.writer.write("clamp(");
            self.emit_expression(args[0], None)?;
            self.writer.write(", 0.0, 1.0)");
            return Ok(());
        }

        log::debug!("emitting call to '{name}'");
        self.emit_identifier(name);
        self.writer.write("(");
        self.emit_expression_list(args, Some(callee))?;
        self.writer.write(")");
        Ok(())
    }

    /// Emits a comma-separated list; with a callee, each argument is
    /// hinted with the matching parameter type.
    fn emit_expression_list(
        &mut self,
        expressions: &[Handle<Expression>],
        callee: Option<Callee>,
    ) -> Result<(), BackendError> {
        for (index, &expression) in expressions.iter().enumerate() {
            if index > 0 {
                self.writer.write(", ");
            }
            let dst = callee.map(|c| self.module.callee_arg_type(c, index));
            self.emit_expression(expression, dst.as_ref())?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Declarations and statements
    // -----------------------------------------------------------------

    fn emit_type_and_name(&mut self, ty: &Type, name: &'a str) -> Result<(), BackendError> {
        let type_text = type_name(self.module, ty).to_string();
        let safe = self.safe_name(name).to_string();
        if !ty.array {
            self.writer.write(&format!("{type_text} {safe}"));
        } else {
            self.writer.write(&format!("{type_text} {safe}["));
            if let Some(size) = ty.array_size {
                self.emit_expression(size, None)?;
            }
            self.writer.write("]");
        }
        Ok(())
    }

    fn emit_declaration(&mut self, declaration: &'a Declaration) -> Result<(), BackendError> {
        let module = self.module;
        self.emit_type_and_name(&declaration.ty, module.name(declaration.name))?;
        match &declaration.init {
            Some(Initializer::Expr(expr)) => {
                self.writer.write(" = ");
                self.emit_expression(*expr, Some(&declaration.ty))?;
            }
            Some(Initializer::List(values)) => {
                let type_text = type_name(module, &declaration.ty).to_string();
                self.writer.write(&format!(" = {type_text}[]( "));
                self.emit_expression_list(values, None)?;
                self.writer.write(" )");
            }
            None => {}
        }
        Ok(())
    }

    fn emit_global(&mut self, declaration: &'a Declaration) -> Result<(), BackendError> {
        // GLSL has no standalone texture uniforms.
        if declaration.ty.base == BaseType::Texture {
            return Ok(());
        }
        let (file, line) = self.loc(declaration.span);
        self.writer.begin_line(0, Some((file, line)));
        self.writer.write("uniform ");
        self.emit_declaration(declaration)?;
        self.writer.end_line(";");
        Ok(())
    }

    fn emit_struct(&mut self, structure: &'a StructDecl) -> Result<(), BackendError> {
        let module = self.module;
        let name = module.name(structure.name);
        self.writer.write_line(0, &format!("struct {name} {{"));
        for field in &structure.fields {
            let (file, line) = self.loc(field.span);
            self.writer.begin_line(1, Some((file, line)));
            self.emit_type_and_name(&field.ty, module.name(field.name))?;
            self.writer.end_line(";");
        }
        self.writer.write_line(0, "};");
        Ok(())
    }

    fn emit_buffer(&mut self, buffer: &'a Buffer) -> Result<(), BackendError> {
        let module = self.module;
        // Empty uniform blocks are rejected by NVIDIA's compiler, so
        // don't emit them at all.
        if buffer.fields.is_empty() {
            return Ok(());
        }
        let name = buffer.name.map(|n| module.name(n)).unwrap_or_default();
        let (file, line) = self.loc(buffer.span);
        self.writer
            .write_line_at(0, file, line, &format!("layout (std140) uniform {name} {{"));
        for field in &buffer.fields {
            let (file, line) = self.loc(field.span);
            self.writer.begin_line(1, Some((file, line)));
            self.emit_type_and_name(&field.ty, module.name(field.name))?;
            self.writer.end_line(";");
        }
        self.writer.write_line(0, "};");
        Ok(())
    }

    fn emit_function(&mut self, function: &'a Function) -> Result<(), BackendError> {
        let module = self.module;
        let name = self.safe_name(module.name(function.name)).to_string();
        let return_type = type_name(module, &function.return_type).to_string();
        let (file, line) = self.loc(function.span);

        self.writer.begin_line(0, Some((file, line)));
        self.writer.write(&format!("{return_type} {name}("));
        for (index, argument) in function.arguments.iter().enumerate() {
            if index > 0 {
                self.writer.write(", ");
            }
            match argument.modifier {
                ArgumentModifier::In => self.writer.write("in "),
                ArgumentModifier::Inout => self.writer.write("inout "),
                _ => {}
            }
            self.emit_type_and_name(&argument.ty, module.name(argument.name))?;
        }
        self.writer.write(") {");
        self.writer.end_line("");

        self.emit_statements(1, &function.body, Some(&function.return_type))?;
        self.writer.write_line(0, "}");
        Ok(())
    }

    fn emit_statements(
        &mut self,
        indent: usize,
        statements: &'a [Statement],
        return_type: Option<&Type>,
    ) -> Result<(), BackendError> {
        for statement in statements {
            self.emit_statement(indent, statement, return_type)?;
        }
        Ok(())
    }

    fn emit_statement(
        &mut self,
        indent: usize,
        statement: &'a Statement,
        return_type: Option<&Type>,
    ) -> Result<(), BackendError> {
        let (file, line) = self.loc(statement.span);

        match &statement.kind {
            StmtKind::Declaration(declaration) => {
                if declaration.ty.base == BaseType::Texture {
                    return Ok(());
                }
                self.writer.begin_line(indent, Some((file, line)));
                self.emit_declaration(declaration)?;
                self.writer.end_line(";");
            }
            StmtKind::Expr(expression) => {
                self.writer.begin_line(indent, Some((file, line)));
                self.emit_expression(*expression, None)?;
                self.writer.end_line(";");
            }
            StmtKind::Return(Some(expression)) => {
                self.writer.begin_line(indent, Some((file, line)));
                self.writer.write("return ");
                self.emit_expression(*expression, return_type)?;
                self.writer.end_line(";");
            }
            StmtKind::Return(None) => {
                self.writer.write_line_at(indent, file, line, "return;");
            }
            StmtKind::Discard => {
                // discard doesn't exist in vertex shaders.
                if self.stage == ShaderStage::Fragment {
                    self.writer.write_line_at(indent, file, line, "discard;");
                }
            }
            StmtKind::Break => {
                self.writer.write_line_at(indent, file, line, "break;");
            }
            StmtKind::Continue => {
                self.writer.write_line_at(indent, file, line, "continue;");
            }
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => {
                self.writer.begin_line(indent, Some((file, line)));
                self.writer.write("if (");
                self.emit_expression(*condition, Some(&BOOL_TYPE))?;
                self.writer.write(") {");
                self.writer.end_line("");
                self.emit_statements(indent + 1, then_block, return_type)?;
                self.writer.write_line(indent, "}");
                if !else_block.is_empty() {
                    self.writer.write_line(indent, "else {");
                    self.emit_statements(indent + 1, else_block, return_type)?;
                    self.writer.write_line(indent, "}");
                }
            }
            StmtKind::For {
                init,
                condition,
                increment,
                body,
            } => {
                self.writer.begin_line(indent, Some((file, line)));
                self.writer.write("for (");
                if let Some(init) = init {
                    self.emit_declaration(init)?;
                }
                self.writer.write("; ");
                if let Some(condition) = condition {
                    self.emit_expression(*condition, Some(&BOOL_TYPE))?;
                }
                self.writer.write("; ");
                if let Some(increment) = increment {
                    self.emit_expression(*increment, None)?;
                }
                self.writer.write(") {");
                self.writer.end_line("");
                self.emit_statements(indent + 1, body, return_type)?;
                self.writer.write_line(indent, "}");
            }
            StmtKind::Block(block) => {
                self.writer.write_line_at(indent, file, line, "{");
                self.emit_statements(indent + 1, block, return_type)?;
                self.writer.write_line(indent, "}");
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Entry point plumbing
    // -----------------------------------------------------------------

    fn emit_attribute(
        &mut self,
        ty: &Type,
        semantic: Option<Symbol>,
        attr_type: &str,
        prefix: &str,
    ) {
        let module = self.module;
        if ty.base == BaseType::UserDefined {
            // A struct parameter contributes one attribute per
            // semantic-bearing field.
            let Some(structure) = ty.name.and_then(|n| module.find_struct(n)) else {
                return;
            };
            for field in &structure.fields {
                let Some(semantic) = field.semantic else {
                    continue;
                };
                let semantic_text = module.name(semantic);
                if built_in_semantic(semantic_text).is_some() {
                    continue;
                }
                let type_text = type_name(module, &field.ty);
                self.writer.write_line(
                    0,
                    &format!("{attr_type} {type_text} {prefix}{semantic_text};"),
                );
            }
        } else if let Some(semantic) = semantic {
            let semantic_text = module.name(semantic);
            if built_in_semantic(semantic_text).is_none() {
                let type_text = type_name(module, ty);
                self.writer.write_line(
                    0,
                    &format!("{attr_type} {type_text} {prefix}{semantic_text};"),
                );
            }
        }
    }

    fn emit_attributes(&mut self, entry: Handle<Function>) {
        let function: &'a Function = &self.module.functions[entry];
        for argument in &function.arguments {
            self.emit_attribute(&argument.ty, argument.semantic, "in", self.in_prefix);
        }
        self.emit_attribute(
            &function.return_type,
            function.semantic,
            "out",
            self.out_prefix,
        );
    }

    fn emit_set_out_attribute(&mut self, semantic: &str, result_name: &str) {
        match built_in_semantic(semantic) {
            Some("gl_Position") => {
                // Mirror the y axis to match the D3D render-target
                // origin and remap depth from D3D's 0..1 to GL's -1..1.
                self.writer
                    .write_line(1, &format!("vec4 temp = {result_name};"));
                self.writer.write_line(
                    1,
                    "gl_Position = temp * vec4(1,-1,2,1) - vec4(0,0,temp.w,0);",
                );
                self.output_position = true;
            }
            Some("gl_FragDepth") => {
                // Values outside 0..1 reject the fragment in GL, unlike
                // D3D, so clamp.
                self.writer.write_line(
                    1,
                    &format!("gl_FragDepth = clamp(float({result_name}), 0.0, 1.0);"),
                );
            }
            Some(built_in) => {
                self.writer
                    .write_line(1, &format!("{built_in} = {result_name};"));
            }
            None => {
                let prefix = self.out_prefix;
                self.writer
                    .write_line(1, &format!("{prefix}{semantic} = {result_name};"));
            }
        }
    }

    fn emit_entry_caller(&mut self, entry: Handle<Function>) -> Result<(), BackendError> {
        let module = self.module;
        let function: &'a Function = &module.functions[entry];

        self.writer.write_line(0, "void main() {");

        // Local variables mirroring the entry parameters, filled from
        // attributes or built-ins.
        for argument in &function.arguments {
            self.writer.begin_line(1, None);
            self.emit_type_and_name(&argument.ty, module.name(argument.name))?;
            self.writer.end_line(";");

            let safe_arg = self.safe_name(module.name(argument.name)).to_string();
            if argument.ty.base == BaseType::UserDefined {
                let Some(structure) = argument.ty.name.and_then(|n| module.find_struct(n)) else {
                    continue;
                };
                for field in &structure.fields {
                    let Some(semantic) = field.semantic else {
                        continue;
                    };
                    let semantic_text = module.name(semantic);
                    let field_name = self.safe_name(module.name(field.name)).to_string();
                    let value = match built_in_semantic(semantic_text) {
                        Some(built_in) => built_in.to_string(),
                        None => format!("{}{semantic_text}", self.in_prefix),
                    };
                    self.writer
                        .write_line(1, &format!("{safe_arg}.{field_name} = {value};"));
                }
            } else if let Some(semantic) = argument.semantic {
                let semantic_text = module.name(semantic);
                let value = match built_in_semantic(semantic_text) {
                    Some(built_in) => built_in.to_string(),
                    None => format!("{}{semantic_text}", self.in_prefix),
                };
                self.writer.write_line(1, &format!("{safe_arg} = {value};"));
            }
        }

        let result_name = "result";

        // Call the original entry function.
        self.writer.begin_line(1, None);
        let return_type = type_name(module, &function.return_type).to_string();
        self.writer
            .write(&format!("{return_type} {result_name} = {}(", self.entry_name));
        for (index, argument) in function.arguments.iter().enumerate() {
            if index > 0 {
                self.writer.write(", ");
            }
            let name = self.safe_name(module.name(argument.name)).to_string();
            self.writer.write(&name);
        }
        self.writer.end_line(");");

        // Distribute the result into out attributes and built-ins.
        if function.return_type.base == BaseType::UserDefined {
            if let Some(structure) = function
                .return_type
                .name
                .and_then(|n| module.find_struct(n))
            {
                for field in &structure.fields {
                    let Some(semantic) = field.semantic else {
                        continue;
                    };
                    let semantic_text = module.name(semantic).to_string();
                    let field_result = format!("{result_name}.{}", module.name(field.name));
                    self.emit_set_out_attribute(&semantic_text, &field_result);
                }
            }
        } else if let Some(semantic) = function.semantic {
            let semantic_text = module.name(semantic).to_string();
            self.emit_set_out_attribute(&semantic_text, result_name);
        }

        self.writer.write_line(0, "}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hxsl_backend_core::{BackendOptions, ShaderStage};

    fn parsed(source: &str) -> Module {
        hxsl_parser::parse(source, "emit.fx").expect("test source should parse")
    }

    #[test]
    fn unique_name_skips_taken_identifiers() {
        let module = parsed(
            "float clip0; float4 main() : SV_TARGET { return float4(clip0, 0.0, 0.0, 1.0); }",
        );
        assert_eq!(unique_name(&module, "clip").unwrap(), "clip1");
        assert_eq!(unique_name(&module, "matrix_row").unwrap(), "matrix_row0");
    }

    #[test]
    fn reserved_word_renaming_is_idempotent() {
        let module = parsed("float4 main(float4 c : COLOR0) : SV_TARGET { return c; }");
        let opts = BackendOptions {
            stage: ShaderStage::Fragment,
            entry_point: "main".into(),
            legacy: false,
        };
        let mut emitter = GlslEmitter::new(&module, &opts);
        emitter.reserved.push(("input", "input0".into()));
        assert_eq!(emitter.safe_name("input"), "input0");
        // A replacement is already safe; renaming it again is a no-op.
        assert_eq!(emitter.safe_name("input0"), "input0");
        assert_eq!(emitter.safe_name("position"), "position");
    }
}
