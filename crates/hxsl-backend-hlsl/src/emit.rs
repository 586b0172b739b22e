//! The modernized-HLSL emitter.

use hxsl_ast::{
    ArgumentModifier, BaseType, Buffer, Declaration, ExprKind, Expression, Function, Handle,
    Initializer, Literal, Module, Span, Statement, StmtKind, StructDecl, Symbol, Type, UnaryOp,
};
use hxsl_backend_core::{format_float, BackendError, BackendOptions, CodeWriter};

fn base_type_name(base: BaseType) -> &'static str {
    use BaseType::*;
    match base {
        Void => "void",
        Float => "float",
        Float2 => "float2",
        Float3 => "float3",
        Float4 => "float4",
        Float3x3 => "float3x3",
        Float4x4 => "float4x4",
        Half => "half",
        Half2 => "half2",
        Half3 => "half3",
        Half4 => "half4",
        Half3x3 => "half3x3",
        Half4x4 => "half4x4",
        Bool => "bool",
        Int => "int",
        Int2 => "int2",
        Int3 => "int3",
        Int4 => "int4",
        Uint => "uint",
        Uint2 => "uint2",
        Uint3 => "uint3",
        Uint4 => "uint4",
        Texture => "texture",
        Sampler2D => "sampler2D",
        SamplerCube => "samplerCUBE",
        UserDefined | Unknown => "?",
    }
}

fn is_sampler(base: BaseType) -> bool {
    matches!(base, BaseType::Sampler2D | BaseType::SamplerCube)
}

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

fn block_declares(block: &[Statement], base: BaseType) -> bool {
    block.iter().any(|statement| match &statement.kind {
        StmtKind::Declaration(declaration) => declaration.ty.base == base,
        StmtKind::If {
            then_block,
            else_block,
            ..
        } => block_declares(then_block, base) || block_declares(else_block, base),
        StmtKind::For { init, body, .. } => {
            init.as_ref().is_some_and(|d| d.ty.base == base) || block_declares(body, base)
        }
        StmtKind::Block(block) => block_declares(block, base),
        _ => false,
    })
}

/// Whether the program touches a sampler of the given dimensionality
/// anywhere a bundling struct would be needed.
fn uses_sampler(module: &Module, base: BaseType) -> bool {
    module.expressions.iter().any(|(_, e)| e.ty.base == base)
        || module.functions.iter().any(|(_, f)| {
            f.arguments.iter().any(|a| a.ty.base == base) || block_declares(&f.body, base)
        })
}

pub(crate) struct HlslEmitter<'a> {
    module: &'a Module,
    legacy: bool,
    writer: CodeWriter,
    sampler2d_struct: String,
    sampler2d_ctor: String,
    sampler_cube_struct: String,
    sampler_cube_ctor: String,
    tex2d_fn: String,
    tex2dproj_fn: String,
    tex2dlod_fn: String,
    texcube_fn: String,
    texcubebias_fn: String,
    uses_2d: bool,
    uses_cube: bool,
}

impl<'a> HlslEmitter<'a> {
    pub(crate) fn new(module: &'a Module, opts: &BackendOptions) -> Self {
        Self {
            module,
            legacy: opts.legacy,
            writer: CodeWriter::new(true),
            sampler2d_struct: String::new(),
            sampler2d_ctor: String::new(),
            sampler_cube_struct: String::new(),
            sampler_cube_ctor: String::new(),
            tex2d_fn: String::new(),
            tex2dproj_fn: String::new(),
            tex2dlod_fn: String::new(),
            texcube_fn: String::new(),
            texcubebias_fn: String::new(),
            uses_2d: false,
            uses_cube: false,
        }
    }

    pub(crate) fn run(mut self) -> Result<String, BackendError> {
        let module = self.module;

        self.uses_2d = uses_sampler(module, BaseType::Sampler2D);
        self.uses_cube = uses_sampler(module, BaseType::SamplerCube);

        self.sampler2d_struct = unique_name(module, "TextureSampler2D")?;
        self.sampler2d_ctor = unique_name(module, "CreateTextureSampler2D")?;
        self.sampler_cube_struct = unique_name(module, "TextureSamplerCube")?;
        self.sampler_cube_ctor = unique_name(module, "CreateTextureSamplerCube")?;
        self.tex2d_fn = unique_name(module, "tex2D")?;
        self.tex2dproj_fn = unique_name(module, "tex2Dproj")?;
        self.tex2dlod_fn = unique_name(module, "tex2Dlod")?;
        self.texcube_fn = unique_name(module, "texCUBE")?;
        self.texcubebias_fn = unique_name(module, "texCUBEbias")?;

        if !self.legacy {
            self.emit_sampler_shims();
        }

        for &top in &module.order {
            match top {
                hxsl_ast::TopLevel::Struct(handle) => self.emit_struct(&module.structs[handle])?,
                hxsl_ast::TopLevel::Buffer(handle) => self.emit_buffer(&module.buffers[handle])?,
                hxsl_ast::TopLevel::Global(handle) => {
                    let declaration = &module.globals[handle];
                    let (file, line) = self.loc(declaration.span);
                    self.writer.begin_line(0, Some((file, line)));
                    self.emit_declaration(declaration)?;
                    self.writer.end_line(";");
                }
                hxsl_ast::TopLevel::Function(handle) => {
                    self.emit_function(&module.functions[handle])?
                }
            }
        }

        Ok(self.writer.finish())
    }

    /// Bundling structs, constructors, and sampling helpers for the
    /// sampler dimensionalities the program actually uses.
    fn emit_sampler_shims(&mut self) {
        if self.uses_2d {
            let st = self.sampler2d_struct.clone();
            let ctor = self.sampler2d_ctor.clone();
            log::debug!("synthesizing 2D texture/sampler bundle '{st}'");

            self.writer.write_line(0, &format!("struct {st} {{"));
            self.writer.write_line(1, "Texture2D    t;");
            self.writer.write_line(1, "SamplerState s;");
            self.writer.write_line(0, "};");

            self.writer
                .write_line(0, &format!("{st} {ctor}(Texture2D t, SamplerState s) {{"));
            self.writer.write_line(1, &format!("{st} ts;"));
            self.writer.write_line(1, "ts.t = t; ts.s = s;");
            self.writer.write_line(1, "return ts;");
            self.writer.write_line(0, "}");

            let tex2d = self.tex2d_fn.clone();
            self.writer
                .write_line(0, &format!("float4 {tex2d}({st} ts, float2 texCoord) {{"));
            self.writer
                .write_line(1, "return ts.t.Sample(ts.s, texCoord);");
            self.writer.write_line(0, "}");

            let tex2dproj = self.tex2dproj_fn.clone();
            self.writer
                .write_line(0, &format!("float4 {tex2dproj}({st} ts, float4 texCoord) {{"));
            self.writer
                .write_line(1, "return ts.t.Sample(ts.s, texCoord.xy / texCoord.w);");
            self.writer.write_line(0, "}");

            let tex2dlod = self.tex2dlod_fn.clone();
            self.writer
                .write_line(0, &format!("float4 {tex2dlod}({st} ts, float4 texCoord) {{"));
            self.writer
                .write_line(1, "return ts.t.SampleLevel(ts.s, texCoord.xy, texCoord.w);");
            self.writer.write_line(0, "}");
        }

        if self.uses_cube {
            let st = self.sampler_cube_struct.clone();
            let ctor = self.sampler_cube_ctor.clone();
            log::debug!("synthesizing cube texture/sampler bundle '{st}'");

            self.writer.write_line(0, &format!("struct {st} {{"));
            self.writer.write_line(1, "TextureCube  t;");
            self.writer.write_line(1, "SamplerState s;");
            self.writer.write_line(0, "};");

            self.writer
                .write_line(0, &format!("{st} {ctor}(TextureCube t, SamplerState s) {{"));
            self.writer.write_line(1, &format!("{st} ts;"));
            self.writer.write_line(1, "ts.t = t; ts.s = s;");
            self.writer.write_line(1, "return ts;");
            self.writer.write_line(0, "}");

            let texcube = self.texcube_fn.clone();
            self.writer
                .write_line(0, &format!("float4 {texcube}({st} ts, float3 texCoord) {{"));
            self.writer
                .write_line(1, "return ts.t.Sample(ts.s, texCoord);");
            self.writer.write_line(0, "}");

            let texcubebias = self.texcubebias_fn.clone();
            self.writer
                .write_line(0, &format!("float4 {texcubebias}({st} ts, float4 texCoord) {{"));
            self.writer
                .write_line(1, "return ts.t.SampleBias(ts.s, texCoord.xyz, texCoord.w);");
            self.writer.write_line(0, "}");
        }
    }

    fn loc(&self, span: Span) -> (&'a str, u32) {
        (self.module.name(span.file), span.line)
    }

    fn type_name(&self, ty: &Type) -> &str {
        if !self.legacy {
            if ty.base == BaseType::Sampler2D {
                return &self.sampler2d_struct;
            }
            if ty.base == BaseType::SamplerCube {
                return &self.sampler_cube_struct;
            }
        }
        match (ty.base, ty.name) {
            (BaseType::UserDefined, Some(name)) => self.module.name(name),
            _ => base_type_name(ty.base),
        }
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn emit_expression(&mut self, handle: Handle<Expression>) -> Result<(), BackendError> {
        let module = self.module;
        let expression: &'a Expression = &module.expressions[handle];

        match &expression.kind {
            ExprKind::Ident { name, global } => {
                let text = module.name(*name);
                if !self.legacy && is_sampler(expression.ty.base) && *global {
                    // Global samplers were split; reconstruct the
                    // bundle at the point of use.
                    log::debug!("rewriting global sampler reference '{text}'");
                    let ctor = match expression.ty.base {
                        BaseType::Sampler2D => self.sampler2d_ctor.clone(),
                        _ => self.sampler_cube_ctor.clone(),
                    };
                    self.writer
                        .write(&format!("{ctor}({text}_texture, {text}_sampler)"));
                } else {
                    self.writer.write(text);
                }
            }
            ExprKind::Cast { expr } => {
                let type_text = self.type_name(&expression.ty).to_string();
                self.writer.write(&format!("({type_text})("));
                self.emit_expression(*expr)?;
                self.writer.write(")");
            }
            ExprKind::Constructor { args } => {
                let type_text = self.type_name(&expression.ty).to_string();
                self.writer.write(&format!("{type_text}("));
                self.emit_expression_list(args)?;
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
                self.writer.write("(");
                if pre {
                    self.writer.write(text);
                    self.emit_expression(*expr)?;
                } else {
                    self.emit_expression(*expr)?;
                    self.writer.write(text);
                }
                self.writer.write(")");
            }
            ExprKind::Binary { op, left, right } => {
                self.writer.write("(");
                self.emit_expression(*left)?;
                self.writer.write(&format!(" {} ", op.symbol()));
                self.emit_expression(*right)?;
                self.writer.write(")");
            }
            ExprKind::Conditional {
                condition,
                accept,
                reject,
            } => {
                self.writer.write("((");
                self.emit_expression(*condition)?;
                self.writer.write(")?(");
                self.emit_expression(*accept)?;
                self.writer.write("):(");
                self.emit_expression(*reject)?;
                self.writer.write("))");
            }
            ExprKind::Member { object, field } => {
                self.writer.write("(");
                self.emit_expression(*object)?;
                self.writer.write(&format!(").{}", module.name(*field)));
            }
            ExprKind::Index { object, index } => {
                self.emit_expression(*object)?;
                self.writer.write("[");
                self.emit_expression(*index)?;
                self.writer.write("]");
            }
            ExprKind::Call { callee, args } => {
                let name = module.callee_name(*callee);
                let replaced = if self.legacy {
                    name.to_string()
                } else {
                    match name {
                        "tex2D" => self.tex2d_fn.clone(),
                        "tex2Dproj" => self.tex2dproj_fn.clone(),
                        "tex2Dlod" => self.tex2dlod_fn.clone(),
                        "texCUBE" => self.texcube_fn.clone(),
                        "texCUBEbias" => self.texcubebias_fn.clone(),
                        other => other.to_string(),
                    }
                };
                self.writer.write(&format!("{replaced}("));
                self.emit_expression_list(args)?;
                self.writer.write(")");
            }
        }
        Ok(())
    }

    fn emit_expression_list(
        &mut self,
        expressions: &[Handle<Expression>],
    ) -> Result<(), BackendError> {
        for (index, &expression) in expressions.iter().enumerate() {
            if index > 0 {
                self.writer.write(", ");
            }
            self.emit_expression(expression)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------

    fn emit_type_name_semantic(
        &mut self,
        ty: &Type,
        name: &str,
        semantic: Option<Symbol>,
    ) -> Result<(), BackendError> {
        let type_text = self.type_name(ty).to_string();
        if ty.constant {
            self.writer.write("const ");
        }
        if !ty.array {
            match semantic {
                Some(semantic) => {
                    let semantic_text = self.module.name(semantic);
                    self.writer
                        .write(&format!("{type_text} {name} : {semantic_text}"));
                }
                None => self.writer.write(&format!("{type_text} {name}")),
            }
        } else {
            self.writer.write(&format!("{type_text} {name}["));
            if let Some(size) = ty.array_size {
                self.emit_expression(size)?;
            }
            self.writer.write("]");
        }
        Ok(())
    }

    fn emit_declaration(&mut self, declaration: &'a Declaration) -> Result<(), BackendError> {
        let module = self.module;
        let name = module.name(declaration.name);

        if !self.legacy && is_sampler(declaration.ty.base) {
            // Split the sampler into a texture/sampler-state pair,
            // mapping register sN onto tN/sN.
            let register = declaration
                .register
                .map(|r| module.name(r))
                .and_then(|r| r.strip_prefix('s'))
                .and_then(|r| r.parse::<u32>().ok());
            log::debug!("splitting sampler '{name}' (register {register:?})");

            let texture_type = match declaration.ty.base {
                BaseType::Sampler2D => "Texture2D",
                _ => "TextureCube",
            };

            match register {
                Some(reg) => self.writer.write(&format!(
                    "{texture_type} {name}_texture : register(t{reg}); \
                     SamplerState {name}_sampler : register(s{reg})"
                )),
                None => self.writer.write(&format!(
                    "{texture_type} {name}_texture; SamplerState {name}_sampler"
                )),
            }
            return Ok(());
        }

        self.emit_type_name_semantic(&declaration.ty, name, None)?;
        // Registers only matter for samplers here.
        if is_sampler(declaration.ty.base) {
            if let Some(register) = declaration.register {
                let register_text = module.name(register);
                self.writer.write(&format!(" : register({register_text})"));
            }
        }
        match &declaration.init {
            Some(Initializer::Expr(expr)) => {
                self.writer.write(" = ");
                self.emit_expression(*expr)?;
            }
            Some(Initializer::List(values)) => {
                self.writer.write(" = { ");
                self.emit_expression_list(values)?;
                self.writer.write(" }");
            }
            None => {}
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Top-level items and statements
    // -----------------------------------------------------------------

    fn emit_struct(&mut self, structure: &'a StructDecl) -> Result<(), BackendError> {
        let module = self.module;
        let name = module.name(structure.name);
        self.writer.write_line(0, &format!("struct {name} {{"));
        for field in &structure.fields {
            let (file, line) = self.loc(field.span);
            self.writer.begin_line(1, Some((file, line)));
            self.emit_type_name_semantic(&field.ty, module.name(field.name), field.semantic)?;
            self.writer.end_line(";");
        }
        self.writer.write_line(0, "};");
        Ok(())
    }

    fn emit_buffer(&mut self, buffer: &'a Buffer) -> Result<(), BackendError> {
        let module = self.module;
        if !self.legacy {
            let (file, line) = self.loc(buffer.span);
            self.writer.begin_line(0, Some((file, line)));
            let name = buffer.name.map(|n| module.name(n)).unwrap_or_default();
            self.writer.write(&format!("cbuffer {name}"));
            if let Some(register) = buffer.register {
                let register_text = module.name(register);
                self.writer.write(&format!(" : register({register_text})"));
            }
            self.writer.end_line(" {");
        }

        for field in &buffer.fields {
            let (file, line) = self.loc(field.span);
            self.writer.begin_line(1, Some((file, line)));
            self.emit_type_name_semantic(&field.ty, module.name(field.name), None)?;
            self.writer.end_line(";");
        }

        if !self.legacy {
            self.writer.write_line(0, "};");
        }
        Ok(())
    }

    fn emit_function(&mut self, function: &'a Function) -> Result<(), BackendError> {
        let module = self.module;
        let name = module.name(function.name);
        let return_type = self.type_name(&function.return_type).to_string();
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
                ArgumentModifier::Uniform => self.writer.write("uniform "),
                ArgumentModifier::None => {}
            }
            self.emit_type_name_semantic(
                &argument.ty,
                module.name(argument.name),
                argument.semantic,
            )?;
        }

        match function.semantic {
            Some(semantic) => {
                let semantic_text = module.name(semantic);
                self.writer.write(&format!(") : {semantic_text} {{"));
            }
            None => self.writer.write(") {"),
        }
        self.writer.end_line("");

        self.emit_statements(1, &function.body)?;
        self.writer.write_line(0, "};");
        Ok(())
    }

    fn emit_statements(
        &mut self,
        indent: usize,
        statements: &'a [Statement],
    ) -> Result<(), BackendError> {
        for statement in statements {
            self.emit_statement(indent, statement)?;
        }
        Ok(())
    }

    fn emit_statement(&mut self, indent: usize, statement: &'a Statement) -> Result<(), BackendError> {
        let (file, line) = self.loc(statement.span);

        match &statement.kind {
            StmtKind::Declaration(declaration) => {
                self.writer.begin_line(indent, Some((file, line)));
                self.emit_declaration(declaration)?;
                self.writer.end_line(";");
            }
            StmtKind::Expr(expression) => {
                self.writer.begin_line(indent, Some((file, line)));
                self.emit_expression(*expression)?;
                self.writer.end_line(";");
            }
            StmtKind::Return(Some(expression)) => {
                self.writer.begin_line(indent, Some((file, line)));
                self.writer.write("return ");
                self.emit_expression(*expression)?;
                self.writer.end_line(";");
            }
            StmtKind::Return(None) => {
                self.writer.write_line_at(indent, file, line, "return;");
            }
            StmtKind::Discard => {
                self.writer.write_line_at(indent, file, line, "discard;");
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
                self.emit_expression(*condition)?;
                self.writer.write(") {");
                self.writer.end_line("");
                self.emit_statements(indent + 1, then_block)?;
                self.writer.write_line(indent, "}");
                if !else_block.is_empty() {
                    self.writer.write_line(indent, "else {");
                    self.emit_statements(indent + 1, else_block)?;
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
                    self.emit_expression(*condition)?;
                }
                self.writer.write("; ");
                if let Some(increment) = increment {
                    self.emit_expression(*increment)?;
                }
                self.writer.write(") {");
                self.writer.end_line("");
                self.emit_statements(indent + 1, body)?;
                self.writer.write_line(indent, "}");
            }
            StmtKind::Block(block) => {
                self.writer.write_line_at(indent, file, line, "{");
                self.emit_statements(indent + 1, block)?;
                self.writer.write_line(indent, "}");
            }
        }
        Ok(())
    }
}
