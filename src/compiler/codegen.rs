//! lowers a typed [`Ast`] to TPU assembly text, per §4.5: the machine stack
//! is the sole evaluation space, every expression leaves its result on top
//! of stack, and [`Scope`] mirrors the real stack so `[SP-k]` offsets can be
//! computed fresh at every use site rather than carried as fixed constants.
//!
//! fresh label and function ids are owned by [`CodegenContext`] instead of
//! the file-scope mutable counters the original used for the same purpose -
//! see the design notes on "global mutable counters".

use std::collections::HashMap;

use crate::compiler::ast::{Ast, BinOp, NodeId, NodeKind, UnaryOp};
use crate::compiler::error::{SemanticError, SourceLoc};
use crate::compiler::scope::Scope;
use crate::compiler::types::{Primitive, Type};
use crate::config::CompilerConfig;

/// codegen has no failure mode of its own beyond the reserved-but-absent
/// float path; everything else is caught by the parser before an AST node
/// ever reaches here, so this just reuses the semantic error type.
pub type CodegenError = SemanticError;

/// sepaarte counters for fresh jump labels (`__J<n>`) and fresh function
/// labels (`__UF<n>`), threaded explicitly through code generation instead
/// of living as file-scope mutable statics.
#[derive(Default)]
pub struct CodegenContext {
    next_label: usize,
    next_func: usize,
}

impl CodegenContext {
    pub fn new() -> CodegenContext {
        CodegenContext::default()
    }

    fn fresh_label(&mut self) -> String {
        let n = self.next_label;
        self.next_label += 1;
        format!("__J{}", n)
    }

    fn fresh_func_label(&mut self) -> String {
        let n = self.next_func;
        self.next_func += 1;
        format!("__UF{}", n)
    }
}

/// set to `true` to echo every emitted assembly line to stderr as it is
/// generated - see SPEC_FULL.md §10.
pub const DEBUG_EMIT: bool = false;

/// compiles every function in `ast` to TPU assembly text.
pub fn generate(ast: &Ast) -> Result<String, CodegenError> {
    generate_with_config(ast, &CompilerConfig::default())
}

/// same as `generate`, but honors `cfg.trace_emit` in addition to the
/// `DEBUG_EMIT` compile-time default.
pub fn generate_with_config(ast: &Ast, cfg: &CompilerConfig) -> Result<String, CodegenError> {
    let mut ctx = CodegenContext::new();
    let mut functions = HashMap::new();
    let mut return_sizes = HashMap::new();
    for &f in &ast.functions {
        if let NodeKind::Function { name, return_type, .. } = &ast.get(f).kind {
            let label = if name == "main" {
                "main".to_string()
            } else {
                ctx.fresh_func_label()
            };
            return_sizes.insert(name.clone(), return_type.size_bytes());
            functions.insert(name.clone(), label);
        }
    }

    let mut gen = Gen {
        ast,
        functions,
        return_sizes,
        ctx,
        out: String::new(),
        data_items: Vec::new(),
        scope: Scope::new(),
        func_baseline: 0,
        epilogue: String::new(),
        is_main: false,
        return_type: Type::void(),
        trace_emit: DEBUG_EMIT || cfg.trace_emit,
    };
    for &f in &ast.functions {
        gen.gen_function(f)?;
    }
    Ok(gen.finish())
}

struct Gen<'a> {
    ast: &'a Ast,
    functions: HashMap<String, String>,
    return_sizes: HashMap<String, usize>,
    ctx: CodegenContext,
    out: String,
    /// string-literal constants discovered during codegen, emitted as a
    /// `.data` section ahead of `.text` - the label and its raw bytes.
    data_items: Vec<(String, Vec<u8>)>,
    scope: Scope,
    /// `scope.len()` immediately after the prologue; every `return`
    /// discards locals back down to this line before jumping to the
    /// epilogue.
    func_baseline: usize,
    epilogue: String,
    is_main: bool,
    return_type: Type,
    trace_emit: bool,
}

impl<'a> Gen<'a> {
    fn emit(&mut self, line: &str) {
        if self.trace_emit {
            eprintln!("codegen: {}", line);
        }
        self.out.push_str("  ");
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn labelline(&mut self, name: &str) {
        self.out.push_str(name);
        self.out.push_str(":\n");
    }

    fn finish(self) -> String {
        let mut out = String::new();
        if !self.data_items.is_empty() {
            out.push_str("section .data\n");
            for (label, bytes) in &self.data_items {
                out.push_str(&format!("{} str {}\n", label, encode_data_literal(bytes)));
            }
        }
        out.push_str("section .text\n");
        out.push_str(&self.out);
        out
    }

    // ---- stack bookkeeping ----

    fn push_zero(&mut self, mut n: usize) {
        while n >= 2 {
            self.emit("pushw 0");
            self.scope.add_placeholder();
            self.scope.add_placeholder();
            n -= 2;
        }
        if n == 1 {
            self.emit("push 0");
            self.scope.add_placeholder();
        }
    }

    fn discard(&mut self, mut n: usize) {
        while n >= 2 {
            self.emit("popw");
            self.scope.pop();
            self.scope.pop();
            n -= 2;
        }
        if n == 1 {
            self.emit("pop");
            self.scope.pop();
        }
    }

    /// widens (push zero bytes) or narrows (discard the high bytes already
    /// on top) a just-evaluated value from `from` bytes to `to` bytes.
    fn reconcile_width(&mut self, from: usize, to: usize) {
        if to > from {
            self.push_zero(to - from);
        } else if from > to {
            self.discard(from - to);
        }
    }

    /// pops the top `actual` bytes, zero-extending into `to` bytes if the
    /// caller needs a wider register than what was pushed. `actual` must be
    /// 0, 1, or 2 - this compiler's widest scalar.
    fn pop_widened(&mut self, actual: usize, to: usize, reg16: &str, lo: &str, hi: &str) -> Result<(), CodegenError> {
        match (actual, to) {
            (0, _) => {}
            (2, 2) => {
                self.emit(&format!("popw {}", reg16));
                self.scope.pop();
                self.scope.pop();
            }
            (1, 1) => {
                self.emit(&format!("pop {}", lo));
                self.scope.pop();
            }
            (1, 2) => {
                self.emit(&format!("pop {}", lo));
                self.scope.pop();
                self.emit(&format!("mov {}, 0", hi));
            }
            _ => return Err(self.unimplemented("an operand wider than 2 bytes")),
        }
        Ok(())
    }

    fn unimplemented(&self, what: &str) -> CodegenError {
        SemanticError::Unimplemented(SourceLoc::new(0, 0), what.to_string())
    }

    /// the number of bytes `gen_expr(id)` actually leaves on top of stack.
    /// this is `ty.size_bytes()` for every node except a constant-char
    /// array literal, which decays to a 2-byte `.data` address rather than
    /// pushing its full declared array size - see `gen_array_literal`.
    fn pushed_width(&self, id: NodeId) -> usize {
        let node = self.ast.get(id);
        if let NodeKind::ArrayLiteral { elements } = &node.kind {
            if is_char_const_array(self.ast, elements) {
                return 2;
            }
        }
        node.ty.size_bytes()
    }

    // ---- named-slot and address helpers ----

    /// reads `width` bytes of a named slot and pushes them, low byte first -
    /// `PUSH [SP-k]` can move a byte straight from stack to stack without a
    /// register, so a 16-bit read is just two of those with the offset
    /// re-queried from `scope` after each push (it shifts by exactly one).
    fn read_named(&mut self, name: &str, width: usize) -> Result<(), CodegenError> {
        match width {
            0 => {}
            1 => {
                let k = self.scope.offset(name).expect("identifier resolved by the parser must be in scope");
                self.emit(&format!("push [SP-{}]", k));
                self.scope.add_placeholder();
            }
            2 => {
                let k = self.scope.offset(name).expect("identifier resolved by the parser must be in scope");
                self.emit(&format!("push [SP-{}]", k));
                self.scope.add_placeholder();
                let k2 = self.scope.offset(name).expect("still in scope");
                self.emit(&format!("push [SP-{}]", k2 - 1));
                self.scope.add_placeholder();
            }
            _ => return Err(self.unimplemented("reading a variable wider than 2 bytes")),
        }
        Ok(())
    }

    /// pops the top `width` bytes into a register and writes them into a
    /// named slot via `MOV [SP-k], reg8`; re-pushes the value afterward when
    /// `repush` is set so `a = b` itself carries a value (chained `=`).
    fn store_top_into_named(&mut self, name: &str, width: usize, repush: bool) -> Result<(), CodegenError> {
        match width {
            0 => {}
            1 => {
                self.emit("pop AL");
                self.scope.pop();
                let k = self.scope.offset(name).expect("identifier resolved by the parser must be in scope");
                self.emit(&format!("mov [SP-{}], AL", k));
                if repush {
                    self.emit("push AL");
                    self.scope.add_placeholder();
                }
            }
            2 => {
                self.emit("popw AX");
                self.scope.pop();
                self.scope.pop();
                let k = self.scope.offset(name).expect("identifier resolved by the parser must be in scope");
                self.emit(&format!("mov [SP-{}], AL", k));
                self.emit(&format!("mov [SP-{}], AH", k - 1));
                if repush {
                    self.emit("pushw AX");
                    self.scope.add_placeholder();
                    self.scope.add_placeholder();
                }
            }
            _ => return Err(self.unimplemented("assigning a variable wider than 2 bytes")),
        }
        Ok(())
    }

    /// same as `store_top_into_named`, but the destination address is
    /// already sitting in `BP` (array element, or a pointer dereference).
    fn store_top_into_bp(&mut self, width: usize, repush: bool) -> Result<(), CodegenError> {
        match width {
            0 => {}
            1 => {
                self.emit("pop AL");
                self.scope.pop();
                self.emit("mov [BP+0], AL");
                if repush {
                    self.emit("push AL");
                    self.scope.add_placeholder();
                }
            }
            2 => {
                self.emit("popw AX");
                self.scope.pop();
                self.scope.pop();
                self.emit("mov [BP+0], AL");
                self.emit("mov [BP+1], AH");
                if repush {
                    self.emit("pushw AX");
                    self.scope.add_placeholder();
                    self.scope.add_placeholder();
                }
            }
            _ => return Err(self.unimplemented("writing through a pointer wider than 2 bytes")),
        }
        Ok(())
    }

    fn read_from_bp(&mut self, width: usize) -> Result<(), CodegenError> {
        match width {
            0 => {}
            1 => {
                self.emit("mov AL, [BP+0]");
                self.emit("push AL");
                self.scope.add_placeholder();
            }
            2 => {
                self.emit("mov AL, [BP+0]");
                self.emit("mov AH, [BP+1]");
                self.emit("push AL");
                self.scope.add_placeholder();
                self.emit("push AH");
                self.scope.add_placeholder();
            }
            _ => return Err(self.unimplemented("reading through a pointer wider than 2 bytes")),
        }
        Ok(())
    }

    /// materializes the address of an lvalue (a named slot, or an array
    /// element reached through a chain of subscripts) into `BP`. array
    /// indexing multiplies the index by the size of whatever one element at
    /// that nesting level is - the subscript node's own resolved type.
    fn materialize_lvalue_address(&mut self, id: NodeId) -> Result<(), CodegenError> {
        let node = self.ast.get(id);
        match &node.kind {
            NodeKind::Identifier { name, .. } => {
                let name = name.clone();
                let k = self.scope.offset(&name).expect("identifier resolved by the parser must be in scope");
                self.emit("movw BP, SP");
                self.emit(&format!("sub BP, {}", k));
                Ok(())
            }
            NodeKind::ArraySubscript { base, index } => {
                let (base, index) = (*base, *index);
                let elem_size = self.ast.get(id).ty.size_bytes().max(1);
                self.materialize_lvalue_address(base)?;
                self.gen_expr(index)?;
                self.emit("popw BX");
                self.scope.pop();
                self.scope.pop();
                self.emit(&format!("movw AX, {}", elem_size));
                self.emit("mul BX");
                self.emit("add BP, AX");
                Ok(())
            }
            _ => Err(SemanticError::AssignToNonLvalue(node.loc)),
        }
    }

    // ---- functions ----

    fn gen_function(&mut self, func_id: NodeId) -> Result<(), CodegenError> {
        let (name, return_type, params, body) = match &self.ast.get(func_id).kind {
            NodeKind::Function {
                name,
                return_type,
                params,
                body,
            } => (name.clone(), return_type.clone(), params.clone(), body.clone()),
            _ => unreachable!("ast.functions only ever holds Function nodes"),
        };

        let is_main = name == "main";
        let label = self.functions[&name].clone();
        self.labelline(&label);

        self.scope = Scope::new();
        for &p in &params {
            if let NodeKind::Param { name: pname } = &self.ast.get(p).kind {
                let size = self.ast.get(p).ty.size_bytes().max(1);
                self.scope.declare_variable(pname, size);
            }
        }
        let return_size = return_type.size_bytes();
        if !is_main && return_size > 0 {
            // the caller already pushed these zero bytes before CALL; the
            // prologue only needs to register them as the named return slot.
            self.scope.declare_variable("0", return_size);
        }
        if !is_main {
            // CALL's own pushed return address - two bytes RET will consume.
            self.scope.add_placeholder();
            self.scope.add_placeholder();
        }

        self.is_main = is_main;
        self.return_type = return_type;
        self.epilogue = format!("{}E", label);
        self.func_baseline = self.scope.len();

        for &stmt in &body {
            self.gen_statement(stmt)?;
        }
        // falling off the end behaves exactly like an explicit `return;`.
        self.gen_return(None)?;

        let epilogue = self.epilogue.clone();
        self.labelline(&epilogue);
        if is_main {
            self.emit("movw AX, 2");
            self.emit("syscall");
            self.emit("hlt");
        } else {
            self.emit("ret");
        }
        Ok(())
    }

    fn gen_call(&mut self, name: &str, args: &[NodeId]) -> Result<(), CodegenError> {
        let label = self.functions[name].clone();
        let ret_width = self.return_sizes[name];

        let mut args_width = 0usize;
        for &a in args {
            self.gen_expr(a)?;
            args_width += self.pushed_width(a);
        }
        self.push_zero(ret_width);
        self.emit(&format!("call {}", label));

        // the return value landed on top, with the argument bytes still
        // sitting underneath it - pull it into a register, drop the args,
        // then push the value back so it is the only thing this call added.
        match ret_width {
            0 => {}
            1 => self.emit("pop AL"),
            2 => self.emit("popw AX"),
            _ => return Err(self.unimplemented("a return value wider than 2 bytes")),
        }
        for _ in 0..ret_width {
            self.scope.pop();
        }
        self.discard(args_width);
        match ret_width {
            1 => {
                self.emit("push AL");
                self.scope.add_placeholder();
            }
            2 => {
                self.emit("pushw AX");
                self.scope.add_placeholder();
                self.scope.add_placeholder();
            }
            _ => {}
        }
        Ok(())
    }

    fn pop_to_baseline(&mut self) {
        let extra = self.scope.len().saturating_sub(self.func_baseline);
        self.discard(extra);
    }

    fn gen_return(&mut self, value: Option<NodeId>) -> Result<(), CodegenError> {
        if self.is_main {
            match value {
                Some(v) => {
                    self.gen_expr(v)?;
                    let vw = self.pushed_width(v);
                    self.reconcile_width(vw, 2);
                    self.emit("popw BX");
                    self.scope.pop();
                    self.scope.pop();
                }
                None => self.emit("movw BX, 0"),
            }
        } else {
            let return_size = self.return_type.size_bytes();
            if return_size > 0 {
                match value {
                    Some(v) => {
                        self.gen_expr(v)?;
                        let vw = self.pushed_width(v);
                        self.reconcile_width(vw, return_size);
                    }
                    None => self.push_zero(return_size),
                }
                self.store_top_into_named("0", return_size, false)?;
            }
        }
        self.pop_to_baseline();
        let epilogue = self.epilogue.clone();
        self.emit(&format!("jmp {}", epilogue));
        Ok(())
    }

    // ---- statements ----

    fn gen_block(&mut self, body: &[NodeId]) -> Result<(), CodegenError> {
        let before = self.scope.len();
        for &s in body {
            self.gen_statement(s)?;
        }
        let added = self.scope.len().saturating_sub(before);
        self.discard(added);
        Ok(())
    }

    fn gen_statement(&mut self, id: NodeId) -> Result<(), CodegenError> {
        let node = self.ast.get(id);
        match &node.kind {
            NodeKind::VarDecl { name, declared_type, init } => {
                let (name, declared_type, init) = (name.clone(), declared_type.clone(), *init);
                let size = declared_type.size_bytes();
                match init {
                    Some(expr) => {
                        self.gen_expr(expr)?;
                        let ew = self.pushed_width(expr);
                        self.reconcile_width(ew, size);
                    }
                    None => self.push_zero(size),
                }
                self.scope.declare_variable(&name, size.max(1));
                Ok(())
            }
            NodeKind::Return { value } => {
                let value = *value;
                self.gen_return(value)
            }
            NodeKind::If {
                condition,
                then_body,
                else_body,
            } => {
                let (condition, then_body, else_body) = (*condition, then_body.clone(), else_body.clone());
                self.gen_if(condition, &then_body, &else_body)
            }
            NodeKind::WhileLoop { condition, body } => {
                let (condition, body) = (*condition, body.clone());
                self.gen_while(condition, &body)
            }
            NodeKind::ForLoop { init, condition, update, body } => {
                let (init, condition, update, body) = (*init, *condition, *update, body.clone());
                self.gen_for(init, condition, update, &body)
            }
            NodeKind::Expr { inner } => {
                let inner = *inner;
                self.gen_expr(inner)?;
                let w = self.pushed_width(inner);
                self.discard(w);
                Ok(())
            }
            other => Err(SemanticError::Unimplemented(node.loc, format!("{:?} as a statement", other))),
        }
    }

    fn gen_if(&mut self, condition: NodeId, then_body: &[NodeId], else_body: &[NodeId]) -> Result<(), CodegenError> {
        let cw = self.pushed_width(condition).max(1);
        self.gen_expr(condition)?;
        let else_label = self.ctx.fresh_label();
        self.emit_test_and_jz(cw, &else_label)?;
        self.gen_block(then_body)?;
        if else_body.is_empty() {
            self.labelline(&else_label);
        } else {
            let merge_label = self.ctx.fresh_label();
            self.emit(&format!("jmp {}", merge_label));
            self.labelline(&else_label);
            self.gen_block(else_body)?;
            self.labelline(&merge_label);
        }
        Ok(())
    }

    fn gen_while(&mut self, condition: NodeId, body: &[NodeId]) -> Result<(), CodegenError> {
        let start = self.ctx.fresh_label();
        let merge = self.ctx.fresh_label();
        self.labelline(&start);
        let cw = self.pushed_width(condition).max(1);
        self.gen_expr(condition)?;
        self.emit_test_and_jz(cw, &merge)?;
        self.gen_block(body)?;
        self.emit(&format!("jmp {}", start));
        self.labelline(&merge);
        Ok(())
    }

    fn gen_for(&mut self, init: NodeId, condition: NodeId, update: NodeId, body: &[NodeId]) -> Result<(), CodegenError> {
        self.gen_expr(init)?;
        let iw = self.pushed_width(init);
        self.discard(iw);

        let start = self.ctx.fresh_label();
        let merge = self.ctx.fresh_label();
        self.labelline(&start);
        let cw = self.pushed_width(condition).max(1);
        self.gen_expr(condition)?;
        self.emit_test_and_jz(cw, &merge)?;
        self.gen_block(body)?;

        self.gen_expr(update)?;
        let uw = self.pushed_width(update);
        self.discard(uw);

        self.emit(&format!("jmp {}", start));
        self.labelline(&merge);
        Ok(())
    }

    /// pops a condition value and jumps to `label` if it is zero.
    fn emit_test_and_jz(&mut self, width: usize, label: &str) -> Result<(), CodegenError> {
        match width {
            1 => {
                self.emit("pop AL");
                self.scope.pop();
                self.emit("buf AL");
            }
            2 => {
                self.emit("popw AX");
                self.scope.pop();
                self.scope.pop();
                self.emit("buf AX");
            }
            _ => return Err(self.unimplemented("a condition wider than 2 bytes")),
        }
        self.emit(&format!("jz {}", label));
        Ok(())
    }

    // ---- expressions ----

    /// lowers `id` and leaves exactly `ty.size_bytes()` bytes pushed on top
    /// of stack - every case below must uphold this invariant.
    fn gen_expr(&mut self, id: NodeId) -> Result<(), CodegenError> {
        let node = self.ast.get(id);
        let ty = node.ty.clone();
        let loc = node.loc;
        match &node.kind {
            NodeKind::IntLit(v) => {
                let v = *v as u16;
                self.emit(&format!("pushw {}", v));
                self.scope.add_placeholder();
                self.scope.add_placeholder();
            }
            NodeKind::CharLit(v) => {
                let v = *v;
                self.emit(&format!("push {}", v));
                self.scope.add_placeholder();
            }
            NodeKind::BoolLit(b) => {
                let v = if *b { 1 } else { 0 };
                self.emit(&format!("push {}", v));
                self.scope.add_placeholder();
            }
            NodeKind::FloatLit(_) => return Err(SemanticError::Unimplemented(loc, "floating-point literals".to_string())),
            NodeKind::VoidLit => {}
            NodeKind::Identifier { name, .. } => {
                let name = name.clone();
                if ty.is_array() {
                    self.materialize_lvalue_address(id)?;
                    self.emit("movw AX, BP");
                    self.emit("pushw AX");
                    self.scope.add_placeholder();
                    self.scope.add_placeholder();
                } else {
                    self.read_named(&name, ty.size_bytes())?;
                }
            }
            NodeKind::ArraySubscript { .. } => {
                self.materialize_lvalue_address(id)?;
                self.read_from_bp(ty.size_bytes())?;
            }
            NodeKind::FunctionCall { name, args } => {
                let (name, args) = (name.clone(), args.clone());
                self.gen_call(&name, &args)?;
            }
            NodeKind::UnaryOp { op, operand } => {
                let (op, operand) = (*op, *operand);
                self.gen_unary(op, operand, ty.clone(), loc)?;
            }
            NodeKind::BinOp { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                match op {
                    BinOp::Assign => self.gen_assign(lhs, rhs)?,
                    BinOp::And | BinOp::Or => self.gen_logical(op, lhs, rhs)?,
                    BinOp::Lt | BinOp::Lte | BinOp::Gt | BinOp::Gte | BinOp::Eq | BinOp::Neq => {
                        self.gen_comparison(op, lhs, rhs)?
                    }
                    _ => self.gen_arith(op, lhs, rhs, ty.size_bytes().max(1))?,
                }
            }
            NodeKind::TypeCast { target, operand } => {
                let (target, operand) = (target.clone(), *operand);
                if target.primitive == Primitive::Float || self.ast.get(operand).ty.primitive == Primitive::Float {
                    return Err(SemanticError::Unimplemented(loc, "floating-point casts".to_string()));
                }
                self.gen_expr(operand)?;
                let ow = self.pushed_width(operand);
                self.reconcile_width(ow, target.size_bytes());
            }
            NodeKind::ArrayLiteral { elements } => {
                let elements = elements.clone();
                self.gen_array_literal(&elements, &ty)?;
            }
            other => return Err(SemanticError::Unimplemented(loc, format!("{:?}", other))),
        }
        Ok(())
    }

    fn gen_unary(&mut self, op: UnaryOp, operand: NodeId, result_ty: Type, loc: SourceLoc) -> Result<(), CodegenError> {
        match op {
            UnaryOp::Plus => self.gen_expr(operand),
            UnaryOp::Neg => {
                self.gen_expr(operand)?;
                let w = self.pushed_width(operand).max(1);
                if w == 2 {
                    self.emit("popw AX");
                    self.scope.pop();
                    self.scope.pop();
                    // a sign-bit flip, not two's-complement negation - see
                    // the design note on unary minus.
                    self.emit("xor AX, 0x8000");
                    self.emit("pushw AX");
                    self.scope.add_placeholder();
                    self.scope.add_placeholder();
                } else {
                    self.emit("pop AL");
                    self.scope.pop();
                    self.emit("xor AL, 0x80");
                    self.emit("push AL");
                    self.scope.add_placeholder();
                }
                Ok(())
            }
            UnaryOp::BitNot => {
                self.gen_expr(operand)?;
                let w = self.pushed_width(operand).max(1);
                if w == 2 {
                    self.emit("popw AX");
                    self.scope.pop();
                    self.scope.pop();
                    self.emit("not AX");
                    self.emit("pushw AX");
                    self.scope.add_placeholder();
                    self.scope.add_placeholder();
                } else {
                    self.emit("pop AL");
                    self.scope.pop();
                    self.emit("not AL");
                    self.emit("push AL");
                    self.scope.add_placeholder();
                }
                Ok(())
            }
            UnaryOp::Not => {
                self.gen_expr(operand)?;
                let w = self.pushed_width(operand).max(1);
                if w == 2 {
                    self.emit("popw AX");
                    self.scope.pop();
                    self.scope.pop();
                    self.emit("buf AX");
                } else {
                    self.emit("pop AL");
                    self.scope.pop();
                    self.emit("buf AL");
                }
                let zero_label = self.ctx.fresh_label();
                let end_label = self.ctx.fresh_label();
                self.emit(&format!("jz {}", zero_label));
                self.emit("mov AL, 0");
                self.emit(&format!("jmp {}", end_label));
                self.labelline(&zero_label);
                self.emit("mov AL, 1");
                self.labelline(&end_label);
                self.emit("push AL");
                self.scope.add_placeholder();
                Ok(())
            }
            UnaryOp::Deref => {
                self.gen_expr(operand)?;
                self.emit("popw BP");
                self.scope.pop();
                self.scope.pop();
                self.read_from_bp(result_ty.size_bytes())
            }
            UnaryOp::AddressOf => {
                self.materialize_lvalue_address(operand)?;
                self.emit("movw AX, BP");
                self.emit("pushw AX");
                self.scope.add_placeholder();
                self.scope.add_placeholder();
                Ok(())
            }
            UnaryOp::Sizeof => Err(SemanticError::Unimplemented(loc, "sizeof outside constant folding".to_string())),
        }
    }

    fn gen_assign(&mut self, lhs: NodeId, rhs: NodeId) -> Result<(), CodegenError> {
        let width = self.pushed_width(lhs);
        self.gen_expr(rhs)?;
        let rw = self.pushed_width(rhs);
        self.reconcile_width(rw, width);

        let lhs_node = self.ast.get(lhs);
        match &lhs_node.kind {
            NodeKind::Identifier { name, .. } => {
                let name = name.clone();
                self.store_top_into_named(&name, width, true)
            }
            NodeKind::ArraySubscript { .. } => {
                // the new value is already on top; computing the target
                // address below is net-zero on stack height once its own
                // index evaluation unwinds, so the value stays reachable.
                self.materialize_lvalue_address(lhs)?;
                self.store_top_into_bp(width, true)
            }
            _ => Err(SemanticError::AssignToNonLvalue(lhs_node.loc)),
        }
    }

    fn gen_logical(&mut self, op: BinOp, lhs: NodeId, rhs: NodeId) -> Result<(), CodegenError> {
        self.gen_expr(lhs)?;
        let lw = self.pushed_width(lhs).max(1);
        self.normalize_to_bool_al(lw)?;
        self.emit("mov BL, AL");
        self.gen_expr(rhs)?;
        let rw = self.pushed_width(rhs).max(1);
        self.normalize_to_bool_al(rw)?;
        let mnemonic = if op == BinOp::And { "and" } else { "or" };
        self.emit(&format!("{} AL, BL", mnemonic));
        self.emit("push AL");
        self.scope.add_placeholder();
        Ok(())
    }

    /// pops `width` bytes and leaves their truthiness (0 or 1) in `AL`,
    /// unpushed - used to normalize `&&`/`||` operands before combining them
    /// bitwise.
    fn normalize_to_bool_al(&mut self, width: usize) -> Result<(), CodegenError> {
        match width {
            1 => {
                self.emit("pop AL");
                self.scope.pop();
                self.emit("buf AL");
            }
            2 => {
                self.emit("popw AX");
                self.scope.pop();
                self.scope.pop();
                self.emit("buf AX");
            }
            _ => return Err(self.unimplemented("a logical operand wider than 2 bytes")),
        }
        let false_label = self.ctx.fresh_label();
        let end_label = self.ctx.fresh_label();
        self.emit(&format!("jz {}", false_label));
        self.emit("mov AL, 1");
        self.emit(&format!("jmp {}", end_label));
        self.labelline(&false_label);
        self.emit("mov AL, 0");
        self.labelline(&end_label);
        Ok(())
    }

    fn gen_comparison(&mut self, op: BinOp, lhs: NodeId, rhs: NodeId) -> Result<(), CodegenError> {
        let lw = self.pushed_width(lhs);
        let rw = self.pushed_width(rhs);
        let width = lw.max(rw).max(1);
        self.gen_expr(lhs)?;
        self.gen_expr(rhs)?;
        self.pop_widened(rw, width, "BX", "BL", "BH")?;
        self.pop_widened(lw, width, "AX", "AL", "AH")?;
        let (reg_a, reg_b) = if width == 2 { ("AX", "BX") } else { ("AL", "BL") };
        self.emit(&format!("cmp {}, {}", reg_a, reg_b));

        let true_label = self.ctx.fresh_label();
        let end_label = self.ctx.fresh_label();
        match op {
            BinOp::Eq => self.emit(&format!("jz {}", true_label)),
            BinOp::Neq => self.emit(&format!("jnz {}", true_label)),
            BinOp::Lt => self.emit(&format!("jc {}", true_label)),
            BinOp::Gte => self.emit(&format!("jnc {}", true_label)),
            BinOp::Gt => {
                // `a > b` is neither carry (a<b) nor zero (a==b).
                let false_label = self.ctx.fresh_label();
                self.emit(&format!("jc {}", false_label));
                self.emit(&format!("jz {}", false_label));
                self.emit("mov AL, 1");
                self.emit(&format!("jmp {}", end_label));
                self.labelline(&false_label);
                self.emit("mov AL, 0");
                self.labelline(&end_label);
                self.emit("push AL");
                self.scope.add_placeholder();
                return Ok(());
            }
            BinOp::Lte => {
                self.emit(&format!("jc {}", true_label));
                self.emit(&format!("jz {}", true_label));
                self.emit("mov AL, 0");
                self.emit(&format!("jmp {}", end_label));
                self.labelline(&true_label);
                self.emit("mov AL, 1");
                self.labelline(&end_label);
                self.emit("push AL");
                self.scope.add_placeholder();
                return Ok(());
            }
            _ => unreachable!("not a comparison operator"),
        }
        self.emit("mov AL, 0");
        self.emit(&format!("jmp {}", end_label));
        self.labelline(&true_label);
        self.emit("mov AL, 1");
        self.labelline(&end_label);
        self.emit("push AL");
        self.scope.add_placeholder();
        Ok(())
    }

    fn gen_arith(&mut self, op: BinOp, lhs: NodeId, rhs: NodeId, result_width: usize) -> Result<(), CodegenError> {
        let lw = self.pushed_width(lhs);
        let rw = self.pushed_width(rhs);
        self.gen_expr(lhs)?;
        self.gen_expr(rhs)?;

        match op {
            BinOp::Mul | BinOp::Div | BinOp::Mod => {
                self.pop_widened(rw, result_width, "BX", "BL", "BH")?;
                self.pop_widened(lw, result_width, "AX", "AL", "AH")?;
                let mnemonic = if op == BinOp::Mul { "mul" } else { "div" };
                let operand = if result_width == 2 { "BX" } else { "BL" };
                self.emit(&format!("{} {}", mnemonic, operand));
                if op == BinOp::Mod {
                    if result_width == 2 {
                        self.emit("pushw DX");
                        self.scope.add_placeholder();
                        self.scope.add_placeholder();
                    } else {
                        self.emit("push AH");
                        self.scope.add_placeholder();
                    }
                } else if result_width == 2 {
                    self.emit("pushw AX");
                    self.scope.add_placeholder();
                    self.scope.add_placeholder();
                } else {
                    self.emit("push AL");
                    self.scope.add_placeholder();
                }
            }
            BinOp::Shl | BinOp::Shr => {
                match rw {
                    2 => {
                        self.emit("popw AX");
                        self.scope.pop();
                        self.scope.pop();
                        self.emit("mov CL, AL");
                    }
                    1 => {
                        self.emit("pop CL");
                        self.scope.pop();
                    }
                    _ => return Err(self.unimplemented("a shift count wider than 2 bytes")),
                }
                self.pop_widened(lw, result_width, "AX", "AL", "AH")?;
                let mnemonic = if op == BinOp::Shl { "shl" } else { "shr" };
                if result_width == 2 {
                    self.emit(&format!("{} AX, CL", mnemonic));
                    self.emit("pushw AX");
                    self.scope.add_placeholder();
                    self.scope.add_placeholder();
                } else {
                    self.emit(&format!("{} AL, CL", mnemonic));
                    self.emit("push AL");
                    self.scope.add_placeholder();
                }
            }
            _ => {
                self.pop_widened(rw, result_width, "BX", "BL", "BH")?;
                self.pop_widened(lw, result_width, "AX", "AL", "AH")?;
                let mnemonic = match op {
                    BinOp::Add => "add",
                    BinOp::Sub => "sub",
                    BinOp::BitAnd => "and",
                    BinOp::BitXor => "xor",
                    BinOp::BitOr => "or",
                    _ => unreachable!("not an arithmetic/bitwise operator"),
                };
                if result_width == 2 {
                    self.emit(&format!("{} AX, BX", mnemonic));
                    self.emit("pushw AX");
                    self.scope.add_placeholder();
                    self.scope.add_placeholder();
                } else {
                    self.emit(&format!("{} AL, BL", mnemonic));
                    self.emit("push AL");
                    self.scope.add_placeholder();
                }
            }
        }
        Ok(())
    }

    /// an all-constant-char array literal (a desugared string literal) is
    /// hoisted into `.data` and decays to the address of that label;
    /// anything else is evaluated element by element, concatenating their
    /// bytes directly on the stack as the array's backing store.
    fn gen_array_literal(&mut self, elements: &[NodeId], _ty: &Type) -> Result<(), CodegenError> {
        if is_char_const_array(self.ast, elements) {
            let bytes: Vec<u8> = elements
                .iter()
                .map(|&e| match self.ast.get(e).kind {
                    NodeKind::CharLit(b) => b,
                    _ => unreachable!("checked by is_char_const_array above"),
                })
                .collect();
            let label = format!("__S{}", self.data_items.len());
            self.data_items.push((label.clone(), bytes));
            self.emit(&format!("pushw {}", label));
            self.scope.add_placeholder();
            self.scope.add_placeholder();
            return Ok(());
        }
        for &e in elements {
            self.gen_expr(e)?;
        }
        Ok(())
    }
}

fn is_char_const_array(ast: &Ast, elements: &[NodeId]) -> bool {
    !elements.is_empty() && elements.iter().all(|&e| matches!(ast.get(e).kind, NodeKind::CharLit(_)))
}

/// re-encodes raw bytes as a `"..."`-quoted `.data` literal the assembler's
/// own escape table can decode back losslessly for the printable/escape
/// subset (see `asm::lexer::escape_char`); bytes outside that subset pass
/// through as-is, which is sufficient for the ASCII text this language's
/// `char` arrays are meant to hold.
fn encode_data_literal(bytes: &[u8]) -> String {
    let mut s = String::from("\"");
    for &b in bytes {
        match b {
            0x07 => s.push_str("\\a"),
            0x08 => s.push_str("\\b"),
            0x09 => s.push_str("\\t"),
            0x0A => s.push_str("\\n"),
            0x0B => s.push_str("\\v"),
            0x0C => s.push_str("\\f"),
            0x0D => s.push_str("\\r"),
            0x1B => s.push_str("\\e"),
            0x00 => s.push_str("\\0"),
            b'"' => s.push_str("\\\""),
            b'\\' => s.push_str("\\\\"),
            _ => s.push(b as char),
        }
    }
    s.push('"');
    s
}

#[cfg(test)]
#[path = "./codegen_test.rs"]
mod codegen_test;
