//! AST-to-IR lowering (§4.6).
//!
//! Every local and global, scalar or aggregate, gets an address-yielding
//! slot (`alloca` for locals, a bare symbol reference for globals) and is
//! always read through `load`/`store` — the same "alloca everything, clean
//! up later" shape `clang -O0` produces, which keeps assignment,
//! address-of, and struct/array field mutation uniform without a separate
//! register-promoted path for scalars. `cn-ir-passes`' constant folding and
//! DCE run after this, not a register promotion pass — this core has no
//! mem2reg stage (out of scope per §1).
//!
//! Short-circuit `&&`/`||` and loop-carried merge values use the stack-slot
//! convention the spec explicitly allows in place of phi nodes (§4.6).

use crate::cfg::{BlockId, CompileMode, Function, Module};
use crate::instr::{Instruction, Opcode};
use crate::operand::Operand;
use cn_ast::{
    BinaryOp, Expr, ExprKind, FunctionDecl, LogicalOp, MemoryIntrinsic, ModuleDecl, Program,
    Stmt, StructLiteralFields, TypeName, UnaryOp,
};
use cn_diagnostics::DiagnosticBag;
use cn_sema::ProgramTypes;
use cn_types::Type;

struct LoopContext {
    continue_target: BlockId,
    break_target: BlockId,
}

/// A stack of name->address layers, innermost last, mirroring the block
/// nesting the same way `cn_sema::ScopeTree` does for name resolution.
struct Env {
    layers: Vec<Vec<(String, Operand)>>,
}

impl Env {
    fn new() -> Self {
        Env { layers: vec![Vec::new()] }
    }

    fn push(&mut self) {
        self.layers.push(Vec::new());
    }

    fn pop(&mut self) {
        self.layers.pop();
    }

    fn declare(&mut self, name: String, address: Operand) {
        self.layers.last_mut().unwrap().push((name, address));
    }

    fn lookup(&self, name: &str) -> Option<&Operand> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.iter().rev().find(|(n, _)| n == name).map(|(_, a)| a))
    }
}

struct FunctionGen<'a> {
    function: Function,
    current: BlockId,
    loops: Vec<LoopContext>,
    env: Env,
    label_counter: u32,
    types: &'a ProgramTypes,
    globals: &'a [(String, Type)],
}

pub fn generate_module(
    program: &Program,
    target_triple: impl Into<String>,
    freestanding: bool,
) -> Module {
    let types = ProgramTypes::from_program(program);
    let mode = if freestanding {
        CompileMode::Freestanding
    } else {
        CompileMode::Hosted
    };
    let mut module = Module::new(target_triple, mode);

    let globals: Vec<(String, Type)> = program
        .globals
        .iter()
        .map(|g| (g.name.clone(), g.resolved_type.clone()))
        .collect();

    for f in &program.functions {
        module.functions.push(generate_function(f, &types, &globals, None));
    }
    for m in &program.modules {
        generate_module_decl(m, &types, &globals, &mut module);
    }
    module
}

fn generate_module_decl(
    m: &ModuleDecl,
    types: &ProgramTypes,
    globals: &[(String, Type)],
    module: &mut Module,
) {
    for f in &m.functions {
        module
            .functions
            .push(generate_function(f, types, globals, Some(&m.name)));
    }
}

/// `module_prefix` disambiguates a module's functions in the IR's flat
/// function list, since IR functions (unlike the AST) carry no nested
/// namespace of their own.
fn generate_function(
    f: &FunctionDecl,
    types: &ProgramTypes,
    globals: &[(String, Type)],
    module_prefix: Option<&str>,
) -> Function {
    let name = match module_prefix {
        Some(prefix) => format!("{prefix}_{}", f.name),
        None => f.name.clone(),
    };
    let return_type = resolve_type_name_to_type(&f.return_type, types);
    let params: Vec<(String, Type)> = f
        .params
        .iter()
        .map(|p| (p.name.clone(), resolve_type_name_to_type(&p.type_name, types)))
        .collect();

    let function = Function::new(name, return_type, params.clone());
    let entry = function.entry;
    let mut gen = FunctionGen {
        function,
        current: entry,
        loops: Vec::new(),
        env: Env::new(),
        label_counter: 0,
        types,
        globals,
    };

    for (pname, ty) in &params {
        let addr = gen.alloc_slot(ty.clone());
        gen.env.declare(pname.clone(), addr.clone());
        gen.emit(Instruction::store(addr, Operand::symbol(pname.clone(), ty.clone())));
    }

    for stmt in &f.body {
        gen.generate_stmt(stmt);
    }

    if !gen.function.block(gen.current).has_terminator() {
        gen.emit(Instruction::ret(None));
    }

    gen.function
}

/// Re-resolves a `TypeName` the same way `cn_sema::resolve_type_name` does.
/// Any undefined-type diagnostic it could emit was already reported during
/// semantic analysis, which must run clean before IR generation does, so
/// the scratch bag here is always discarded.
fn resolve_type_name_to_type(type_name: &TypeName, types: &ProgramTypes) -> Type {
    let mut scratch = DiagnosticBag::new();
    cn_sema::resolve_type_name(
        type_name,
        types,
        std::path::Path::new(""),
        0,
        0,
        &mut scratch,
    )
}

impl<'a> FunctionGen<'a> {
    fn emit(&mut self, instr: Instruction) {
        self.function.block_mut(self.current).push(instr);
    }

    fn next_label(&mut self, prefix: &str) -> String {
        let n = self.label_counter;
        self.label_counter += 1;
        format!("{prefix}_{n}")
    }

    fn new_block(&mut self, prefix: &str) -> BlockId {
        let label = self.next_label(prefix);
        self.function.new_block(label)
    }

    fn switch_to(&mut self, block: BlockId) {
        self.current = block;
    }

    /// Emits an unconditional branch and records the edge in the function's
    /// pred/succ lists (§4.6: "pred/succ consistent with terminators") —
    /// `Instruction::br` alone only carries the target for rendering, it
    /// doesn't touch the block graph.
    fn emit_br(&mut self, target: BlockId) {
        let from = self.current;
        self.emit(Instruction::br(target));
        self.function.link(from, target);
    }

    /// Same as `emit_br` for the two-target conditional form.
    fn emit_br_cond(&mut self, cond: Operand, if_true: BlockId, if_false: BlockId) {
        let from = self.current;
        self.emit(Instruction::br_cond(cond, if_true, if_false));
        self.function.link(from, if_true);
        self.function.link(from, if_false);
    }

    fn alloc_slot(&mut self, ty: Type) -> Operand {
        let id = self.function.alloc_vreg();
        let ptr_ty = Type::pointer_to(ty.clone());
        let dest = Operand::vreg(id, ptr_ty);
        self.emit(Instruction::alloca(dest.clone(), ty, None));
        dest
    }

    fn lookup_address(&self, name: &str) -> Operand {
        if let Some(addr) = self.env.lookup(name) {
            return addr.clone();
        }
        let ty = self
            .globals
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.clone())
            .unwrap_or(Type::Unknown);
        Operand::symbol(name.to_string(), Type::pointer_to(ty))
    }

    fn generate_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => {
                self.env.push();
                for s in stmts {
                    self.generate_stmt(s);
                }
                self.env.pop();
            }
            Stmt::VarDecl(v) => {
                let ty = v.resolved_type.clone();
                let addr = self.alloc_slot(ty.clone());
                self.env.declare(v.name.clone(), addr.clone());
                if let Some(init) = &v.init {
                    let value = self.generate_expr(init);
                    self.emit(Instruction::store(addr, value));
                }
            }
            Stmt::Expr(e) => {
                self.generate_expr(e);
            }
            Stmt::Return { value, .. } => {
                let operand = value.as_ref().map(|e| self.generate_expr(e));
                self.emit(Instruction::ret(operand));
            }
            Stmt::Break(_) => {
                if let Some(ctx) = self.loops.last() {
                    let target = ctx.break_target;
                    self.emit_br(target);
                }
            }
            Stmt::Continue(_) => {
                if let Some(ctx) = self.loops.last() {
                    let target = ctx.continue_target;
                    self.emit_br(target);
                }
            }
            Stmt::If { cond, then_branch, else_branch, .. } => self.generate_if(cond, then_branch, else_branch.as_deref()),
            Stmt::While { cond, body, .. } => self.generate_while(cond, body),
            Stmt::For { init, cond, update, body, .. } => {
                self.generate_for(init.as_deref(), cond.as_ref(), update.as_deref(), body)
            }
            Stmt::Switch { scrutinee, cases, default, .. } => {
                self.generate_switch(scrutinee, cases, default.as_deref())
            }
            Stmt::StructDecl(_) | Stmt::EnumDecl(_) | Stmt::Import(_) => {}
            Stmt::ModuleDecl(_) => {
                // Nested module function declarations are lowered at the
                // module level (`generate_module_decl`), not inline where a
                // `模块` statement happens to appear inside a body.
            }
        }
    }

    fn generate_if(&mut self, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) {
        let cond_value = self.generate_expr(cond);
        let then_block = self.new_block("if_then");
        let else_block = self.new_block("if_else");
        let merge_block = self.new_block("if_merge");
        self.emit_br_cond(cond_value, then_block, else_block);

        self.switch_to(then_block);
        self.generate_stmt(then_branch);
        if !self.function.block(self.current).has_terminator() {
            self.emit_br(merge_block);
        }

        self.switch_to(else_block);
        if let Some(e) = else_branch {
            self.generate_stmt(e);
        }
        if !self.function.block(self.current).has_terminator() {
            self.emit_br(merge_block);
        }

        self.switch_to(merge_block);
    }

    fn generate_while(&mut self, cond: &Expr, body: &Stmt) {
        let cond_block = self.new_block("while_cond");
        let body_block = self.new_block("while_body");
        let exit_block = self.new_block("while_exit");

        self.emit_br(cond_block);
        self.switch_to(cond_block);
        let cond_value = self.generate_expr(cond);
        self.emit_br_cond(cond_value, body_block, exit_block);

        self.switch_to(body_block);
        self.loops.push(LoopContext { continue_target: cond_block, break_target: exit_block });
        self.generate_stmt(body);
        self.loops.pop();
        if !self.function.block(self.current).has_terminator() {
            self.emit_br(cond_block);
        }

        self.switch_to(exit_block);
    }

    fn generate_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        update: Option<&Stmt>,
        body: &Stmt,
    ) {
        self.env.push();
        if let Some(s) = init {
            self.generate_stmt(s);
        }

        let cond_block = self.new_block("for_cond");
        let body_block = self.new_block("for_body");
        let update_block = self.new_block("for_update");
        let exit_block = self.new_block("for_exit");

        self.emit_br(cond_block);
        self.switch_to(cond_block);
        match cond {
            Some(c) => {
                let value = self.generate_expr(c);
                self.emit_br_cond(value, body_block, exit_block);
            }
            None => self.emit_br(body_block),
        }

        self.switch_to(body_block);
        self.loops.push(LoopContext { continue_target: update_block, break_target: exit_block });
        self.generate_stmt(body);
        self.loops.pop();
        if !self.function.block(self.current).has_terminator() {
            self.emit_br(update_block);
        }

        self.switch_to(update_block);
        if let Some(s) = update {
            self.generate_stmt(s);
        }
        if !self.function.block(self.current).has_terminator() {
            self.emit_br(cond_block);
        }

        self.switch_to(exit_block);
        self.env.pop();
    }

    fn generate_switch(
        &mut self,
        scrutinee: &Expr,
        cases: &[cn_ast::SwitchCase],
        default: Option<&[Stmt]>,
    ) {
        let scrutinee_value = self.generate_expr(scrutinee);
        let merge_block = self.new_block("switch_merge");

        let mut next_check = self.current;
        for case in cases {
            self.switch_to(next_check);
            let check_block = self.current;
            let body_block = self.new_block("case_body");
            next_check = self.new_block("switch_check");

            self.switch_to(check_block);
            let eq_id = self.function.alloc_vreg();
            let eq_dest = Operand::vreg(eq_id, Type::Bool);
            self.emit(Instruction::binary(
                Opcode::Eq,
                eq_dest.clone(),
                scrutinee_value.clone(),
                Operand::imm_int(case.value),
            ));
            self.emit_br_cond(eq_dest, body_block, next_check);

            self.switch_to(body_block);
            self.env.push();
            for s in &case.body {
                self.generate_stmt(s);
            }
            self.env.pop();
            if !self.function.block(self.current).has_terminator() {
                self.emit_br(merge_block);
            }
        }

        self.switch_to(next_check);
        if let Some(stmts) = default {
            self.env.push();
            for s in stmts {
                self.generate_stmt(s);
            }
            self.env.pop();
        }
        if !self.function.block(self.current).has_terminator() {
            self.emit_br(merge_block);
        }

        self.switch_to(merge_block);
    }

    /// Lowers `expr`, returning an operand holding its *value* (loaded, not
    /// an address) except where an lvalue address is what the caller needs
    /// (assignment targets, member/index bases), which call
    /// `generate_lvalue_address` directly instead.
    fn generate_expr(&mut self, expr: &Expr) -> Operand {
        match &expr.kind {
            ExprKind::IntLiteral(n) => Operand { kind: crate::operand::OperandKind::ImmInt(*n), ty: expr.ty.clone() },
            ExprKind::FloatLiteral(n) => Operand::imm_float(*n),
            ExprKind::BoolLiteral(b) => Operand::imm_bool(*b),
            ExprKind::StringLiteral(s) => Operand::imm_string(s.clone()),
            ExprKind::Identifier(name) => {
                let addr = self.lookup_address(name);
                self.load(addr, expr.ty.clone())
            }
            ExprKind::Binary { op, left, right } => self.generate_binary(*op, left, right, expr.ty.clone()),
            ExprKind::Logical { op, left, right } => self.generate_logical(*op, left, right),
            ExprKind::Unary { op, operand } => self.generate_unary(*op, operand, expr.ty.clone()),
            ExprKind::Assignment { target, value } => {
                let rhs = self.generate_expr(value);
                let addr = self.generate_lvalue_address(target);
                self.emit(Instruction::store(addr, rhs.clone()));
                rhs
            }
            ExprKind::Call { callee, args } => self.generate_call(callee, args, expr.ty.clone()),
            ExprKind::ArrayLiteral(elements) => self.generate_array_literal(elements, expr.ty.clone()),
            ExprKind::Index { .. } => {
                let addr = self.generate_lvalue_address(expr);
                self.load(addr, expr.ty.clone())
            }
            ExprKind::Member { .. } => {
                let addr = self.generate_lvalue_address(expr);
                self.load(addr, expr.ty.clone())
            }
            ExprKind::StructLiteral { type_name, fields } => {
                self.generate_struct_literal(type_name, fields, expr.ty.clone())
            }
            ExprKind::MemoryIntrinsic(intrinsic) => self.generate_memory_intrinsic(intrinsic, expr.ty.clone()),
        }
    }

    fn load(&mut self, addr: Operand, ty: Type) -> Operand {
        let id = self.function.alloc_vreg();
        let dest = Operand::vreg(id, ty);
        self.emit(Instruction::load(dest.clone(), addr));
        dest
    }

    /// Resolves `expr` to the *address* it names, for assignment targets
    /// and as the base of a subsequent load/store — identifiers resolve to
    /// their slot directly; member/index compute a `gep` off their base's
    /// address.
    fn generate_lvalue_address(&mut self, expr: &Expr) -> Operand {
        match &expr.kind {
            ExprKind::Identifier(name) => self.lookup_address(name),
            ExprKind::Unary { op: UnaryOp::Deref, operand } => self.generate_expr(operand),
            ExprKind::Member { object, field, arrow } => {
                let base_addr = if *arrow {
                    self.generate_expr(object)
                } else {
                    self.generate_lvalue_address(object)
                };
                let struct_name = match object.ty.pointee().cloned().unwrap_or_else(|| object.ty.clone()) {
                    Type::Struct(name) => name,
                    _ => String::new(),
                };
                let field_index = self
                    .types
                    .find_struct(&struct_name)
                    .and_then(|s| s.fields.iter().position(|f| f.name == *field))
                    .unwrap_or(0);
                let id = self.function.alloc_vreg();
                let dest = Operand::vreg(id, Type::pointer_to(expr.ty.clone()));
                self.emit(Instruction::gep(dest.clone(), base_addr, Operand::imm_int(field_index as i64)));
                dest
            }
            ExprKind::Index { base, index } => {
                // Arrays decay to their base pointer at allocation time
                // (`generate_array_literal`), so a base's *value* is always
                // the address to index from, whether it's array- or
                // pointer-typed.
                let base_addr = self.generate_expr(base);
                let index_value = self.generate_expr(index);
                let id = self.function.alloc_vreg();
                let dest = Operand::vreg(id, Type::pointer_to(expr.ty.clone()));
                self.emit(Instruction::gep(dest.clone(), base_addr, index_value));
                dest
            }
            _ => self.generate_expr(expr),
        }
    }

    fn generate_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, ty: Type) -> Operand {
        let lhs = self.generate_expr(left);
        let rhs = self.generate_expr(right);
        let opcode = match op {
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Sub => Opcode::Sub,
            BinaryOp::Mul => Opcode::Mul,
            BinaryOp::Div => Opcode::Div,
            BinaryOp::Mod => Opcode::Mod,
            BinaryOp::BitAnd => Opcode::And,
            BinaryOp::BitOr => Opcode::Or,
            BinaryOp::BitXor => Opcode::Xor,
            BinaryOp::Shl => Opcode::Shl,
            BinaryOp::Shr => Opcode::Shr,
            BinaryOp::Eq => Opcode::Eq,
            BinaryOp::Ne => Opcode::Ne,
            BinaryOp::Lt => Opcode::Lt,
            BinaryOp::Le => Opcode::Le,
            BinaryOp::Gt => Opcode::Gt,
            BinaryOp::Ge => Opcode::Ge,
        };
        let id = self.function.alloc_vreg();
        let dest = Operand::vreg(id, ty);
        self.emit(Instruction::binary(opcode, dest.clone(), lhs, rhs));
        dest
    }

    /// Three-block diamond (§4.6): evaluate LHS, branch, evaluate RHS only
    /// if short-circuiting doesn't already decide the result, merge through
    /// a stack slot written on both incoming edges.
    fn generate_logical(&mut self, op: LogicalOp, left: &Expr, right: &Expr) -> Operand {
        let slot = self.alloc_slot(Type::Bool);
        let lhs = self.generate_expr(left);

        let rhs_block = self.new_block("logic_rhs");
        let merge_block = self.new_block("logic_merge");

        match op {
            LogicalOp::And => {
                self.emit(Instruction::store(slot.clone(), lhs.clone()));
                self.emit_br_cond(lhs, rhs_block, merge_block);
            }
            LogicalOp::Or => {
                self.emit(Instruction::store(slot.clone(), lhs.clone()));
                self.emit_br_cond(lhs, merge_block, rhs_block);
            }
        }

        self.switch_to(rhs_block);
        let rhs = self.generate_expr(right);
        self.emit(Instruction::store(slot.clone(), rhs));
        if !self.function.block(self.current).has_terminator() {
            self.emit_br(merge_block);
        }

        self.switch_to(merge_block);
        self.load(slot, Type::Bool)
    }

    fn generate_unary(&mut self, op: UnaryOp, operand: &Expr, ty: Type) -> Operand {
        match op {
            UnaryOp::AddressOf => self.generate_lvalue_address(operand),
            UnaryOp::Deref => {
                let addr = self.generate_expr(operand);
                self.load(addr, ty)
            }
            UnaryOp::Not => {
                let value = self.generate_expr(operand);
                let id = self.function.alloc_vreg();
                let dest = Operand::vreg(id, ty);
                self.emit(Instruction::unary(Opcode::Not, dest.clone(), value));
                dest
            }
            UnaryOp::Neg => {
                let value = self.generate_expr(operand);
                let id = self.function.alloc_vreg();
                let dest = Operand::vreg(id, ty);
                self.emit(Instruction::unary(Opcode::Neg, dest.clone(), value));
                dest
            }
            UnaryOp::BitNot => {
                let value = self.generate_expr(operand);
                let id = self.function.alloc_vreg();
                let dest = Operand::vreg(id, ty);
                self.emit(Instruction::unary(Opcode::Not, dest.clone(), value));
                dest
            }
        }
    }

    fn generate_call(&mut self, callee: &Expr, args: &[Expr], ty: Type) -> Operand {
        let callee_name = match &callee.kind {
            ExprKind::Identifier(name) => name.clone(),
            _ => String::new(),
        };
        let arg_values: Vec<Operand> = args.iter().map(|a| self.generate_expr(a)).collect();
        let callee_operand = Operand::symbol(callee_name, callee.ty.clone());
        if matches!(ty, Type::Void) {
            self.emit(Instruction::call(None, callee_operand, arg_values, Type::Void));
            Operand::none()
        } else {
            let id = self.function.alloc_vreg();
            let dest = Operand::vreg(id, ty.clone());
            self.emit(Instruction::call(Some(dest.clone()), callee_operand, arg_values, ty));
            dest
        }
    }

    /// §4.6: array allocation goes through the runtime intrinsic rather
    /// than a raw `alloca`, since the element count isn't always known at
    /// compile time once arrays flow through function calls.
    fn generate_array_literal(&mut self, elements: &[Expr], ty: Type) -> Operand {
        let element_ty = ty.element_type().cloned().unwrap_or(Type::Unknown);
        let element_size = element_ty.size_of().unwrap_or(8) as i64;
        let count = elements.len() as i64;

        let id = self.function.alloc_vreg();
        let dest = Operand::vreg(id, ty);
        self.emit(Instruction::call(
            Some(dest.clone()),
            Operand::symbol("cn_rt_array_alloc".to_string(), Type::Unknown),
            vec![Operand::imm_int(element_size), Operand::imm_int(count)],
            Type::pointer_to(element_ty.clone()),
        ));

        for (i, element) in elements.iter().enumerate() {
            let value = self.generate_expr(element);
            let elem_id = self.function.alloc_vreg();
            let elem_addr = Operand::vreg(elem_id, Type::pointer_to(element_ty.clone()));
            self.emit(Instruction::gep(elem_addr.clone(), dest.clone(), Operand::imm_int(i as i64)));
            self.emit(Instruction::store(elem_addr, value));
        }

        dest
    }

    fn generate_struct_literal(&mut self, type_name: &str, fields: &StructLiteralFields, ty: Type) -> Operand {
        let slot = self.alloc_slot(ty);
        let declared = self
            .types
            .find_struct(type_name)
            .map(|s| s.fields.iter().map(|f| f.name.clone()).collect::<Vec<_>>())
            .unwrap_or_default();

        match fields {
            StructLiteralFields::Positional(values) => {
                for (i, value_expr) in values.iter().enumerate() {
                    let value = self.generate_expr(value_expr);
                    self.store_field(&slot, i, value);
                }
            }
            StructLiteralFields::Named(named) => {
                for (field_name, value_expr) in named {
                    let index = declared.iter().position(|n| n == field_name).unwrap_or(0);
                    let value = self.generate_expr(value_expr);
                    self.store_field(&slot, index, value);
                }
            }
        }

        self.load(slot, Type::Struct(type_name.to_string()))
    }

    fn store_field(&mut self, struct_slot: &Operand, field_index: usize, value: Operand) {
        let id = self.function.alloc_vreg();
        let field_addr = Operand::vreg(id, Type::pointer_to(value.ty.clone()));
        self.emit(Instruction::gep(field_addr.clone(), struct_slot.clone(), Operand::imm_int(field_index as i64)));
        self.emit(Instruction::store(field_addr, value));
    }

    fn generate_memory_intrinsic(&mut self, intrinsic: &MemoryIntrinsic, ty: Type) -> Operand {
        let mut call = |gen: &mut Self, name: &str, args: Vec<Operand>, result_ty: Type| -> Operand {
            if matches!(result_ty, Type::Void) {
                gen.emit(Instruction::call(None, Operand::symbol(name.to_string(), Type::Unknown), args, Type::Void));
                Operand::none()
            } else {
                let id = gen.function.alloc_vreg();
                let dest = Operand::vreg(id, result_ty.clone());
                gen.emit(Instruction::call(Some(dest.clone()), Operand::symbol(name.to_string(), Type::Unknown), args, result_ty));
                dest
            }
        };

        match intrinsic {
            MemoryIntrinsic::ReadMemory { address } => {
                let addr = self.generate_expr(address);
                call(self, "cn_rt_memory_read", vec![addr], ty)
            }
            MemoryIntrinsic::WriteMemory { address, value } => {
                let addr = self.generate_expr(address);
                let val = self.generate_expr(value);
                call(self, "cn_rt_memory_write", vec![addr, val], Type::Void)
            }
            MemoryIntrinsic::MemoryCopy { dest, src, len } => {
                let d = self.generate_expr(dest);
                let s = self.generate_expr(src);
                let l = self.generate_expr(len);
                call(self, "cn_rt_memory_copy", vec![d, s, l], Type::Void)
            }
            MemoryIntrinsic::MemorySet { dest, value, len } => {
                let d = self.generate_expr(dest);
                let v = self.generate_expr(value);
                let l = self.generate_expr(len);
                call(self, "cn_rt_memory_set_safe", vec![d, v, l], Type::Void)
            }
            MemoryIntrinsic::MapMemory { address, len } => {
                let a = self.generate_expr(address);
                let l = self.generate_expr(len);
                call(self, "cn_rt_map_memory", vec![a, l], ty)
            }
            MemoryIntrinsic::UnmapMemory { address, len } => {
                let a = self.generate_expr(address);
                let l = self.generate_expr(len);
                call(self, "cn_rt_unmap_memory", vec![a, l], ty)
            }
            MemoryIntrinsic::InlineAsm { template } => {
                call(self, "cn_rt_inline_asm", vec![Operand::imm_string(template.clone())], Type::Void)
            }
        }
    }
}
