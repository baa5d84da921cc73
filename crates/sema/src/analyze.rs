//! Pass 2+3 — name resolution and type checking (§4.5), fused into a single
//! mutable traversal of `Program`.
//!
//! The AST has no dedicated slot to stash "the symbol this identifier
//! resolved to" separately from its inferred type, so rather than invent
//! one, resolution and type checking share one walk: every `Expr` is
//! resolved against the scope tree built by [`crate::builder`] and typed in
//! the same step, bottom-up. The walk mirrors `builder`'s traversal
//! exactly, pulling the next child scope positionally via
//! [`ScopeTree::nth_child`] instead of creating new ones.

use crate::scope::{ScopeId, ScopeTree};
use crate::typename::{ProgramTypes, resolve_type_name};
use cn_ast::{
    BinaryOp, Expr, ExprKind, FunctionDecl, LogicalOp, MemoryIntrinsic, ModuleDecl, Program,
    Stmt, StructLiteralFields, UnaryOp, VarDecl,
};
use cn_diagnostics::{DiagnosticBag, ErrorCode};
use cn_types::Type;
use std::path::Path;

pub fn analyze_program(
    program: &mut Program,
    tree: &mut ScopeTree,
    types: &ProgramTypes,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) {
    let global = tree.global();

    for v in &mut program.globals {
        analyze_var_decl(v, tree, global, types, filename, diagnostics);
    }

    // Top-level declaration order in `build_scopes` is structs, enums,
    // globals, functions, modules — child scopes were appended in that
    // same order, so cursor bookkeeping here must match it exactly.
    let mut cursor = 0usize;
    for f in &mut program.functions {
        analyze_function(f, tree, global, &mut cursor, types, filename, diagnostics);
    }
    for m in &mut program.modules {
        analyze_module(m, tree, global, &mut cursor, types, filename, diagnostics);
    }
}

fn analyze_function(
    f: &mut FunctionDecl,
    tree: &mut ScopeTree,
    scope: ScopeId,
    cursor: &mut usize,
    types: &ProgramTypes,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) {
    let func_scope = tree.nth_child(scope, *cursor);
    *cursor += 1;
    let mut child_cursor = 0usize;
    for stmt in &mut f.body {
        analyze_stmt(
            stmt,
            tree,
            func_scope,
            &mut child_cursor,
            types,
            filename,
            diagnostics,
        );
    }
}

fn analyze_module(
    m: &mut ModuleDecl,
    tree: &mut ScopeTree,
    scope: ScopeId,
    cursor: &mut usize,
    types: &ProgramTypes,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) {
    let mod_scope = tree.nth_child(scope, *cursor);
    *cursor += 1;
    let mut child_cursor = 0usize;
    for stmt in &mut m.statements {
        analyze_stmt(
            stmt,
            tree,
            mod_scope,
            &mut child_cursor,
            types,
            filename,
            diagnostics,
        );
    }
    let mut fn_cursor = 0usize;
    for f in &mut m.functions {
        analyze_function(f, tree, mod_scope, &mut fn_cursor, types, filename, diagnostics);
    }
}

fn analyze_var_decl(
    v: &mut VarDecl,
    tree: &mut ScopeTree,
    scope: ScopeId,
    types: &ProgramTypes,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) {
    let declared = v.declared_type.as_ref().map(|tn| {
        resolve_type_name(tn, types, filename, v.span.line, v.span.column, diagnostics)
    });

    let init_ty = v.init.as_mut().map(|e| {
        analyze_expr(e, tree, scope, types, filename, diagnostics);
        e.ty.clone()
    });

    let resolved = match (declared, init_ty) {
        (Some(d), Some(i)) => {
            if !d.compatible(&i) {
                diagnostics.error(
                    ErrorCode::SemTypeMismatch,
                    filename.to_path_buf(),
                    v.span.line,
                    v.span.column,
                    format!("变量 {} 的初始值类型与声明类型不匹配: 期望 {d}, 实际 {i}", v.name),
                );
            }
            d
        }
        (Some(d), None) => d,
        (None, Some(i)) => i,
        (None, None) => Type::Unknown,
    };

    v.resolved_type = resolved.clone();
    if let Some(sym) = tree.resolve_mut(scope, &v.name) {
        sym.ty = resolved;
    }
}

/// Mirrors `builder::build_stmt`'s branching exactly; every branch that
/// creates a child scope there pulls the next positional child here
/// instead.
fn analyze_stmt(
    stmt: &mut Stmt,
    tree: &mut ScopeTree,
    scope: ScopeId,
    cursor: &mut usize,
    types: &ProgramTypes,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) {
    match stmt {
        Stmt::Block(stmts) => {
            let child = tree.nth_child(scope, *cursor);
            *cursor += 1;
            let mut child_cursor = 0usize;
            for s in stmts {
                analyze_stmt(s, tree, child, &mut child_cursor, types, filename, diagnostics);
            }
        }
        Stmt::VarDecl(v) => analyze_var_decl(v, tree, scope, types, filename, diagnostics),
        Stmt::Expr(e) => analyze_expr(e, tree, scope, types, filename, diagnostics),
        Stmt::Return { value, .. } => {
            if let Some(e) = value {
                analyze_expr(e, tree, scope, types, filename, diagnostics);
            }
        }
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Import(_) => {}
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            analyze_expr(cond, tree, scope, types, filename, diagnostics);
            check_bool_condition(cond, filename, diagnostics);
            analyze_stmt(then_branch, tree, scope, cursor, types, filename, diagnostics);
            if let Some(e) = else_branch {
                analyze_stmt(e, tree, scope, cursor, types, filename, diagnostics);
            }
        }
        Stmt::While { cond, body, .. } => {
            analyze_expr(cond, tree, scope, types, filename, diagnostics);
            check_bool_condition(cond, filename, diagnostics);
            analyze_stmt(body, tree, scope, cursor, types, filename, diagnostics);
        }
        Stmt::For {
            init,
            cond,
            update,
            body,
            ..
        } => {
            let child = tree.nth_child(scope, *cursor);
            *cursor += 1;
            let mut child_cursor = 0usize;
            if let Some(init_stmt) = init {
                analyze_stmt(init_stmt, tree, child, &mut child_cursor, types, filename, diagnostics);
            }
            if let Some(c) = cond {
                analyze_expr(c, tree, child, types, filename, diagnostics);
                check_bool_condition(c, filename, diagnostics);
            }
            if let Some(u) = update {
                analyze_stmt(u, tree, child, &mut child_cursor, types, filename, diagnostics);
            }
            analyze_stmt(body, tree, child, &mut child_cursor, types, filename, diagnostics);
        }
        Stmt::Switch {
            scrutinee,
            cases,
            default,
            ..
        } => {
            analyze_expr(scrutinee, tree, scope, types, filename, diagnostics);
            if !scrutinee.ty.is_unknown() && scrutinee.ty != Type::Int {
                diagnostics.error(
                    ErrorCode::SemTypeMismatch,
                    filename.to_path_buf(),
                    scrutinee.span.line,
                    scrutinee.span.column,
                    format!("switch 的判别表达式必须是整数类型, 实际为 {}", scrutinee.ty),
                );
            }
            for case in cases {
                let child = tree.nth_child(scope, *cursor);
                *cursor += 1;
                let mut child_cursor = 0usize;
                for s in &mut case.body {
                    analyze_stmt(s, tree, child, &mut child_cursor, types, filename, diagnostics);
                }
            }
            if let Some(d) = default {
                let child = tree.nth_child(scope, *cursor);
                *cursor += 1;
                let mut child_cursor = 0usize;
                for s in d {
                    analyze_stmt(s, tree, child, &mut child_cursor, types, filename, diagnostics);
                }
            }
        }
        Stmt::StructDecl(_) | Stmt::EnumDecl(_) => {}
        Stmt::ModuleDecl(m) => {
            analyze_module(m, tree, scope, cursor, types, filename, diagnostics);
        }
    }
}

fn check_bool_condition(cond: &Expr, filename: &Path, diagnostics: &mut DiagnosticBag) {
    if !cond.ty.is_unknown() && cond.ty != Type::Bool {
        diagnostics.error(
            ErrorCode::SemTypeMismatch,
            filename.to_path_buf(),
            cond.span.line,
            cond.span.column,
            format!("条件表达式必须是布尔类型, 实际为 {}", cond.ty),
        );
    }
}

/// Bottom-up type inference plus identifier resolution, filling `expr.ty`.
/// Leaves `Type::Unknown` (without an extra diagnostic) whenever an operand
/// already carries `Unknown` from a prior error, so one mistake doesn't
/// cascade into a wall of follow-on mismatches.
fn analyze_expr(
    expr: &mut Expr,
    tree: &mut ScopeTree,
    scope: ScopeId,
    types: &ProgramTypes,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) {
    let line = expr.span.line;
    let column = expr.span.column;
    expr.ty = match &mut expr.kind {
        ExprKind::IntLiteral(_) => Type::Int,
        ExprKind::FloatLiteral(_) => Type::Float,
        ExprKind::BoolLiteral(_) => Type::Bool,
        ExprKind::StringLiteral(_) => Type::String,

        ExprKind::Identifier(name) => match tree.resolve(scope, name) {
            Some(sym) => sym.ty.clone(),
            None => {
                diagnostics.error(
                    ErrorCode::SemUndefinedIdentifier,
                    filename.to_path_buf(),
                    line,
                    column,
                    format!("未定义的标识符: {name}"),
                );
                Type::Unknown
            }
        },

        ExprKind::Binary { op, left, right } => {
            analyze_expr(left, tree, scope, types, filename, diagnostics);
            analyze_expr(right, tree, scope, types, filename, diagnostics);
            binary_result_type(*op, left, right, filename, diagnostics)
        }

        ExprKind::Logical { left, right, .. } => {
            analyze_expr(left, tree, scope, types, filename, diagnostics);
            analyze_expr(right, tree, scope, types, filename, diagnostics);
            for operand in [&*left, &*right] {
                if !operand.ty.is_unknown() && operand.ty != Type::Bool {
                    diagnostics.error(
                        ErrorCode::SemTypeMismatch,
                        filename.to_path_buf(),
                        operand.span.line,
                        operand.span.column,
                        format!("逻辑运算的操作数必须是布尔类型, 实际为 {}", operand.ty),
                    );
                }
            }
            Type::Bool
        }

        ExprKind::Unary { op, operand } => {
            analyze_expr(operand, tree, scope, types, filename, diagnostics);
            unary_result_type(*op, operand, filename, diagnostics)
        }

        ExprKind::Assignment { target, value } => {
            analyze_expr(target, tree, scope, types, filename, diagnostics);
            analyze_expr(value, tree, scope, types, filename, diagnostics);
            if !target.ty.is_unknown() && !value.ty.is_unknown() && !target.ty.compatible(&value.ty) {
                diagnostics.error(
                    ErrorCode::SemTypeMismatch,
                    filename.to_path_buf(),
                    line,
                    column,
                    format!(
                        "赋值类型不匹配: 目标类型 {}, 值类型 {}",
                        target.ty, value.ty
                    ),
                );
            }
            target.ty.clone()
        }

        ExprKind::Call { callee, args } => {
            analyze_expr(callee, tree, scope, types, filename, diagnostics);
            for a in args.iter_mut() {
                analyze_expr(a, tree, scope, types, filename, diagnostics);
            }
            match &callee.ty {
                Type::Function { ret, params } => {
                    if params.len() != args.len() {
                        diagnostics.error(
                            ErrorCode::SemTypeMismatch,
                            filename.to_path_buf(),
                            line,
                            column,
                            format!(
                                "函数调用参数数量不匹配: 期望 {}, 实际 {}",
                                params.len(),
                                args.len()
                            ),
                        );
                    } else {
                        for (p, a) in params.iter().zip(args.iter()) {
                            if !p.is_unknown() && !a.ty.is_unknown() && !p.compatible(&a.ty) {
                                diagnostics.error(
                                    ErrorCode::SemTypeMismatch,
                                    filename.to_path_buf(),
                                    a.span.line,
                                    a.span.column,
                                    format!("调用参数类型不匹配: 期望 {p}, 实际 {}", a.ty),
                                );
                            }
                        }
                    }
                    (**ret).clone()
                }
                Type::Unknown => Type::Unknown,
                other => {
                    diagnostics.error(
                        ErrorCode::SemTypeMismatch,
                        filename.to_path_buf(),
                        line,
                        column,
                        format!("被调用对象不是函数类型: {other}"),
                    );
                    Type::Unknown
                }
            }
        }

        ExprKind::ArrayLiteral(elements) => {
            for e in elements.iter_mut() {
                analyze_expr(e, tree, scope, types, filename, diagnostics);
            }
            let element_ty = elements
                .first()
                .map(|e| e.ty.clone())
                .unwrap_or(Type::Unknown);
            for e in elements.iter().skip(1) {
                if !e.ty.is_unknown() && !element_ty.is_unknown() && !e.ty.compatible(&element_ty) {
                    diagnostics.error(
                        ErrorCode::SemTypeMismatch,
                        filename.to_path_buf(),
                        e.span.line,
                        e.span.column,
                        format!("数组元素类型不一致: 期望 {element_ty}, 实际 {}", e.ty),
                    );
                }
            }
            Type::array_of(element_ty, elements.len())
        }

        ExprKind::Index { base, index } => {
            analyze_expr(base, tree, scope, types, filename, diagnostics);
            analyze_expr(index, tree, scope, types, filename, diagnostics);
            if !index.ty.is_unknown() && index.ty != Type::Int {
                diagnostics.error(
                    ErrorCode::SemTypeMismatch,
                    filename.to_path_buf(),
                    index.span.line,
                    index.span.column,
                    format!("数组下标必须是整数类型, 实际为 {}", index.ty),
                );
            }
            match base.ty.element_type() {
                Some(elem) => elem.clone(),
                None if base.ty.is_unknown() => Type::Unknown,
                None => {
                    diagnostics.error(
                        ErrorCode::SemTypeMismatch,
                        filename.to_path_buf(),
                        base.span.line,
                        base.span.column,
                        format!("下标运算的对象既不是数组也不是指针: {}", base.ty),
                    );
                    Type::Unknown
                }
            }
        }

        ExprKind::Member { object, field, arrow } => {
            analyze_expr(object, tree, scope, types, filename, diagnostics);
            let struct_ty = if *arrow {
                object.ty.pointee().cloned()
            } else {
                Some(object.ty.clone())
            };
            match struct_ty {
                Some(Type::Struct(name)) => {
                    match types.field_type(&name, field, filename, line, column, diagnostics) {
                        Some(ty) => ty,
                        None => {
                            diagnostics.error(
                                ErrorCode::SemUndefinedIdentifier,
                                filename.to_path_buf(),
                                line,
                                column,
                                format!("结构体 {name} 没有字段 {field}"),
                            );
                            Type::Unknown
                        }
                    }
                }
                Some(Type::Unknown) | None if object.ty.is_unknown() => Type::Unknown,
                _ => {
                    diagnostics.error(
                        ErrorCode::SemTypeMismatch,
                        filename.to_path_buf(),
                        line,
                        column,
                        format!("成员访问的对象不是结构体: {}", object.ty),
                    );
                    Type::Unknown
                }
            }
        }

        ExprKind::StructLiteral { type_name, fields } => {
            analyze_struct_literal(type_name, fields, tree, scope, types, filename, line, column, diagnostics)
        }

        ExprKind::MemoryIntrinsic(intrinsic) => {
            analyze_memory_intrinsic(intrinsic, tree, scope, types, filename, diagnostics)
        }
    };
}

fn analyze_struct_literal(
    type_name: &str,
    fields: &mut StructLiteralFields,
    tree: &mut ScopeTree,
    scope: ScopeId,
    types: &ProgramTypes,
    filename: &Path,
    line: usize,
    column: usize,
    diagnostics: &mut DiagnosticBag,
) -> Type {
    if types.find_struct(type_name).is_none() {
        diagnostics.error(
            ErrorCode::SemUndefinedIdentifier,
            filename.to_path_buf(),
            line,
            column,
            format!("未定义的结构体: {type_name}"),
        );
        match fields {
            StructLiteralFields::Positional(es) => {
                for e in es.iter_mut() {
                    analyze_expr(e, tree, scope, types, filename, diagnostics);
                }
            }
            StructLiteralFields::Named(fs) => {
                for (_, e) in fs.iter_mut() {
                    analyze_expr(e, tree, scope, types, filename, diagnostics);
                }
            }
        }
        return Type::Unknown;
    }

    let declared = types
        .field_types_in_order(type_name, filename, line, column, diagnostics)
        .unwrap_or_default();

    match fields {
        StructLiteralFields::Positional(es) => {
            for e in es.iter_mut() {
                analyze_expr(e, tree, scope, types, filename, diagnostics);
            }
            if es.len() != declared.len() {
                diagnostics.error(
                    ErrorCode::SemTypeMismatch,
                    filename.to_path_buf(),
                    line,
                    column,
                    format!(
                        "结构体 {type_name} 字段数量不匹配: 期望 {}, 实际 {}",
                        declared.len(),
                        es.len()
                    ),
                );
            } else {
                for ((_, decl_ty), e) in declared.iter().zip(es.iter()) {
                    if !decl_ty.is_unknown() && !e.ty.is_unknown() && !decl_ty.compatible(&e.ty) {
                        diagnostics.error(
                            ErrorCode::SemTypeMismatch,
                            filename.to_path_buf(),
                            e.span.line,
                            e.span.column,
                            format!("字段类型不匹配: 期望 {decl_ty}, 实际 {}", e.ty),
                        );
                    }
                }
            }
        }
        StructLiteralFields::Named(fs) => {
            for (name, e) in fs.iter_mut() {
                analyze_expr(e, tree, scope, types, filename, diagnostics);
                match declared.iter().find(|(n, _)| n == name) {
                    Some((_, decl_ty)) => {
                        if !decl_ty.is_unknown() && !e.ty.is_unknown() && !decl_ty.compatible(&e.ty) {
                            diagnostics.error(
                                ErrorCode::SemTypeMismatch,
                                filename.to_path_buf(),
                                e.span.line,
                                e.span.column,
                                format!("字段 {name} 类型不匹配: 期望 {decl_ty}, 实际 {}", e.ty),
                            );
                        }
                    }
                    None => {
                        diagnostics.error(
                            ErrorCode::SemUndefinedIdentifier,
                            filename.to_path_buf(),
                            e.span.line,
                            e.span.column,
                            format!("结构体 {type_name} 没有字段 {name}"),
                        );
                    }
                }
            }
        }
    }

    Type::Struct(type_name.to_string())
}

fn analyze_memory_intrinsic(
    intrinsic: &mut MemoryIntrinsic,
    tree: &mut ScopeTree,
    scope: ScopeId,
    types: &ProgramTypes,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) -> Type {
    let mut check_int = |e: &mut Expr, diagnostics: &mut DiagnosticBag| {
        analyze_expr(e, tree, scope, types, filename, diagnostics);
        if !e.ty.is_unknown() && e.ty != Type::Int {
            diagnostics.error(
                ErrorCode::SemTypeMismatch,
                filename.to_path_buf(),
                e.span.line,
                e.span.column,
                format!("内存操作的地址/长度参数必须是整数类型, 实际为 {}", e.ty),
            );
        }
    };
    match intrinsic {
        MemoryIntrinsic::ReadMemory { address } => {
            check_int(address, diagnostics);
            Type::Int
        }
        MemoryIntrinsic::WriteMemory { address, value } => {
            check_int(address, diagnostics);
            analyze_expr(value, tree, scope, types, filename, diagnostics);
            Type::Void
        }
        MemoryIntrinsic::MemoryCopy { dest, src, len } | MemoryIntrinsic::MemorySet { dest, value: src, len } => {
            check_int(dest, diagnostics);
            check_int(src, diagnostics);
            check_int(len, diagnostics);
            Type::Void
        }
        MemoryIntrinsic::MapMemory { address, len } | MemoryIntrinsic::UnmapMemory { address, len } => {
            check_int(address, diagnostics);
            check_int(len, diagnostics);
            Type::Int
        }
        MemoryIntrinsic::InlineAsm { .. } => Type::Void,
    }
}

fn binary_result_type(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) -> Type {
    if left.ty.is_unknown() || right.ty.is_unknown() {
        return Type::Unknown;
    }
    if op.is_comparison() {
        if !left.ty.compatible(&right.ty) {
            diagnostics.error(
                ErrorCode::SemTypeMismatch,
                filename.to_path_buf(),
                left.span.line,
                left.span.column,
                format!("比较运算的操作数类型不一致: {} 与 {}", left.ty, right.ty),
            );
        }
        return Type::Bool;
    }
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            if !left.ty.is_numeric() || !right.ty.is_numeric() || left.ty != right.ty {
                diagnostics.error(
                    ErrorCode::SemTypeMismatch,
                    filename.to_path_buf(),
                    left.span.line,
                    left.span.column,
                    format!("算术运算的操作数类型不匹配: {} 与 {}", left.ty, right.ty),
                );
                return Type::Unknown;
            }
            left.ty.clone()
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
            if left.ty != Type::Int || right.ty != Type::Int {
                diagnostics.error(
                    ErrorCode::SemTypeMismatch,
                    filename.to_path_buf(),
                    left.span.line,
                    left.span.column,
                    format!("位运算的操作数必须是整数类型: {} 与 {}", left.ty, right.ty),
                );
                return Type::Unknown;
            }
            Type::Int
        }
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            unreachable!("comparisons handled above")
        }
    }
}

fn unary_result_type(
    op: UnaryOp,
    operand: &Expr,
    filename: &Path,
    diagnostics: &mut DiagnosticBag,
) -> Type {
    if operand.ty.is_unknown() {
        return Type::Unknown;
    }
    match op {
        UnaryOp::Not => {
            if operand.ty != Type::Bool {
                diagnostics.error(
                    ErrorCode::SemTypeMismatch,
                    filename.to_path_buf(),
                    operand.span.line,
                    operand.span.column,
                    format!("逻辑非运算的操作数必须是布尔类型, 实际为 {}", operand.ty),
                );
                return Type::Unknown;
            }
            Type::Bool
        }
        UnaryOp::Neg | UnaryOp::BitNot => {
            if !operand.ty.is_numeric() {
                diagnostics.error(
                    ErrorCode::SemTypeMismatch,
                    filename.to_path_buf(),
                    operand.span.line,
                    operand.span.column,
                    format!("一元运算的操作数必须是数值类型, 实际为 {}", operand.ty),
                );
                return Type::Unknown;
            }
            operand.ty.clone()
        }
        UnaryOp::AddressOf => Type::pointer_to(operand.ty.clone()),
        UnaryOp::Deref => match operand.ty.pointee() {
            Some(inner) => inner.clone(),
            None => {
                diagnostics.error(
                    ErrorCode::SemTypeMismatch,
                    filename.to_path_buf(),
                    operand.span.line,
                    operand.span.column,
                    format!("解引用运算的操作数不是指针类型: {}", operand.ty),
                );
                Type::Unknown
            }
        },
    }
}
