//! Freestanding-mode checking (§4.5): rejects calls to the hosted-runtime
//! I/O surface when compiling with `--freestanding`, since those symbols
//! assume a C standard library the freestanding runtime doesn't link.
//!
//! There's no dedicated error code for this in the closed §6 set, so
//! violations are reported as [`ErrorCode::SemTypeMismatch`] — the closest
//! existing category ("this construct isn't valid in this context") — with
//! a message that names the actual problem.

use cn_ast::{Expr, ExprKind, FunctionDecl, ModuleDecl, Program, Stmt};
use cn_diagnostics::{DiagnosticBag, ErrorCode};
use std::path::Path;

/// Hosted I/O entry points the standard runtime exposes; forbidden once
/// `--freestanding` is set (§4.9).
const FORBIDDEN_HOSTED_CALLS: &[&str] = &["打印", "打印行", "读取整数", "读取行"];

pub fn check_freestanding(program: &Program, filename: &Path, diagnostics: &mut DiagnosticBag) {
    for f in &program.functions {
        check_function(f, filename, diagnostics);
    }
    for m in &program.modules {
        check_module(m, filename, diagnostics);
    }
}

fn check_module(m: &ModuleDecl, filename: &Path, diagnostics: &mut DiagnosticBag) {
    for stmt in &m.statements {
        check_stmt(stmt, filename, diagnostics);
    }
    for f in &m.functions {
        check_function(f, filename, diagnostics);
    }
}

fn check_function(f: &FunctionDecl, filename: &Path, diagnostics: &mut DiagnosticBag) {
    for stmt in &f.body {
        check_stmt(stmt, filename, diagnostics);
    }
}

fn check_stmt(stmt: &Stmt, filename: &Path, diagnostics: &mut DiagnosticBag) {
    match stmt {
        Stmt::Block(stmts) => {
            for s in stmts {
                check_stmt(s, filename, diagnostics);
            }
        }
        Stmt::VarDecl(v) => {
            if let Some(init) = &v.init {
                check_expr(init, filename, diagnostics);
            }
        }
        Stmt::Expr(e) => check_expr(e, filename, diagnostics),
        Stmt::Return { value, .. } => {
            if let Some(e) = value {
                check_expr(e, filename, diagnostics);
            }
        }
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Import(_) | Stmt::StructDecl(_) | Stmt::EnumDecl(_) => {}
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            check_expr(cond, filename, diagnostics);
            check_stmt(then_branch, filename, diagnostics);
            if let Some(e) = else_branch {
                check_stmt(e, filename, diagnostics);
            }
        }
        Stmt::While { cond, body, .. } => {
            check_expr(cond, filename, diagnostics);
            check_stmt(body, filename, diagnostics);
        }
        Stmt::For {
            init,
            cond,
            update,
            body,
            ..
        } => {
            if let Some(s) = init {
                check_stmt(s, filename, diagnostics);
            }
            if let Some(c) = cond {
                check_expr(c, filename, diagnostics);
            }
            if let Some(s) = update {
                check_stmt(s, filename, diagnostics);
            }
            check_stmt(body, filename, diagnostics);
        }
        Stmt::Switch { scrutinee, cases, default, .. } => {
            check_expr(scrutinee, filename, diagnostics);
            for case in cases {
                for s in &case.body {
                    check_stmt(s, filename, diagnostics);
                }
            }
            if let Some(d) = default {
                for s in d {
                    check_stmt(s, filename, diagnostics);
                }
            }
        }
        Stmt::ModuleDecl(m) => check_module(m, filename, diagnostics),
    }
}

fn check_expr(expr: &Expr, filename: &Path, diagnostics: &mut DiagnosticBag) {
    match &expr.kind {
        ExprKind::Call { callee, args } => {
            if let ExprKind::Identifier(name) = &callee.kind {
                if FORBIDDEN_HOSTED_CALLS.contains(&name.as_str()) {
                    diagnostics.error(
                        ErrorCode::SemTypeMismatch,
                        filename.to_path_buf(),
                        expr.span.line,
                        expr.span.column,
                        format!("独立模式下不允许调用宿主运行时函数: {name}"),
                    );
                }
            }
            check_expr(callee, filename, diagnostics);
            for a in args {
                check_expr(a, filename, diagnostics);
            }
        }
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            check_expr(left, filename, diagnostics);
            check_expr(right, filename, diagnostics);
        }
        ExprKind::Unary { operand, .. } => check_expr(operand, filename, diagnostics),
        ExprKind::Assignment { target, value } => {
            check_expr(target, filename, diagnostics);
            check_expr(value, filename, diagnostics);
        }
        ExprKind::ArrayLiteral(elements) => {
            for e in elements {
                check_expr(e, filename, diagnostics);
            }
        }
        ExprKind::Index { base, index } => {
            check_expr(base, filename, diagnostics);
            check_expr(index, filename, diagnostics);
        }
        ExprKind::Member { object, .. } => check_expr(object, filename, diagnostics),
        ExprKind::StructLiteral { fields, .. } => match fields {
            cn_ast::StructLiteralFields::Positional(es) => {
                for e in es {
                    check_expr(e, filename, diagnostics);
                }
            }
            cn_ast::StructLiteralFields::Named(fs) => {
                for (_, e) in fs {
                    check_expr(e, filename, diagnostics);
                }
            }
        },
        ExprKind::MemoryIntrinsic(_) => {
            // Memory intrinsics are themselves freestanding-only constructs
            // (§4.5); they carry no hosted-call surface to reject here.
        }
        ExprKind::IntLiteral(_)
        | ExprKind::FloatLiteral(_)
        | ExprKind::BoolLiteral(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::Identifier(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cn_ast::{Span, TypeName};

    fn call(name: &str) -> Stmt {
        Stmt::Expr(Expr::new(
            ExprKind::Call {
                callee: Box::new(Expr::new(ExprKind::Identifier(name.to_string()), Span::new(1, 1))),
                args: vec![],
            },
            Span::new(1, 1),
        ))
    }

    #[test]
    fn forbidden_hosted_call_is_rejected() {
        let program = Program {
            functions: vec![FunctionDecl {
                name: "主程序".into(),
                params: vec![],
                return_type: TypeName::Int,
                body: vec![call("打印")],
                is_interrupt_handler: false,
                interrupt_vector: None,
                span: Span::new(1, 1),
            }],
            ..Program::new()
        };
        let mut diags = DiagnosticBag::new();
        check_freestanding(&program, Path::new("t.cn"), &mut diags);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn ordinary_call_is_allowed() {
        let program = Program {
            functions: vec![FunctionDecl {
                name: "主程序".into(),
                params: vec![],
                return_type: TypeName::Int,
                body: vec![call("自定义函数")],
                is_interrupt_handler: false,
                interrupt_vector: None,
                span: Span::new(1, 1),
            }],
            ..Program::new()
        };
        let mut diags = DiagnosticBag::new();
        check_freestanding(&program, Path::new("t.cn"), &mut diags);
        assert!(diags.is_empty());
    }
}
