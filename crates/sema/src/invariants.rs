//! Whole-function invariants checked after type checking has run (§3, §4.5):
//! interrupt handler shape, and a conservative missing-return check.

use cn_ast::{FunctionDecl, ModuleDecl, Program, Stmt, TypeName, IRQ_MAX};
use cn_diagnostics::{DiagnosticBag, ErrorCode};
use std::path::Path;

pub fn check_invariants(program: &Program, filename: &Path, diagnostics: &mut DiagnosticBag) {
    for f in &program.functions {
        check_function(f, filename, diagnostics);
    }
    for m in &program.modules {
        check_module(m, filename, diagnostics);
    }
}

fn check_module(m: &ModuleDecl, filename: &Path, diagnostics: &mut DiagnosticBag) {
    for f in &m.functions {
        check_function(f, filename, diagnostics);
    }
}

fn check_function(f: &FunctionDecl, filename: &Path, diagnostics: &mut DiagnosticBag) {
    if f.is_interrupt_handler {
        check_interrupt_handler(f, filename, diagnostics);
    }
    if !matches!(f.return_type, TypeName::Void) && !ends_with_return(&f.body) {
        diagnostics.error(
            ErrorCode::SemMissingReturn,
            filename.to_path_buf(),
            f.span.line,
            f.span.column,
            format!("函数 {} 可能在没有返回值的情况下结束", f.name),
        );
    }
}

/// Interrupt handlers take no parameters and declare a vector below
/// `IRQ_MAX` (§3). No dedicated error code exists for either violation, so
/// both are reported as [`ErrorCode::SemTypeMismatch`], the closest
/// existing category.
fn check_interrupt_handler(f: &FunctionDecl, filename: &Path, diagnostics: &mut DiagnosticBag) {
    if !f.params.is_empty() {
        diagnostics.error(
            ErrorCode::SemTypeMismatch,
            filename.to_path_buf(),
            f.span.line,
            f.span.column,
            format!("中断处理函数 {} 不能带有参数", f.name),
        );
    }
    match f.interrupt_vector {
        Some(v) if v < IRQ_MAX => {}
        Some(v) => {
            diagnostics.error(
                ErrorCode::SemTypeMismatch,
                filename.to_path_buf(),
                f.span.line,
                f.span.column,
                format!("中断处理函数 {} 的中断号 {v} 超出范围 (最大 {IRQ_MAX})"),
            );
        }
        None => {
            diagnostics.error(
                ErrorCode::SemTypeMismatch,
                filename.to_path_buf(),
                f.span.line,
                f.span.column,
                format!("中断处理函数 {} 缺少中断号", f.name),
            );
        }
    }
}

/// Conservative, CFG-free check (§4.5): a function is accepted if its last
/// statement is a `return`, or recursively ends in one through a trailing
/// block or an `if`/`else` where both branches end in return. Anything else
/// (a loop as the last statement, a `switch` without covering every path)
/// is flagged even when it happens to be unreachable in practice — the
/// analyzer has no control-flow graph to prove otherwise at this stage.
fn ends_with_return(body: &[Stmt]) -> bool {
    match body.last() {
        Some(Stmt::Return { .. }) => true,
        Some(Stmt::Block(inner)) => ends_with_return(inner),
        Some(Stmt::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        }) => ends_with_return(std::slice::from_ref(then_branch.as_ref()))
            && ends_with_return(std::slice::from_ref(else_branch.as_ref())),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cn_ast::{Expr, ExprKind, Span};

    fn ret() -> Stmt {
        Stmt::Return {
            value: Some(Expr::new(ExprKind::IntLiteral(0), Span::new(1, 1))),
            span: Span::new(1, 1),
        }
    }

    #[test]
    fn trailing_return_is_accepted() {
        assert!(ends_with_return(&[ret()]));
    }

    #[test]
    fn missing_trailing_return_is_rejected() {
        let body = vec![Stmt::Expr(Expr::new(ExprKind::IntLiteral(1), Span::new(1, 1)))];
        assert!(!ends_with_return(&body));
    }

    #[test]
    fn if_else_both_returning_is_accepted() {
        let body = vec![Stmt::If {
            cond: Expr::new(ExprKind::BoolLiteral(true), Span::new(1, 1)),
            then_branch: Box::new(Stmt::Block(vec![ret()])),
            else_branch: Some(Box::new(Stmt::Block(vec![ret()]))),
            span: Span::new(1, 1),
        }];
        assert!(ends_with_return(&body));
    }

    #[test]
    fn if_without_else_is_rejected() {
        let body = vec![Stmt::If {
            cond: Expr::new(ExprKind::BoolLiteral(true), Span::new(1, 1)),
            then_branch: Box::new(Stmt::Block(vec![ret()])),
            else_branch: None,
            span: Span::new(1, 1),
        }];
        assert!(!ends_with_return(&body));
    }

    #[test]
    fn interrupt_handler_with_params_is_rejected() {
        let f = FunctionDecl {
            name: "坏的中断处理_3".into(),
            params: vec![cn_ast::Param {
                name: "x".into(),
                type_name: TypeName::Int,
                is_const: false,
                span: Span::new(1, 1),
            }],
            return_type: TypeName::Void,
            body: vec![Stmt::Return { value: None, span: Span::new(1, 1) }],
            is_interrupt_handler: true,
            interrupt_vector: Some(3),
            span: Span::new(1, 1),
        };
        let mut diags = DiagnosticBag::new();
        check_function(&f, Path::new("t.cn"), &mut diags);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn interrupt_handler_vector_out_of_range_is_rejected() {
        let f = FunctionDecl {
            name: "中断处理_999".into(),
            params: vec![],
            return_type: TypeName::Void,
            body: vec![Stmt::Return { value: None, span: Span::new(1, 1) }],
            is_interrupt_handler: true,
            interrupt_vector: Some(999),
            span: Span::new(1, 1),
        };
        let mut diags = DiagnosticBag::new();
        check_function(&f, Path::new("t.cn"), &mut diags);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn well_formed_interrupt_handler_is_accepted() {
        let f = FunctionDecl {
            name: "中断处理_3".into(),
            params: vec![],
            return_type: TypeName::Void,
            body: vec![Stmt::Return { value: None, span: Span::new(1, 1) }],
            is_interrupt_handler: true,
            interrupt_vector: Some(3),
            span: Span::new(1, 1),
        };
        let mut diags = DiagnosticBag::new();
        check_function(&f, Path::new("t.cn"), &mut diags);
        assert!(diags.is_empty());
    }
}
