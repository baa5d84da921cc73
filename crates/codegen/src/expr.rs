//! Renders a handful of AST expression forms as C constant-expression
//! text, used only for global variable initializers (§4.8 item 5) — C
//! requires file-scope initializers to be constant expressions, so this
//! covers literals and their unary negation rather than the full
//! expression grammar the IR generator handles for function bodies.

use cn_ast::{Expr, ExprKind, UnaryOp};

pub fn render_const_expr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::IntLiteral(n) => n.to_string(),
        ExprKind::FloatLiteral(n) => n.to_string(),
        ExprKind::BoolLiteral(b) => (if *b { "true" } else { "false" }).to_string(),
        ExprKind::StringLiteral(s) => format!("{s:?}"),
        ExprKind::Unary { op: UnaryOp::Neg, operand } => format!("-({})", render_const_expr(operand)),
        _ => "0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cn_ast::Span;

    #[test]
    fn renders_negative_int_literal() {
        let inner = Expr::new(ExprKind::IntLiteral(5), Span::new(1, 1));
        let expr = Expr::new(ExprKind::Unary { op: UnaryOp::Neg, operand: Box::new(inner) }, Span::new(1, 1));
        assert_eq!(render_const_expr(&expr), "-(5)");
    }

    #[test]
    fn renders_string_literal_quoted() {
        let expr = Expr::new(ExprKind::StringLiteral("hi".to_string()), Span::new(1, 1));
        assert_eq!(render_const_expr(&expr), "\"hi\"");
    }
}
