//! Semantic analysis for CN (§4.5): scope building, name resolution, type
//! checking, whole-function invariants, and the freestanding-mode checker.
//!
//! [`analyze`] is the single entry point the driver calls; it runs every
//! pass in order and returns the accumulated diagnostics, the way
//! `cn-preprocessor` and `cn-parser` each return a `DiagnosticBag` from
//! their own top-level function.

mod analyze;
mod builder;
mod freestanding;
mod invariants;
mod scope;
mod typename;

pub use scope::{Scope, ScopeId, ScopeKind, Symbol, SymbolKind, ScopeTree};
pub use typename::{resolve_type_name, ProgramTypes};

use cn_ast::Program;
use cn_diagnostics::DiagnosticBag;
use std::path::Path;

/// Runs the full semantic pipeline over `program`, filling in every
/// `Expr.ty` and `VarDecl.resolved_type` along the way. Returns the scope
/// tree alongside the diagnostics so a caller that wants it (e.g. future
/// tooling) doesn't have to rebuild it.
pub fn analyze(
    program: &mut Program,
    filename: &Path,
    freestanding: bool,
) -> (ScopeTree, DiagnosticBag) {
    let mut diagnostics = DiagnosticBag::new();
    let types = ProgramTypes::from_program(program);

    let mut tree = builder::build_scopes(program, &types, filename, &mut diagnostics);
    analyze::analyze_program(program, &mut tree, &types, filename, &mut diagnostics);
    invariants::check_invariants(program, filename, &mut diagnostics);
    if freestanding {
        freestanding::check_freestanding(program, filename, &mut diagnostics);
    }

    (tree, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn analyze_source(src: &str) -> DiagnosticBag {
        let mut diags = DiagnosticBag::new();
        let filename = PathBuf::from("t.cn");
        let preprocessed = cn_preprocessor::preprocess(src, &filename, &mut diags).unwrap_or_default();
        let tokens = cn_lexer::lex(&preprocessed, &filename, &mut diags);
        let mut program = cn_parser::parse(tokens, &filename, &mut diags);
        let (_, sema_diags) = analyze(&mut program, &filename, false);
        diags.extend(sema_diags);
        diags
    }

    #[test]
    fn well_typed_program_has_no_errors() {
        let diags = analyze_source(
            "函数 主程序(): 整数 { 整数 甲 = 1; 整数 乙 = 甲 + 2; 返回 乙; }",
        );
        assert!(!diags.has_errors(), "unexpected errors: {:?}", diags.iter().collect::<Vec<_>>());
    }

    #[test]
    fn undefined_identifier_is_reported() {
        let diags = analyze_source("函数 主程序(): 整数 { 返回 未声明变量; }");
        assert!(diags.has_errors());
    }

    #[test]
    fn type_mismatch_is_reported() {
        let diags = analyze_source(
            "函数 主程序(): 整数 { 布尔 甲 = 真; 整数 乙 = 甲 + 1; 返回 乙; }",
        );
        assert!(diags.has_errors());
    }

    #[test]
    fn shadowing_in_nested_block_is_allowed() {
        let diags = analyze_source(
            "函数 主程序(): 整数 { 整数 甲 = 1; { 布尔 甲 = 真; } 返回 甲; }",
        );
        assert!(!diags.has_errors(), "unexpected errors: {:?}", diags.iter().collect::<Vec<_>>());
    }

    #[test]
    fn duplicate_declaration_in_same_scope_is_rejected() {
        let diags = analyze_source(
            "函数 主程序(): 整数 { 整数 甲 = 1; 整数 甲 = 2; 返回 甲; }",
        );
        assert!(diags.has_errors());
    }

    #[test]
    fn missing_return_in_non_void_function_is_reported() {
        let diags = analyze_source("函数 主程序(): 整数 { 整数 甲 = 1; }");
        assert!(diags.has_errors());
    }
}
