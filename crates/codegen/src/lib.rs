//! C backend (§4.8): renders an optimized `cn_ir::Module` plus the AST's
//! struct/enum/global declarations into a single `.c` translation unit. The
//! backend never shells out to a C compiler — that belongs to `cn-driver`.

mod decls;
mod error;
mod expr;
mod function;
mod types;

pub use error::CodegenError;

use cn_ast::Program;
use cn_ir::{CompileMode, Module};
use std::collections::HashSet;

/// Renders `module` (already folded and DCE'd by `cn-ir-passes`) as C
/// source text, in the fixed order: includes, struct defs, enum defs,
/// forward decls, global defs, function bodies, then the hosted-mode
/// `main` wrapper if the program declares an entry function.
pub fn emit_c(module: &Module, program: &Program) -> Result<String, CodegenError> {
    tracing::debug!(
        functions = module.functions.len(),
        structs = program.structs.len(),
        mode = ?module.mode,
        "emitting C translation unit"
    );

    let mut out = String::new();
    emit_includes(&mut out, module.mode)?;
    decls::emit_struct_decls(&mut out, program)?;
    decls::emit_enum_decls(&mut out, program)?;
    decls::emit_forward_decls(&mut out, module, program)?;
    decls::emit_global_decls(&mut out, program)?;

    let globals: HashSet<String> = program.globals.iter().map(|g| g.name.clone()).collect();
    for f in &module.functions {
        function::emit_function(&mut out, f, program, &globals)?;
    }

    if module.mode == CompileMode::Hosted {
        if let Some(entry) = module.find_function("主程序") {
            function::emit_main_wrapper(&mut out, entry)?;
        }
    }

    Ok(out)
}

fn emit_includes(out: &mut String, mode: CompileMode) -> std::fmt::Result {
    use std::fmt::Write as _;
    writeln!(out, "#include <stdio.h>")?;
    writeln!(out, "#include <stdbool.h>")?;
    writeln!(out, "#include <stdint.h>")?;
    writeln!(out, "#include \"cnrt.h\"")?;
    if mode == CompileMode::Freestanding {
        writeln!(out, "#include \"cnlang/runtime/system_api.h\"")?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn build(src: &str, freestanding: bool) -> (Module, Program) {
        let filename = Path::new("test.cn");
        let mut diagnostics = cn_diagnostics::DiagnosticBag::new();
        let expanded = cn_preprocessor::preprocess(src, filename, &mut diagnostics).unwrap_or_default();
        let tokens = cn_lexer::lex(&expanded, filename, &mut diagnostics);
        let mut program = cn_parser::parse(tokens, filename, &mut diagnostics);
        let (_, diags) = cn_sema::analyze(&mut program, filename, freestanding);
        assert!(!diags.has_errors(), "unexpected semantic errors: {diags:?}");
        let mut module = cn_ir::generate_module(&program, "x86_64-unknown-linux-gnu", freestanding);
        cn_ir_passes::run_default_pipeline(&mut module);
        (module, program)
    }

    #[test]
    fn hello_world_emits_print_call_and_main_wrapper() {
        let (module, program) = build(
            r#"
            函数 主程序(): 整数 {
                打印("你好，世界！");
                返回 0;
            }
            "#,
            false,
        );
        let c = emit_c(&module, &program).expect("emits C");
        assert!(c.contains("cn_rt_print_string(\"你好，世界！\")"));
        assert!(c.contains("int main(void) {"));
        assert!(c.contains("cn_rt_init();"));
        assert!(c.contains("return (int) cn_func_主程序();"));
    }

    #[test]
    fn arithmetic_fold_scenario_emits_single_literal() {
        let (module, program) = build(
            r#"
            函数 主程序(): 整数 {
                返回 10 + 20 * 3;
            }
            "#,
            false,
        );
        let c = emit_c(&module, &program).expect("emits C");
        assert!(c.contains("70"));
    }

    #[test]
    fn struct_member_access_uses_arrow_and_field_name() {
        let (module, program) = build(
            r#"
            结构体 点 {
                整数 x;
                整数 y;
            }
            函数 主程序(): 整数 {
                变量 p: 点 = 点 { 1, 2 };
                返回 p.x;
            }
            "#,
            false,
        );
        let c = emit_c(&module, &program).expect("emits C");
        assert!(c.contains("struct cn_struct_点 {"));
        assert!(c.contains("->x"));
    }

    #[test]
    fn freestanding_module_has_no_main_wrapper() {
        let (module, program) = build("函数 启动(): 空类型 { }", true);
        let c = emit_c(&module, &program).expect("emits C");
        assert!(!c.contains("int main(void)"));
        assert!(c.contains("cnlang/runtime/system_api.h"));
    }
}
