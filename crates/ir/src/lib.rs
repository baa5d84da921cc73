//! Three-address IR (§3/§4.6): the form the semantic-analysis output is
//! lowered into before `cn-ir-passes` folds constants and removes dead
//! blocks, and `cn-codegen` renders it as C.

mod cfg;
mod dump;
mod generator;
mod instr;
mod operand;

pub use cfg::{BasicBlock, BlockId, CompileMode, Function, Module};
pub use dump::dump_module;
pub use generator::generate_module;
pub use instr::{Instruction, Opcode};
pub use operand::{Operand, OperandKind};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn lower(src: &str) -> Module {
        let filename = Path::new("test.cn");
        let mut diagnostics = cn_diagnostics::DiagnosticBag::new();
        let expanded = cn_preprocessor::preprocess(src, filename, &mut diagnostics)
            .unwrap_or_default();
        let tokens = cn_lexer::lex(&expanded, filename, &mut diagnostics);
        let mut program = cn_parser::parse(tokens, filename, &mut diagnostics);
        let (_, diags) = cn_sema::analyze(&mut program, filename, false);
        assert!(!diags.has_errors(), "unexpected semantic errors: {diags:?}");
        generate_module(&program, "x86_64-unknown-linux-gnu", false)
    }

    #[test]
    fn empty_function_returns_in_its_entry_block() {
        let module = lower("函数 主程序() { }");
        let f = module.find_function("主程序").expect("function lowered");
        assert_eq!(f.blocks.len(), 1);
        assert!(f.block(f.entry).has_terminator());
    }

    #[test]
    fn if_statement_produces_then_else_merge_blocks() {
        let module = lower(
            r#"
            函数 主程序(): 整数 {
                变量 x: 整数 = 1;
                如果 (x > 0) {
                    返回 1;
                } 否则 {
                    返回 0;
                }
            }
            "#,
        );
        let f = module.find_function("主程序").expect("function lowered");
        let names: Vec<_> = f
            .blocks
            .iter()
            .filter_map(|(_, b)| b.name.clone())
            .collect();
        assert!(names.iter().any(|n| n.starts_with("if_then")));
        assert!(names.iter().any(|n| n.starts_with("if_else")));
        assert!(names.iter().any(|n| n.starts_with("if_merge")));
    }

    #[test]
    fn while_loop_links_cond_body_and_exit() {
        let module = lower(
            r#"
            函数 主程序() {
                变量 i: 整数 = 0;
                当 (i < 10) {
                    i = i + 1;
                }
            }
            "#,
        );
        let f = module.find_function("主程序").expect("function lowered");
        let cond = f
            .blocks
            .iter()
            .find(|(_, b)| b.name.as_deref() == Some("while_cond_1"))
            .map(|(id, _)| id);
        assert!(cond.is_some());
        let reachable = f.reachable_blocks();
        assert_eq!(reachable.len(), f.blocks.len());
    }

    #[test]
    fn logical_and_creates_rhs_and_merge_blocks() {
        let module = lower(
            r#"
            函数 主程序(): 布尔 {
                变量 a: 布尔 = 真;
                变量 b: 布尔 = 假;
                返回 a && b;
            }
            "#,
        );
        let f = module.find_function("主程序").expect("function lowered");
        let names: Vec<_> = f
            .blocks
            .iter()
            .filter_map(|(_, b)| b.name.clone())
            .collect();
        assert!(names.iter().any(|n| n.starts_with("logic_rhs")));
        assert!(names.iter().any(|n| n.starts_with("logic_merge")));
    }
}
