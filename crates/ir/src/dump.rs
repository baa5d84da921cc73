//! Plain-text rendering of a [`Module`], used by `cnc emit-ir` and by tests
//! that want a human-readable snapshot without reaching into instruction
//! fields directly. Not consumed by any other phase — the C backend walks
//! the structured IR itself rather than parsing this text back.

use crate::cfg::{BlockId, Function, Module};
use crate::instr::Instruction;
use std::fmt::Write as _;

pub fn dump_module(module: &Module) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "; target: {}", module.target_triple);
    let _ = writeln!(out, "; mode: {:?}", module.mode);
    for f in &module.functions {
        dump_function(&mut out, f);
    }
    out
}

fn dump_function(out: &mut String, f: &Function) {
    let params = f
        .params
        .iter()
        .map(|(name, ty)| format!("{name}: {ty:?}"))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "func {}({params}) -> {:?} {{", f.name, f.return_type);
    for id in f.blocks.ids() {
        dump_block(out, f, id);
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
}

fn dump_block(out: &mut String, f: &Function, id: BlockId) {
    let block = f.block(id);
    let label = block.name.as_deref().unwrap_or("<unnamed>");
    let _ = writeln!(out, "  {label}:");
    for instr in &block.instructions {
        let _ = writeln!(out, "    {}", dump_instruction(instr));
    }
}

fn dump_instruction(instr: &Instruction) -> String {
    let mut parts = Vec::new();
    if let Some(dest) = &instr.dest {
        parts.push(format!("{dest} ="));
    }
    parts.push(format!("{:?}", instr.opcode));
    if let Some(src1) = &instr.src1 {
        parts.push(src1.to_string());
    }
    if let Some(src2) = &instr.src2 {
        parts.push(src2.to_string());
    }
    for extra in &instr.extra {
        parts.push(extra.to_string());
    }
    if !instr.targets.is_empty() {
        let targets = instr.targets.iter().map(|t| format!("{t:?}")).collect::<Vec<_>>().join(", ");
        parts.push(format!("[{targets}]"));
    }
    if let Some(label) = &instr.label {
        parts.push(format!("<{label}>"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn dump_includes_function_name_and_block_labels() {
        let filename = Path::new("test.cn");
        let mut diagnostics = cn_diagnostics::DiagnosticBag::new();
        let expanded = cn_preprocessor::preprocess("函数 主程序(): 整数 { 返回 0; }", filename, &mut diagnostics)
            .unwrap_or_default();
        let tokens = cn_lexer::lex(&expanded, filename, &mut diagnostics);
        let mut program = cn_parser::parse(tokens, filename, &mut diagnostics);
        let (_, diags) = cn_sema::analyze(&mut program, filename, false);
        assert!(!diags.has_errors());
        let module = crate::generate_module(&program, "x86_64-unknown-linux-gnu", false);
        let text = dump_module(&module);
        assert!(text.contains("func 主程序"));
        assert!(text.contains("Ret"));
    }
}
