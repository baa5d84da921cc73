//! Struct/enum definitions, function forward declarations, and global
//! variable definitions (§4.8 items 2-5).

use crate::types::{c_type, func_name, struct_type_name, var_name};
use cn_ast::Program;
use cn_ir::Module;
use cn_types::Type;
use std::fmt::Write as _;

pub fn emit_struct_decls(out: &mut String, program: &Program) -> std::fmt::Result {
    for s in &program.structs {
        writeln!(out, "struct {} {{", struct_type_name(&s.name))?;
        for field in &s.fields {
            let ty = typename_to_type_best_effort(&field.type_name, program);
            writeln!(out, "    {} {};", c_type(&ty), field.name)?;
        }
        writeln!(out, "}};")?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn emit_enum_decls(out: &mut String, program: &Program) -> std::fmt::Result {
    for e in &program.enums {
        writeln!(out, "enum cn_enum_{} {{", e.name)?;
        let mut next_value = 0i64;
        for member in &e.members {
            let value = member.value.unwrap_or(next_value);
            writeln!(out, "    cn_enum_{}_{} = {},", e.name, member.name, value)?;
            next_value = value + 1;
        }
        writeln!(out, "}};")?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn emit_forward_decls(out: &mut String, module: &Module, program: &Program) -> std::fmt::Result {
    for f in &module.functions {
        let params = f
            .params
            .iter()
            .map(|(name, ty)| format!("{} {}", c_type(ty), var_name(name)))
            .collect::<Vec<_>>()
            .join(", ");
        let params = if params.is_empty() { "void".to_string() } else { params };
        writeln!(
            out,
            "{}{} {}({});",
            isr_attribute(program, &f.name),
            c_type(&f.return_type),
            func_name(&f.name),
            params
        )?;
    }
    if module.mode == cn_ir::CompileMode::Hosted && module.find_function("主程序").is_some() {
        writeln!(out, "int main(void);")?;
    }
    writeln!(out)?;
    Ok(())
}

/// An ISR's vector number comes only from the AST (`cn-ir`'s `Function` has
/// no such field — it's a naming-convention fact the semantic analyzer
/// checks but the generator doesn't carry forward), so the backend looks it
/// back up by name.
pub fn isr_attribute(program: &Program, name: &str) -> &'static str {
    match program.find_function(name) {
        Some(decl) if decl.is_interrupt_handler => "__attribute__((interrupt)) ",
        _ => "",
    }
}

pub fn emit_global_decls(out: &mut String, program: &Program) -> std::fmt::Result {
    for g in &program.globals {
        let ty = if g.resolved_type.is_unknown() { Type::Int } else { g.resolved_type.clone() };
        write!(out, "{} {}", c_type(&ty), var_name(&g.name))?;
        if let Some(init) = &g.init {
            write!(out, " = {}", crate::expr::render_const_expr(init))?;
        }
        writeln!(out, ";")?;
    }
    if !program.globals.is_empty() {
        writeln!(out)?;
    }
    Ok(())
}

/// Best-effort `TypeName` -> `Type` for struct field declarations, mirroring
/// `cn_sema::resolve_type_name` without needing a `ProgramTypes` snapshot or
/// a diagnostics sink — any type error here was already caught and reported
/// during semantic analysis, which must pass before codegen runs.
fn typename_to_type_best_effort(type_name: &cn_ast::TypeName, program: &Program) -> Type {
    match type_name {
        cn_ast::TypeName::Int => Type::Int,
        cn_ast::TypeName::Float => Type::Float,
        cn_ast::TypeName::Bool => Type::Bool,
        cn_ast::TypeName::String => Type::String,
        cn_ast::TypeName::Void => Type::Void,
        cn_ast::TypeName::Named(name) => {
            if program.find_struct(name).is_some() {
                Type::Struct(name.clone())
            } else {
                Type::Int
            }
        }
        cn_ast::TypeName::Pointer(inner) => {
            Type::pointer_to(typename_to_type_best_effort(inner, program))
        }
        cn_ast::TypeName::Array(inner, len) => {
            Type::array_of(typename_to_type_best_effort(inner, program), *len)
        }
    }
}
