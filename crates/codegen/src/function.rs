//! Per-function C rendering (§4.8 item 6): local declarations hoisted to
//! the top of the function (so labeled blocks can `goto` freely without
//! running into C's "jump past a variable's initializer" restrictions),
//! then one labeled block per IR basic block, each block's instructions
//! rendered as plain C statements and its terminator as a `goto`.

use crate::decls::isr_attribute;
use crate::error::CodegenError;
use crate::types::{c_type, func_name, struct_type_name, var_name};
use cn_ast::Program;
use cn_ir::{Function, Instruction, Opcode, Operand, OperandKind};
use cn_types::Type;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

pub fn emit_function(
    out: &mut String,
    f: &Function,
    program: &Program,
    globals: &HashSet<String>,
) -> Result<(), CodegenError> {
    let params = f
        .params
        .iter()
        .map(|(name, ty)| format!("{} {}", c_type(ty), var_name(name)))
        .collect::<Vec<_>>()
        .join(", ");
    let params = if params.is_empty() { "void".to_string() } else { params };
    writeln!(
        out,
        "{}{} {}({}) {{",
        isr_attribute(program, &f.name),
        c_type(&f.return_type),
        func_name(&f.name),
        params
    )?;

    emit_local_declarations(out, f)?;

    for (id, block) in f.blocks.iter() {
        let label = block_label(f, id);
        writeln!(out, "{label}:")?;
        if block.instructions.is_empty() {
            // A label needs at least one statement to follow it in C;
            // every live block carries a terminator per the IR's
            // invariant, so this only guards a pathological empty block.
            writeln!(out, "    ;")?;
        }
        for instr in &block.instructions {
            emit_instruction(out, instr, f, program, globals)?;
        }
    }

    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

/// Hosted mode's real C `main`: a thin wrapper rather than renaming the
/// entry function itself, so `cn_func_主程序`'s own return type never has to
/// match C's `int main(void)` signature. Its prologue is the only place
/// `cn_rt_init()` is called (§4.8).
pub fn emit_main_wrapper(out: &mut String, entry: &Function) -> Result<(), CodegenError> {
    writeln!(out, "int main(void) {{")?;
    writeln!(out, "    cn_rt_init();")?;
    if matches!(entry.return_type, Type::Void) {
        writeln!(out, "    {}();", func_name(&entry.name))?;
        writeln!(out, "    return 0;")?;
    } else {
        writeln!(out, "    return (int) {}();", func_name(&entry.name))?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn block_label(f: &Function, id: cn_ir::BlockId) -> String {
    match &f.block(id).name {
        Some(name) => format!("cn_label_{name}"),
        None => format!("cn_label_bb{}", id.index()),
    }
}

/// Walks every instruction once, collecting the C type each distinct
/// destination vreg needs, then emits one declaration per vreg. `alloca`
/// destinations get a backing storage variable plus a pointer variable
/// aliasing it; every other destination is a plain value declared with no
/// initializer (its defining instruction assigns it later).
fn emit_local_declarations(out: &mut String, f: &Function) -> Result<(), CodegenError> {
    let mut alloca_slots: HashMap<u32, (Type, Option<usize>)> = HashMap::new();
    let mut plain_vregs: HashMap<u32, Type> = HashMap::new();

    for (_, block) in f.blocks.iter() {
        for instr in &block.instructions {
            let Some(dest) = &instr.dest else { continue };
            let OperandKind::Vreg(id) = dest.kind else { continue };
            if instr.opcode == Opcode::Alloca {
                let array_len = instr.extra.first().and_then(|o| o.as_immediate_int()).map(|n| n as usize);
                alloca_slots.insert(id, (instr.ty.clone(), array_len));
            } else if !plain_vregs.contains_key(&id) {
                plain_vregs.insert(id, dest.ty.clone());
            }
        }
    }

    let mut ids: Vec<u32> = alloca_slots.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        let (ty, array_len) = &alloca_slots[&id];
        match array_len {
            Some(len) => {
                writeln!(out, "    {} r{id}_mem[{len}];", c_type(ty))?;
                writeln!(out, "    {}* r{id} = r{id}_mem;", c_type(ty))?;
            }
            None => {
                writeln!(out, "    {} r{id}_mem;", c_type(ty))?;
                writeln!(out, "    {}* r{id} = &r{id}_mem;", c_type(ty))?;
            }
        }
    }

    let mut ids: Vec<u32> = plain_vregs.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        writeln!(out, "    {} r{id};", c_type(&plain_vregs[&id]))?;
    }
    Ok(())
}

/// A value-position rendering: immediates as C literals, vregs by name,
/// symbols by name (function parameters are real C values already;
/// runtime/user function names are resolved to their call-site symbol by
/// `callee_ref` instead of this helper).
fn value_ref(operand: &Operand) -> String {
    match &operand.kind {
        OperandKind::None => "0".to_string(),
        OperandKind::ImmInt(n) => {
            if matches!(operand.ty, Type::Bool) {
                (if *n != 0 { "true" } else { "false" }).to_string()
            } else {
                n.to_string()
            }
        }
        OperandKind::ImmFloat(n) => n.to_string(),
        OperandKind::ImmString(s) => format!("{s:?}"),
        OperandKind::Vreg(id) => format!("r{id}"),
        OperandKind::SymbolRef(name) => var_name(name),
    }
}

/// A pointer-value rendering for a gep's struct base: a vreg already holds
/// a real C pointer; a global symbol does not (the global variable itself
/// *is* the struct storage), so its address is taken explicitly.
fn ptr_value_ref(operand: &Operand, globals: &HashSet<String>) -> String {
    match &operand.kind {
        OperandKind::Vreg(id) => format!("r{id}"),
        OperandKind::SymbolRef(name) if globals.contains(name) => format!("(&{})", var_name(name)),
        _ => value_ref(operand),
    }
}

/// An address-operand rendering for `load`/`store`: a vreg holds a real
/// pointer and is dereferenced; a global symbol denotes the storage
/// itself, so no dereference is needed.
fn deref_ref(operand: &Operand, globals: &HashSet<String>) -> String {
    match &operand.kind {
        OperandKind::Vreg(id) => format!("(*r{id})"),
        OperandKind::SymbolRef(name) if globals.contains(name) => var_name(name),
        _ => value_ref(operand),
    }
}

fn callee_ref(operand: &Operand) -> String {
    match &operand.kind {
        OperandKind::SymbolRef(name) if name.starts_with("cn_rt_") => name.clone(),
        OperandKind::SymbolRef(name) => func_name(name),
        other => value_ref(&Operand { kind: other.clone(), ty: operand.ty.clone() }),
    }
}

fn print_suffix(ty: &Type) -> &'static str {
    match ty {
        Type::Int => "int",
        Type::Float => "float",
        Type::Bool => "bool",
        _ => "string",
    }
}

/// The four hosted I/O call forms the generator lowers as plain calls to
/// their CN source spelling (§4.5's `FORBIDDEN_HOSTED_CALLS`): the backend
/// resolves them to their `cn_rt_print_*`/`cn_rt_read_*` overload here,
/// since the generator has no type-directed overload-picking of its own
/// and the runtime exposes one entry point per printable type rather than
/// a single variadic one.
fn emit_call(out: &mut String, instr: &Instruction) -> Result<(), CodegenError> {
    let callee = instr.src1.as_ref().expect("call has a callee");
    if let OperandKind::SymbolRef(name) = &callee.kind {
        match name.as_str() {
            "打印" | "打印行" => {
                let arg = instr.extra.first().expect("打印 takes one argument");
                writeln!(out, "    cn_rt_print_{}({});", print_suffix(&arg.ty), value_ref(arg))?;
                if name == "打印行" {
                    writeln!(out, "    cn_rt_print_string(\"\\n\");")?;
                }
                return Ok(());
            }
            "读取整数" => {
                let dest = value_ref(instr.dest.as_ref().expect("读取整数 yields a value"));
                writeln!(out, "    {dest} = cn_rt_read_int();")?;
                return Ok(());
            }
            "读取行" => {
                let dest = value_ref(instr.dest.as_ref().expect("读取行 yields a value"));
                writeln!(out, "    {dest} = cn_rt_read_line();")?;
                return Ok(());
            }
            _ => {}
        }
    }

    let callee_text = callee_ref(callee);
    let args = instr.extra.iter().map(value_ref).collect::<Vec<_>>().join(", ");
    match &instr.dest {
        Some(dest) => writeln!(out, "    {} = {callee_text}({args});", value_ref(dest))?,
        None => writeln!(out, "    {callee_text}({args});")?,
    }
    Ok(())
}

fn binary_c_op(opcode: Opcode) -> &'static str {
    match opcode {
        Opcode::Add => "+",
        Opcode::Sub => "-",
        Opcode::Mul => "*",
        Opcode::Div => "/",
        Opcode::Mod => "%",
        Opcode::And => "&",
        Opcode::Or => "|",
        Opcode::Xor => "^",
        Opcode::Shl => "<<",
        Opcode::Shr => ">>",
        Opcode::Eq => "==",
        Opcode::Ne => "!=",
        Opcode::Lt => "<",
        Opcode::Le => "<=",
        Opcode::Gt => ">",
        Opcode::Ge => ">=",
        _ => unreachable!("not a binary opcode"),
    }
}

fn emit_instruction(
    out: &mut String,
    instr: &Instruction,
    f: &Function,
    program: &Program,
    globals: &HashSet<String>,
) -> Result<(), CodegenError> {
    match instr.opcode {
        Opcode::Alloca | Opcode::Label => Ok(()),
        Opcode::Mov => {
            let dest = value_ref(instr.dest.as_ref().expect("mov has a destination"));
            let src = value_ref(instr.src1.as_ref().expect("mov has a source"));
            writeln!(out, "    {dest} = {src};")?;
            Ok(())
        }
        op if op.is_unary() => {
            let dest = value_ref(instr.dest.as_ref().expect("unary has a destination"));
            let src = value_ref(instr.src1.as_ref().expect("unary has a source"));
            let rendered = match op {
                Opcode::Neg => format!("-({src})"),
                Opcode::Not if matches!(instr.ty, Type::Bool) => format!("!({src})"),
                Opcode::Not => format!("~({src})"),
                _ => unreachable!(),
            };
            writeln!(out, "    {dest} = {rendered};")?;
            Ok(())
        }
        op if op.is_arithmetic() || op.is_bitwise() || op.is_comparison() => {
            let dest = value_ref(instr.dest.as_ref().expect("binary op has a destination"));
            let lhs = value_ref(instr.src1.as_ref().expect("binary op has a left operand"));
            let rhs = value_ref(instr.src2.as_ref().expect("binary op has a right operand"));
            writeln!(out, "    {dest} = ({lhs}) {} ({rhs});", binary_c_op(op))?;
            Ok(())
        }
        Opcode::Call => emit_call(out, instr),
        Opcode::Ret => {
            match &instr.src1 {
                Some(value) => writeln!(out, "    return {};", value_ref(value))?,
                None => writeln!(out, "    return;")?,
            }
            Ok(())
        }
        Opcode::Br => {
            let target = instr.targets.first().expect("br has a target");
            writeln!(out, "    goto {};", block_label(f, *target))?;
            Ok(())
        }
        Opcode::BrCond => {
            let cond = value_ref(instr.src1.as_ref().expect("br_cond has a condition"));
            let if_true = block_label(f, instr.targets[0]);
            let if_false = block_label(f, instr.targets[1]);
            writeln!(out, "    if ({cond}) {{ goto {if_true}; }} else {{ goto {if_false}; }}")?;
            Ok(())
        }
        Opcode::Load => {
            let dest = value_ref(instr.dest.as_ref().expect("load has a destination"));
            let addr = deref_ref(instr.src1.as_ref().expect("load has an address"), globals);
            writeln!(out, "    {dest} = {addr};")?;
            Ok(())
        }
        Opcode::Store => {
            let addr = deref_ref(instr.src1.as_ref().expect("store has an address"), globals);
            let value = value_ref(instr.src2.as_ref().expect("store has a value"));
            writeln!(out, "    {addr} = {value};")?;
            Ok(())
        }
        Opcode::Gep => emit_gep(out, instr, program, globals),
        Opcode::Phi => Err(CodegenError::Logic(
            "phi instructions are never emitted by the generator; the backend has nothing to lower".to_string(),
        )),
    }
}

fn emit_gep(
    out: &mut String,
    instr: &Instruction,
    program: &Program,
    globals: &HashSet<String>,
) -> Result<(), CodegenError> {
    let dest = instr.dest.as_ref().expect("gep has a destination");
    let base = instr.src1.as_ref().expect("gep has a base");
    let index = instr.src2.as_ref().expect("gep has an index");
    let dest_text = value_ref(dest);

    let same_pointee = dest.ty.pointee() == base.ty.pointee();
    let base_struct = base.ty.pointee().and_then(|t| match t {
        Type::Struct(name) => Some(name.as_str()),
        _ => None,
    });

    if !same_pointee {
        if let Some(struct_name) = base_struct {
            let field_index = index.as_immediate_int().ok_or_else(|| {
                CodegenError::Logic(format!("struct field gep on {struct_name} has a non-constant index"))
            })? as usize;
            let decl = program.find_struct(struct_name).ok_or_else(|| {
                CodegenError::Logic(format!("gep references undeclared struct {struct_name}"))
            })?;
            let field = decl.fields.get(field_index).ok_or_else(|| {
                CodegenError::Logic(format!("struct {struct_name} has no field at index {field_index}"))
            })?;
            let base_text = ptr_value_ref(base, globals);
            writeln!(out, "    {dest_text} = &({base_text})->{};", field.name)?;
            return Ok(());
        }
    }

    let base_text = value_ref(base);
    let index_text = value_ref(index);
    writeln!(out, "    {dest_text} = &({base_text})[{index_text}];")?;
    Ok(())
}

pub fn struct_field_c_name(struct_name: &str) -> String {
    struct_type_name(struct_name)
}
