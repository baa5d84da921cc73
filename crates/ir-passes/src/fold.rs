//! Constant folding (§4.7): rewrites arithmetic/bitwise/comparison/unary
//! instructions with all-immediate-int operands into a `mov` of the
//! computed result. Division and modulo by zero are left unfolded so the
//! runtime trap (or whatever the backend emits for it) still fires.
//!
//! Folding tracks, per block and in program order, which vregs a `mov` has
//! just bound to a known immediate; a later instruction reading such a
//! vreg is folded as though it read the immediate directly. This is local
//! value propagation within a single block's straight-line instruction
//! list, not the cross-instruction dataflow the spec explicitly does not
//! require — it falls out of folding being block-local and forward-only,
//! the same way `10 + 20 * 3` collapses to one `mov 70` once the `mul` has
//! already folded earlier in the same block.

use cn_ir::{Instruction, Module, Opcode, Operand, OperandKind};
use std::collections::HashMap;

/// Runs one pass over every instruction in every block of every function,
/// rewriting foldable instructions in place. Idempotent: a folded
/// instruction is already a `Mov` and `Opcode::Mov` is not foldable, so a
/// second pass leaves it (and its recorded immediates) unchanged.
pub fn fold_constants(module: &mut Module) {
    for function in &mut module.functions {
        for id in function.blocks.ids() {
            let block = function.blocks.get_mut(id);
            let mut known: HashMap<u32, i64> = HashMap::new();
            for instr in &mut block.instructions {
                if let Some(folded) = try_fold(instr, &known) {
                    *instr = folded;
                }
                if instr.opcode == Opcode::Mov {
                    if let (Some(dest), Some(src)) = (&instr.dest, &instr.src1) {
                        if let (OperandKind::Vreg(id), Some(value)) =
                            (&dest.kind, immediate_value(src))
                        {
                            known.insert(*id, value);
                        }
                    }
                }
            }
        }
    }
}

fn immediate_value(operand: &Operand) -> Option<i64> {
    match operand.kind {
        OperandKind::ImmInt(n) => Some(n),
        _ => None,
    }
}

fn resolve(operand: &Operand, known: &HashMap<u32, i64>) -> Option<i64> {
    match &operand.kind {
        OperandKind::ImmInt(n) => Some(*n),
        OperandKind::Vreg(id) => known.get(id).copied(),
        _ => None,
    }
}

fn try_fold(instr: &Instruction, known: &HashMap<u32, i64>) -> Option<Instruction> {
    if !instr.opcode.is_foldable() {
        return None;
    }
    let dest = instr.dest.clone()?;

    if instr.opcode.is_unary() {
        let src = resolve(instr.src1.as_ref()?, known)?;
        let value = match instr.opcode {
            Opcode::Neg => src.checked_neg()?,
            Opcode::Not => {
                if matches!(dest.ty, cn_types::Type::Bool) {
                    (src == 0) as i64
                } else {
                    !src
                }
            }
            _ => return None,
        };
        return Some(fold_result(dest, value));
    }

    let left = resolve(instr.src1.as_ref()?, known)?;
    let right = resolve(instr.src2.as_ref()?, known)?;

    let value = match instr.opcode {
        Opcode::Add => left.checked_add(right)?,
        Opcode::Sub => left.checked_sub(right)?,
        Opcode::Mul => left.checked_mul(right)?,
        Opcode::Div => {
            if right == 0 {
                return None;
            }
            left.checked_div(right)?
        }
        Opcode::Mod => {
            if right == 0 {
                return None;
            }
            left.checked_rem(right)?
        }
        Opcode::And => left & right,
        Opcode::Or => left | right,
        Opcode::Xor => left ^ right,
        Opcode::Shl => left.checked_shl(right as u32)?,
        Opcode::Shr => left.checked_shr(right as u32)?,
        Opcode::Eq => (left == right) as i64,
        Opcode::Ne => (left != right) as i64,
        Opcode::Lt => (left < right) as i64,
        Opcode::Le => (left <= right) as i64,
        Opcode::Gt => (left > right) as i64,
        Opcode::Ge => (left >= right) as i64,
        _ => return None,
    };
    Some(fold_result(dest, value))
}

fn fold_result(dest: Operand, value: i64) -> Instruction {
    let imm = if matches!(dest.ty, cn_types::Type::Bool) {
        Operand::imm_bool(value != 0)
    } else {
        Operand::imm_int(value)
    };
    Instruction::mov(dest, imm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cn_ir::{CompileMode, Function};
    use cn_types::Type;

    fn module_with(instr: Instruction) -> Module {
        let mut module = Module::new("x86_64-unknown-linux-gnu", CompileMode::Hosted);
        let mut f = Function::new("f".into(), Type::Int, vec![]);
        let entry = f.entry;
        f.block_mut(entry).push(instr);
        f.block_mut(entry).push(Instruction::ret(None));
        module.functions.push(f);
        module
    }

    #[test]
    fn folds_addition_of_immediates() {
        let dest = Operand::vreg(0, Type::Int);
        let mut module = module_with(Instruction::binary(
            Opcode::Add,
            dest.clone(),
            Operand::imm_int(10),
            Operand::imm_int(20),
        ));
        fold_constants(&mut module);
        let entry = module.functions[0].entry;
        let folded = &module.functions[0].block(entry).instructions[0];
        assert_eq!(folded.opcode, Opcode::Mov);
        assert_eq!(folded.src1.as_ref().unwrap().as_immediate_int(), Some(10));
    }

    #[test]
    fn leaves_division_by_zero_unfolded() {
        let dest = Operand::vreg(0, Type::Int);
        let mut module = module_with(Instruction::binary(
            Opcode::Div,
            dest,
            Operand::imm_int(10),
            Operand::imm_int(0),
        ));
        fold_constants(&mut module);
        let entry = module.functions[0].entry;
        assert_eq!(module.functions[0].block(entry).instructions[0].opcode, Opcode::Div);
    }

    #[test]
    fn chained_binary_ops_fold_to_single_mov_in_one_pass() {
        // `返回 10 + 20 * 3;` lowers to: mul r0 = 20*3; add r1 = 10 + r0; ret r1.
        let mul_dest = Operand::vreg(0, Type::Int);
        let add_dest = Operand::vreg(1, Type::Int);
        let mut module = Module::new("x86_64-unknown-linux-gnu", CompileMode::Hosted);
        let mut f = Function::new("f".into(), Type::Int, vec![]);
        let entry = f.entry;
        f.block_mut(entry).push(Instruction::binary(
            Opcode::Mul,
            mul_dest.clone(),
            Operand::imm_int(20),
            Operand::imm_int(3),
        ));
        f.block_mut(entry).push(Instruction::binary(
            Opcode::Add,
            add_dest,
            Operand::imm_int(10),
            mul_dest,
        ));
        f.block_mut(entry).push(Instruction::ret(None));
        module.functions.push(f);

        fold_constants(&mut module);
        let instrs = &module.functions[0].block(entry).instructions;
        assert_eq!(instrs[0].opcode, Opcode::Mov);
        assert_eq!(instrs[1].opcode, Opcode::Mov);
        assert_eq!(instrs[1].src1.as_ref().unwrap().as_immediate_int(), Some(70));
    }

    #[test]
    fn idempotent_on_already_folded_instruction() {
        let dest = Operand::vreg(0, Type::Int);
        let mut module = module_with(Instruction::binary(
            Opcode::Add,
            dest,
            Operand::imm_int(1),
            Operand::imm_int(2),
        ));
        fold_constants(&mut module);
        let before = module.functions[0].block(module.functions[0].entry).instructions.clone();
        fold_constants(&mut module);
        let after = &module.functions[0].block(module.functions[0].entry).instructions;
        assert_eq!(before.len(), after.len());
        assert_eq!(before[0].opcode, after[0].opcode);
    }
}
