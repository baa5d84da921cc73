//! Block-level dead-code elimination (§4.7): unlinks every basic block
//! unreachable from its function's entry, maintaining pred/succ list
//! consistency for the blocks that remain.

use cn_ir::{BlockId, Module};
use std::collections::HashSet;

/// Removes every block not reachable from `entry` by following `succs`,
/// from every function in `module`. Reachable blocks keep their relative
/// order; their `preds`/`succs` lists are filtered down to other surviving
/// blocks so the CFG invariant (`succ(B)` matches `B`'s terminator, `pred`
/// is the inverse of `succ`) holds afterwards.
pub fn eliminate_dead_code(module: &mut Module) {
    for function in &mut module.functions {
        let reachable: HashSet<BlockId> = function.reachable_blocks().into_iter().collect();
        for id in function.blocks.ids() {
            if !reachable.contains(&id) {
                continue;
            }
            let block = function.blocks.get_mut(id);
            block.preds.retain(|p| reachable.contains(p));
            block.succs.retain(|s| reachable.contains(s));
        }
        function.retain_blocks(&reachable);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cn_ir::{CompileMode, Function, Instruction};
    use cn_types::Type;

    #[test]
    fn removes_block_unreachable_from_entry() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", CompileMode::Hosted);
        let mut f = Function::new("f".into(), Type::Void, vec![]);
        let entry = f.entry;
        let reachable = f.new_block("reachable");
        let unreachable = f.new_block("unreachable");
        f.link(entry, reachable);
        f.block_mut(entry).push(Instruction::br(reachable));
        f.block_mut(reachable).push(Instruction::ret(None));
        f.block_mut(unreachable).push(Instruction::ret(None));
        module.functions.push(f);

        eliminate_dead_code(&mut module);
        let f = &module.functions[0];
        assert_eq!(f.blocks.len(), 2);
        assert!(f.blocks.iter().any(|(_, b)| b.name.as_deref() == Some("reachable")));
        assert!(!f.blocks.iter().any(|(_, b)| b.name.as_deref() == Some("unreachable")));
    }

    #[test]
    fn keeps_entry_even_when_it_has_no_predecessors() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", CompileMode::Hosted);
        let mut f = Function::new("f".into(), Type::Void, vec![]);
        f.block_mut(f.entry).push(Instruction::ret(None));
        module.functions.push(f);

        eliminate_dead_code(&mut module);
        assert_eq!(module.functions[0].blocks.len(), 1);
    }

    #[test]
    fn idempotent_second_pass_is_a_no_op() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", CompileMode::Hosted);
        let mut f = Function::new("f".into(), Type::Void, vec![]);
        let entry = f.entry;
        let dead = f.new_block("dead");
        let _ = dead;
        f.block_mut(entry).push(Instruction::ret(None));
        module.functions.push(f);

        eliminate_dead_code(&mut module);
        let count_after_first = module.functions[0].blocks.len();
        eliminate_dead_code(&mut module);
        assert_eq!(module.functions[0].blocks.len(), count_after_first);
    }
}
