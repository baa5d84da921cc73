//! Basic blocks, functions, and modules (§4.6 data model).
//!
//! Blocks are owned by a `cn_arena::Pool<BasicBlock>` per function and
//! referenced by the stable `Id<BasicBlock>` it hands out — the same
//! "`Vec<BlockId>`-style indices instead of raw back-pointers" discipline
//! the design notes call for (§9), since predecessor/successor lists would
//! otherwise form real reference cycles.

use crate::instr::Instruction;
use cn_arena::{Id, Pool};
use cn_types::Type;

pub type BlockId = Id<BasicBlock>;

#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub name: Option<String>,
    pub instructions: Vec<Instruction>,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
}

impl BasicBlock {
    pub fn named(name: impl Into<String>) -> Self {
        BasicBlock {
            name: Some(name.into()),
            ..BasicBlock::default()
        }
    }

    pub fn push(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    pub fn has_terminator(&self) -> bool {
        self.instructions
            .last()
            .is_some_and(|i| i.opcode.is_terminator())
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<(String, Type)>,
    pub locals: Vec<(String, Type)>,
    pub blocks: Pool<BasicBlock>,
    pub entry: BlockId,
    next_vreg: u32,
}

impl Function {
    /// A function always has at least its entry block, so construction
    /// takes the entry's initial contents up front rather than leaving
    /// `entry` temporarily dangling.
    pub fn new(name: String, return_type: Type, params: Vec<(String, Type)>) -> Self {
        let mut blocks = Pool::new();
        let entry = blocks.push(BasicBlock::named("entry"));
        Function {
            name,
            return_type,
            params,
            locals: Vec::new(),
            blocks,
            entry,
            next_vreg: 0,
        }
    }

    pub fn alloc_vreg(&mut self) -> u32 {
        let id = self.next_vreg;
        self.next_vreg += 1;
        id
    }

    pub fn new_block(&mut self, name: impl Into<String>) -> BlockId {
        self.blocks.push(BasicBlock::named(name))
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        self.blocks.get(id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        self.blocks.get_mut(id)
    }

    /// Links `from -> to`, recording both sides of the edge (§4.6: "pred/succ
    /// consistent with terminators").
    pub fn link(&mut self, from: BlockId, to: BlockId) {
        self.blocks.get_mut(from).succs.push(to);
        self.blocks.get_mut(to).preds.push(from);
    }

    /// Unlinks every block whose id is not in `keep` from the function's
    /// block list (§4.7 DCE). The entry block is never removed even if
    /// absent from `keep` — it is reachable from itself by definition.
    pub fn retain_blocks(&mut self, keep: &std::collections::HashSet<BlockId>) {
        let to_remove: Vec<BlockId> = self
            .blocks
            .ids()
            .filter(|id| *id != self.entry && !keep.contains(id))
            .collect();
        for id in to_remove {
            self.blocks.remove(id);
        }
    }

    /// Every block reachable from `entry` by following `succs`, used by DCE
    /// (§4.7) and by consistency checks.
    pub fn reachable_blocks(&self) -> Vec<BlockId> {
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![self.entry];
        let mut order = Vec::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            for succ in &self.block(id).succs {
                stack.push(*succ);
            }
        }
        order
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileMode {
    Hosted,
    Freestanding,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub functions: Vec<Function>,
    pub target_triple: String,
    pub mode: CompileMode,
}

impl Module {
    pub fn new(target_triple: impl Into<String>, mode: CompileMode) -> Self {
        Module {
            functions: Vec::new(),
            target_triple: target_triple.into(),
            mode,
        }
    }

    pub fn find_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_function_starts_with_linked_entry_block() {
        let f = Function::new("cn_func_主程序".into(), Type::Int, vec![]);
        assert_eq!(f.blocks.len(), 1);
        assert_eq!(f.block(f.entry).name.as_deref(), Some("entry"));
    }

    #[test]
    fn link_updates_both_pred_and_succ_lists() {
        let mut f = Function::new("f".into(), Type::Void, vec![]);
        let b = f.new_block("b");
        f.link(f.entry, b);
        assert_eq!(f.block(f.entry).succs, vec![b]);
        assert_eq!(f.block(b).preds, vec![f.entry]);
    }

    #[test]
    fn reachable_blocks_excludes_unlinked_block() {
        let mut f = Function::new("f".into(), Type::Void, vec![]);
        let reachable = f.new_block("reachable");
        let _unreachable = f.new_block("unreachable");
        f.link(f.entry, reachable);
        let ids = f.reachable_blocks();
        assert!(ids.contains(&f.entry));
        assert!(ids.contains(&reachable));
        assert_eq!(ids.len(), 2);
    }
}
