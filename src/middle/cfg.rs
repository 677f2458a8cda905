//! Control-flow graph construction.
//!
//! Each procedure's structured statement list is expanded into a tree of
//! basic blocks. `If`/`While` end their current block with a condition
//! evaluated into a fresh temporary followed by a `Branch`; `Call` splits
//! the block so a call is always the sole instruction of its block. The
//! block arena is shared across every procedure in the program; a
//! procedure's blocks are found by walking [`Cfg::reachable`] from its
//! entry.

use crate::common::Id;
use crate::middle::ir::{BlockId, Instr, ProcId};
use crate::middle::symtab::{ScopeId, SymbolTable};
use crate::middle::ir::Stmt;

#[derive(Clone, Debug)]
pub enum Successors {
    None,
    Next(BlockId),
    Branch { on_true: BlockId, on_false: BlockId },
}

#[derive(Clone, Debug)]
pub struct BasicBlock {
    pub label_begin: Id,
    pub label_end: Id,
    pub instrs: Vec<Instr>,
    pub succ: Successors,
}

pub struct Cfg {
    pub blocks: Vec<BasicBlock>,
    pub entry: crate::common::Map<ProcId, BlockId>,
    pub reachable: crate::common::Map<ProcId, Vec<BlockId>>,
}

impl Cfg {
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.0 as usize]
    }
}

struct Builder<'a> {
    symtab: &'a mut SymbolTable,
    blocks: Vec<BasicBlock>,
    counter: u32,
}

impl<'a> Builder<'a> {
    fn alloc(&mut self, proc: ProcId, instrs: Vec<Instr>, succ: Successors) -> BlockId {
        let n = self.counter;
        self.counter += 1;
        let proc_name = self.symtab.symbol(proc).name;
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock {
            label_begin: Id::from(format!("{proc_name}_{n}")),
            label_end: Id::from(format!("{proc_name}_{n}_end")),
            instrs,
            succ,
        });
        id
    }

    fn reserve(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock {
            label_begin: Id::from(String::new()),
            label_end: Id::from(String::new()),
            instrs: Vec::new(),
            succ: Successors::None,
        });
        id
    }

    fn fill(&mut self, id: BlockId, proc: ProcId, instrs: Vec<Instr>, succ: Successors) {
        let n = self.counter;
        self.counter += 1;
        let proc_name = self.symtab.symbol(proc).name;
        self.blocks[id.0 as usize] = BasicBlock {
            label_begin: Id::from(format!("{proc_name}_{n}")),
            label_end: Id::from(format!("{proc_name}_{n}_end")),
            instrs,
            succ,
        };
    }

    fn lower_simple(stmt: &Stmt) -> Instr {
        match stmt {
            Stmt::Assign { target, expr } => Instr::Assign { target: *target, expr: expr.clone() },
            Stmt::Print(s) => Instr::Print(*s),
            Stmt::Input(s) => Instr::Input(*s),
            Stmt::Nop => Instr::Nop,
            Stmt::Call { .. } | Stmt::If { .. } | Stmt::While { .. } => {
                unreachable!("handled by build() before falling through to lower_simple")
            }
        }
    }

    fn build(&mut self, proc: ProcId, scope: ScopeId, stmts: &[Stmt], fallthrough: Successors) -> BlockId {
        let mut instrs = Vec::new();

        for (idx, stmt) in stmts.iter().enumerate() {
            match stmt {
                Stmt::If { cond, then, else_ } => {
                    let temp = self.symtab.fresh_temp(scope);
                    let rest = &stmts[idx + 1..];
                    let rest_id = if rest.is_empty() {
                        self.build(proc, scope, &[Stmt::Nop], fallthrough)
                    } else {
                        self.build(proc, scope, rest, fallthrough)
                    };
                    let then_id = self.build(proc, scope, then, Successors::Next(rest_id));
                    let else_id = self.build(proc, scope, else_, Successors::Next(rest_id));
                    instrs.push(Instr::Assign { target: temp, expr: cond.clone() });
                    instrs.push(Instr::Branch { cond: temp, on_true: then_id, on_false: else_id });
                    return self.alloc(proc, instrs, Successors::Branch { on_true: then_id, on_false: else_id });
                }
                Stmt::While { cond, body } => {
                    let rest = &stmts[idx + 1..];
                    let rest_id = if rest.is_empty() {
                        self.build(proc, scope, &[Stmt::Nop], fallthrough)
                    } else {
                        self.build(proc, scope, rest, fallthrough)
                    };
                    let cond_id = self.reserve();
                    let body_id = self.build(proc, scope, body, Successors::Next(cond_id));
                    let temp = self.symtab.fresh_temp(scope);
                    let cond_instrs = vec![
                        Instr::Assign { target: temp, expr: cond.clone() },
                        Instr::Branch { cond: temp, on_true: body_id, on_false: rest_id },
                    ];
                    self.fill(cond_id, proc, cond_instrs, Successors::Branch { on_true: body_id, on_false: rest_id });
                    return self.alloc(proc, instrs, Successors::Next(cond_id));
                }
                Stmt::Call { callee } => {
                    let rest = &stmts[idx + 1..];
                    let rest_id = if rest.is_empty() {
                        self.build(proc, scope, &[Stmt::Nop], fallthrough)
                    } else {
                        self.build(proc, scope, rest, fallthrough)
                    };
                    if instrs.is_empty() {
                        instrs.push(Instr::Call { callee: *callee });
                        return self.alloc(proc, instrs, Successors::Next(rest_id));
                    }
                    let call_id = self.alloc(proc, vec![Instr::Call { callee: *callee }], Successors::Next(rest_id));
                    return self.alloc(proc, instrs, Successors::Next(call_id));
                }
                simple => instrs.push(Self::lower_simple(simple)),
            }
        }

        if instrs.is_empty() {
            instrs.push(Instr::Nop);
        }
        self.alloc(proc, instrs, fallthrough)
    }
}

/// Builds the shared block arena for every procedure in `procs`, where each
/// entry is `(procedure symbol, its scope, its structured statement list)`.
pub fn build_cfg(
    symtab: &mut SymbolTable,
    procs: &[(ProcId, ScopeId, Vec<Stmt>)],
) -> Cfg {
    let mut builder = Builder { symtab, blocks: Vec::new(), counter: 0 };
    let mut entry = crate::common::Map::new();

    for (proc, scope, stmts) in procs {
        let entry_id = builder.build(*proc, *scope, stmts, Successors::None);
        entry.insert(*proc, entry_id);
    }

    let blocks = builder.blocks;
    let mut reachable = crate::common::Map::new();
    for (proc, entry_id) in &entry {
        reachable.insert(*proc, reachable_from(&blocks, *entry_id));
    }

    Cfg { blocks, entry, reachable }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::ir::{BinOp, Expr};
    use crate::middle::symtab::SymbolTable;
    use pretty_assertions::assert_eq;

    fn setup() -> (SymbolTable, ScopeId) {
        let mut symtab = SymbolTable::new();
        let scope = symtab.root_scope();
        (symtab, scope)
    }

    #[test]
    fn straight_line_code_is_a_single_block() {
        let (mut symtab, scope) = setup();
        let x = symtab.declare(scope, crate::common::Id::from("x".to_string()), crate::middle::ir::INT, None);
        let stmts = vec![Stmt::Assign { target: x, expr: Expr::Const(1) }, Stmt::Print(x)];
        let cfg = build_cfg(&mut symtab, &[(symtab.global_proc, scope, stmts)]);
        assert_eq!(cfg.reachable[&symtab.global_proc].len(), 1);
        assert_eq!(cfg.block(cfg.entry[&symtab.global_proc]).instrs.len(), 2);
    }

    #[test]
    fn if_splits_into_three_blocks_sharing_rest() {
        let (mut symtab, scope) = setup();
        let x = symtab.declare(scope, crate::common::Id::from("x".to_string()), crate::middle::ir::INT, None);
        let stmts = vec![
            Stmt::If {
                cond: Expr::Bin { op: BinOp::Gtr, lhs: Box::new(Expr::var(x)), rhs: Box::new(Expr::Const(0)) },
                then: vec![Stmt::Print(x)],
                else_: vec![Stmt::Nop],
            },
            Stmt::Print(x),
        ];
        let cfg = build_cfg(&mut symtab, &[(symtab.global_proc, scope, stmts)]);
        let entry = cfg.block(cfg.entry[&symtab.global_proc]);
        let (then_id, else_id) = match entry.succ {
            Successors::Branch { on_true, on_false } => (on_true, on_false),
            _ => panic!("expected a branch"),
        };
        assert!(matches!(cfg.block(then_id).succ, Successors::Next(_)));
        assert!(matches!(cfg.block(else_id).succ, Successors::Next(_)));
        // then and else converge on the same rest block.
        let (Successors::Next(a), Successors::Next(b)) = (&cfg.block(then_id).succ, &cfg.block(else_id).succ) else {
            panic!()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn while_loop_back_edge_targets_its_own_condition_block() {
        let (mut symtab, scope) = setup();
        let x = symtab.declare(scope, crate::common::Id::from("x".to_string()), crate::middle::ir::INT, None);
        let stmts = vec![Stmt::While {
            cond: Expr::Bin { op: BinOp::Gtr, lhs: Box::new(Expr::var(x)), rhs: Box::new(Expr::Const(0)) },
            body: vec![Stmt::Assign { target: x, expr: Expr::Const(0) }],
        }];
        let cfg = build_cfg(&mut symtab, &[(symtab.global_proc, scope, stmts)]);
        let entry_id = cfg.entry[&symtab.global_proc];
        let cond_id = match cfg.block(entry_id).succ {
            Successors::Next(n) => n,
            _ => panic!("expected the loop head to fall through to the condition block"),
        };
        let body_id = match cfg.block(cond_id).succ {
            Successors::Branch { on_true, .. } => on_true,
            _ => panic!("expected the condition block to branch"),
        };
        assert!(matches!(cfg.block(body_id).succ, Successors::Next(n) if n == cond_id));
    }

    #[test]
    fn call_is_always_alone_in_its_block() {
        let (mut symtab, scope) = setup();
        let (callee, _) = symtab.declare_procedure(scope, crate::common::Id::from("p".to_string()));
        let x = symtab.declare(scope, crate::common::Id::from("x".to_string()), crate::middle::ir::INT, None);
        let stmts = vec![
            Stmt::Assign { target: x, expr: Expr::Const(1) },
            Stmt::Call { callee },
            Stmt::Print(x),
        ];
        let cfg = build_cfg(&mut symtab, &[(symtab.global_proc, scope, stmts)]);
        let call_block = cfg.reachable[&symtab.global_proc]
            .iter()
            .map(|&id| cfg.block(id))
            .find(|b| b.instrs.iter().any(|i| i.is_call()))
            .expect("a block containing the call");
        assert_eq!(call_block.instrs.len(), 1);
    }
}

/// DFS preorder over the blocks reachable from `start` (the
/// "reachable basic block list", mirrored on [`Cfg::reachable`]).
fn reachable_from(blocks: &[BasicBlock], start: BlockId) -> Vec<BlockId> {
    let mut visited = vec![false; blocks.len()];
    let mut order = Vec::new();
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        if visited[id.0 as usize] {
            continue;
        }
        visited[id.0 as usize] = true;
        order.push(id);
        match &blocks[id.0 as usize].succ {
            Successors::None => {}
            Successors::Next(n) => stack.push(*n),
            Successors::Branch { on_true, on_false } => {
                stack.push(*on_false);
                stack.push(*on_true);
            }
        }
    }
    order
}
