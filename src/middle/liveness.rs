//! Liveness analysis.
//!
//! One [`LivenessNode`] per instruction, linked the same way the CFG links
//! blocks: sequentially within a block, and from a block's last instruction
//! to the first instruction of each successor block. The backward
//! dataflow equations are then iterated to a fixed point.

use crate::common::Set;
use crate::middle::cfg::{Cfg, Successors};
use crate::middle::ir::{BlockId, SymId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LiveId(pub u32);

pub struct LivenessNode {
    pub block: BlockId,
    pub idx: usize,
    pub defs: Set<SymId>,
    pub uses: Set<SymId>,
    pub live_in: Set<SymId>,
    pub live_out: Set<SymId>,
    pub succs: Vec<LiveId>,
    pub is_call: bool,
}

pub struct LivenessGraph {
    pub nodes: Vec<LivenessNode>,
    pub entry: LiveId,
    /// The nodes belonging to each block, in instruction order.
    pub block_nodes: crate::common::Map<BlockId, Vec<LiveId>>,
}

impl LivenessGraph {
    pub fn node(&self, id: LiveId) -> &LivenessNode {
        &self.nodes[id.0 as usize]
    }
}

/// Builds the liveness graph for the procedure whose reachable blocks are
/// `reachable` (in `cfg.reachable[proc]` order) and iterates the backward
/// fixed point.
pub fn build_liveness(cfg: &Cfg, reachable: &[BlockId]) -> LivenessGraph {
    let mut nodes = Vec::new();
    let mut block_nodes: crate::common::Map<BlockId, Vec<LiveId>> = crate::common::Map::new();

    for &block_id in reachable {
        let block = cfg.block(block_id);
        let mut ids = Vec::with_capacity(block.instrs.len());
        for (idx, instr) in block.instrs.iter().enumerate() {
            let id = LiveId(nodes.len() as u32);
            nodes.push(LivenessNode {
                block: block_id,
                idx,
                defs: instr.defs(),
                uses: instr.uses(),
                live_in: Set::new(),
                live_out: Set::new(),
                succs: Vec::new(),
                is_call: instr.is_call(),
            });
            ids.push(id);
        }
        block_nodes.insert(block_id, ids);
    }

    // Link successors: within a block sequentially, and across blocks by
    // following the CFG's own `Successors`.
    for &block_id in reachable {
        let ids = &block_nodes[&block_id];
        for w in 0..ids.len().saturating_sub(1) {
            let next = ids[w + 1];
            nodes[ids[w].0 as usize].succs.push(next);
        }
        if let Some(&last) = ids.last() {
            let succs = match &cfg.block(block_id).succ {
                Successors::None => Vec::new(),
                Successors::Next(b) => vec![block_nodes[b][0]],
                Successors::Branch { on_true, on_false } => {
                    vec![block_nodes[on_true][0], block_nodes[on_false][0]]
                }
            };
            nodes[last.0 as usize].succs.extend(succs);
        }
    }

    let entry = block_nodes[&reachable[0]][0];

    // Backward fixed point: live_out(n) = union of live_in of
    // n's successors; live_in(n) = uses(n) | (live_out(n) - defs(n)).
    let mut changed = true;
    let mut iterations = 0;
    while changed {
        changed = false;
        iterations += 1;
        for i in 0..nodes.len() {
            let mut live_out = Set::new();
            for &s in &nodes[i].succs {
                live_out.extend(nodes[s.0 as usize].live_in.iter().copied());
            }
            if live_out.len() != nodes[i].live_out.len() || !live_out.is_subset(&nodes[i].live_out) {
                nodes[i].live_out.extend(live_out);
                changed = true;
            }
            let mut live_in: Set<SymId> = nodes[i].uses.clone();
            for v in nodes[i].live_out.iter() {
                if !nodes[i].defs.contains(v) {
                    live_in.insert(*v);
                }
            }
            if live_in.len() != nodes[i].live_in.len() || !live_in.is_subset(&nodes[i].live_in) {
                nodes[i].live_in.extend(live_in);
                changed = true;
            }
        }
    }
    log::debug!("liveness converged after {iterations} iterations");

    LivenessGraph { nodes, entry, block_nodes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::cfg::build_cfg;
    use crate::middle::ir::{self, Expr, Stmt};
    use crate::middle::symtab::SymbolTable;

    #[test]
    fn a_variable_dead_after_its_last_use_is_not_live_out_of_that_instruction() {
        // x := 1; y := x + 1; print y   -- x dies at the second instruction.
        let mut symtab = SymbolTable::new();
        let scope = symtab.root_scope();
        let x = symtab.declare(scope, crate::common::Id::from("x".to_string()), ir::INT, None);
        let y = symtab.declare(scope, crate::common::Id::from("y".to_string()), ir::INT, None);
        let stmts = vec![
            Stmt::Assign { target: x, expr: Expr::Const(1) },
            Stmt::Assign {
                target: y,
                expr: Expr::Bin { op: ir::BinOp::Plus, lhs: Box::new(Expr::var(x)), rhs: Box::new(Expr::Const(1)) },
            },
            Stmt::Print(y),
        ];
        let cfg = build_cfg(&mut symtab, &[(symtab.global_proc, scope, stmts)]);
        let reachable = cfg.reachable[&symtab.global_proc].clone();
        let graph = build_liveness(&cfg, &reachable);

        let x_assign = graph.node(LiveId(0));
        assert!(x_assign.live_out.contains(&x), "x is used by the very next instruction");
        let y_assign = graph.node(LiveId(1));
        assert!(!y_assign.live_out.contains(&x), "x has no more uses after the y := x + 1 instruction");
        assert!(y_assign.live_out.contains(&y));
    }
}
