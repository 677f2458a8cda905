//! Spill and reload insertion.
//!
//! Computes, for every liveness node, the `Load`/`Store` instructions that
//! must surround it, then rebuilds each block's instruction list with
//! those inserted. The liveness graph itself is left untouched -- register
//! allocation interferes over the *original* liveness
//! nodes, before these insertions existed.

use crate::common::Set;
use crate::middle::cfg::Cfg;
use crate::middle::ir::{Instr, SymId};
use crate::middle::liveness::{LiveId, LivenessGraph};

#[derive(Default, Clone)]
struct Inserts {
    load_before: Set<SymId>,
    load_after: Set<SymId>,
    store_before: Set<SymId>,
    store_after: Set<SymId>,
}

/// Computes the per-node load/store sets from the already-converged
/// liveness graph:
///  - at the entry node, load `live_in(entry)`;
///  - for each edge `n -> s`, load into `s` the variables newly live there
///    that `n` doesn't already define;
///  - around a call, store `live_in` before it and reload `live_in` after;
///  - for each edge `n -> s`, store at `n` the variables dying along that
///    edge, plus `n`'s own defs if not all of them survive into `s`;
///  - at a node with no successors, store `live_in | defs`.
fn compute_inserts(graph: &LivenessGraph) -> Vec<Inserts> {
    let mut inserts: Vec<Inserts> = (0..graph.nodes.len()).map(|_| Inserts::default()).collect();

    inserts[graph.entry.0 as usize]
        .load_before
        .extend(graph.node(graph.entry).live_in.iter().copied());

    for (i, node) in graph.nodes.iter().enumerate() {
        let id = LiveId(i as u32);
        for &s in &node.succs {
            let succ = graph.node(s);
            let newborn: Set<SymId> = succ
                .live_in
                .iter()
                .filter(|v| !node.live_in.contains(*v) && !node.defs.contains(*v))
                .copied()
                .collect();
            inserts[s.0 as usize].load_before.extend(newborn);
        }
        if node.is_call {
            inserts[id.0 as usize].load_after.extend(node.live_in.iter().copied());
        }

        let mut to_store: Set<SymId> = Set::new();
        for &s in &node.succs {
            let succ = graph.node(s);
            to_store.extend(node.live_in.iter().filter(|v| !succ.live_in.contains(*v)).copied());
            if !node.defs.is_subset(&succ.live_in) {
                to_store.extend(node.defs.iter().copied());
            }
        }
        if node.is_call {
            to_store.extend(node.live_in.iter().copied());
        }
        if node.succs.is_empty() {
            to_store.extend(node.live_in.iter().copied());
            to_store.extend(node.defs.iter().copied());
        }
        for v in to_store {
            if node.defs.contains(&v) {
                inserts[id.0 as usize].store_after.insert(v);
            } else {
                inserts[id.0 as usize].store_before.insert(v);
            }
        }
    }

    inserts
}

/// Rewrites every block's instruction list, inserting `Store`/`Load`
/// instructions around the position each originally-numbered instruction
/// now occupies, in the fixed order Store-before, Load-before, Load-after,
/// Store-after.
pub fn insert_spills(cfg: &mut Cfg, graph: &LivenessGraph) {
    let inserts = compute_inserts(graph);

    for (&block_id, node_ids) in &graph.block_nodes {
        let old_instrs = std::mem::take(&mut cfg.block_mut(block_id).instrs);
        let mut new_instrs = Vec::with_capacity(old_instrs.len());
        for (instr, &node_id) in old_instrs.into_iter().zip(node_ids.iter()) {
            let ins = &inserts[node_id.0 as usize];
            if !ins.store_before.is_empty() {
                new_instrs.push(Instr::Store(ins.store_before.clone()));
            }
            if !ins.load_before.is_empty() {
                new_instrs.push(Instr::Load(ins.load_before.clone()));
            }
            new_instrs.push(instr);
            if !ins.store_after.is_empty() {
                new_instrs.push(Instr::Store(ins.store_after.clone()));
            }
            if !ins.load_after.is_empty() {
                new_instrs.push(Instr::Load(ins.load_after.clone()));
            }
        }
        cfg.block_mut(block_id).instrs = new_instrs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::cfg::build_cfg;
    use crate::middle::ir::{self, Expr, Stmt};
    use crate::middle::liveness::build_liveness;
    use crate::middle::symtab::SymbolTable;

    #[test]
    fn a_variable_live_across_a_call_is_stored_before_and_reloaded_after_it() {
        // x := 1; call p; print x
        let mut symtab = SymbolTable::new();
        let scope = symtab.root_scope();
        let x = symtab.declare(scope, crate::common::Id::from("x".to_string()), ir::INT, None);
        let (p, _) = symtab.declare_procedure(scope, crate::common::Id::from("p".to_string()));
        let stmts =
            vec![Stmt::Assign { target: x, expr: Expr::Const(1) }, Stmt::Call { callee: p }, Stmt::Print(x)];
        let mut cfg = build_cfg(&mut symtab, &[(symtab.global_proc, scope, stmts)]);
        let reachable = cfg.reachable[&symtab.global_proc].clone();
        let graph = build_liveness(&cfg, &reachable);
        insert_spills(&mut cfg, &graph);

        let call_block = reachable
            .iter()
            .map(|&id| cfg.block(id))
            .find(|b| b.instrs.iter().any(|i| i.is_call()))
            .expect("a block containing the call");
        assert!(matches!(&call_block.instrs[0], Instr::Store(s) if s.contains(&x)));
        assert!(call_block.instrs[1].is_call());
        assert!(matches!(&call_block.instrs[2], Instr::Load(s) if s.contains(&x)));

        let print_block = reachable
            .iter()
            .map(|&id| cfg.block(id))
            .find(|b| b.instrs.iter().any(|i| matches!(i, Instr::Print(s) if *s == x)))
            .expect("a block containing the print");
        assert!(matches!(&print_block.instrs[0], Instr::Store(s) if s.contains(&x)), "x is dead after the last print, so it must be flushed before the procedure falls off the end");
    }
}
