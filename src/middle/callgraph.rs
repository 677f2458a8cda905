//! Call graph construction and the "uses frames of" transitive closure.

use crate::common::Set;
use crate::middle::cfg::Cfg;
use crate::middle::ir::{Instr, ProcId};
use crate::middle::symtab::SymbolTable;

pub struct CallGraphNode {
    /// Procedures called directly from this procedure's own body.
    pub calls: Set<ProcId>,
    /// Procedures whose frame this procedure must be able to reach,
    /// starting as the direct external-variable uses and growing to their
    /// transitive closure over `calls`.
    pub uses: Set<ProcId>,
}

pub struct CallGraph {
    pub nodes: crate::common::Map<ProcId, CallGraphNode>,
}

impl CallGraph {
    pub fn node(&self, proc: ProcId) -> &CallGraphNode {
        &self.nodes[&proc]
    }
}

fn direct_calls(instrs: &[Instr]) -> Set<ProcId> {
    instrs
        .iter()
        .filter_map(|i| match i {
            Instr::Call { callee } => Some(*callee),
            _ => None,
        })
        .collect()
}

/// Builds the call graph from the already-constructed CFG and runs the
/// fixed-point closure: repeatedly union each
/// node's `uses` with that of every procedure it calls until nothing
/// changes, then strike each procedure's own symbol out of its `uses` set
/// (reflexivity removed — the `global` procedure is not special-cased: a
/// procedure that reaches a global variable gets an ordinary
/// enclosing-frame slot for `global`, the same as any other ancestor).
pub fn build_call_graph(symtab: &SymbolTable, cfg: &Cfg) -> CallGraph {
    let mut nodes = crate::common::Map::new();

    for (&proc, blocks) in &cfg.reachable {
        let instrs: Vec<&Instr> = blocks.iter().flat_map(|b| cfg.block(*b).instrs.iter()).collect();
        let owned: Vec<Instr> = instrs.into_iter().cloned().collect();
        let calls = direct_calls(&owned);
        let uses = symtab.external_procs(proc, &owned);
        nodes.insert(proc, CallGraphNode { calls, uses });
    }

    let mut changed = true;
    let mut iterations = 0;
    while changed {
        changed = false;
        iterations += 1;
        let snapshot: crate::common::Map<ProcId, Set<ProcId>> =
            nodes.iter().map(|(p, n)| (*p, n.uses.clone())).collect();
        for (_, node) in nodes.iter_mut() {
            for callee in node.calls.clone() {
                if let Some(callee_uses) = snapshot.get(&callee) {
                    if !callee_uses.is_subset(&node.uses) {
                        node.uses.extend(callee_uses.iter().copied());
                        changed = true;
                    }
                }
            }
        }
    }
    log::debug!("call-graph closure converged after {iterations} iterations");

    for (&proc, node) in nodes.iter_mut() {
        node.uses.remove(&proc);
    }

    CallGraph { nodes }
}
