//! Interference graph construction and greedy graph coloring.
//!
//! Builds interference purely from the converged [`LivenessGraph`]'s
//! `live_in` sets -- the `Load`/`Store` instructions spill insertion has
//! since added to the CFG play no part here (liveness feeds both spill
//! insertion and allocation independently, off the same graph).

use crate::common::Set;
use crate::middle::error::AllocError;
use crate::middle::ir::{ProcId, Register, SymId};
use crate::middle::liveness::LivenessGraph;
use crate::middle::symtab::SymbolTable;

const NUM_COLORS: usize = 18;

pub struct InterferenceGraph {
    pub adjacency: crate::common::Map<SymId, Set<SymId>>,
}

impl InterferenceGraph {
    fn add_edge(&mut self, a: SymId, b: SymId) {
        if a == b {
            return;
        }
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
    }
}

/// For every liveness node and every pair of variables simultaneously in
/// `live_in`, adds an interference edge between them.
pub fn build_interference(graph: &LivenessGraph) -> InterferenceGraph {
    let mut g = InterferenceGraph { adjacency: crate::common::Map::new() };
    for node in &graph.nodes {
        let vars: Vec<SymId> = node.live_in.iter().copied().collect();
        for v in &vars {
            g.adjacency.entry(*v).or_default();
        }
        for i in 0..vars.len() {
            for j in (i + 1)..vars.len() {
                g.add_edge(vars[i], vars[j]);
            }
        }
    }
    g
}

/// Greedily colors `graph` with at most [`NUM_COLORS`] colors, visiting
/// symbols in ascending `SymId` order for determinism, and records the
/// chosen register into `symtab`'s per-procedure register map for `proc`.
pub fn color(
    symtab: &mut SymbolTable,
    proc: ProcId,
    graph: &InterferenceGraph,
) -> Result<(), AllocError> {
    let mut order: Vec<SymId> = graph.adjacency.keys().copied().collect();
    order.sort();

    let mut colors: crate::common::Map<SymId, u8> = crate::common::Map::new();

    for &sym in &order {
        let mut used = [false; NUM_COLORS];
        if let Some(neighbors) = graph.adjacency.get(&sym) {
            for n in neighbors {
                if let Some(&c) = colors.get(n) {
                    used[c as usize] = true;
                }
            }
        }
        let chosen = used.iter().position(|&b| !b).ok_or_else(|| AllocError::OutOfRegisters {
            proc: symtab.symbol(proc).name.to_string(),
            needed: graph.adjacency.get(&sym).map(|n| n.len() + 1).unwrap_or(1),
        })?;
        colors.insert(sym, chosen as u8);
    }

    for (sym, c) in colors {
        symtab.symbol_mut(sym).registers.insert(proc, Register(c + 8));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clique(symtab: &mut SymbolTable, n: usize) -> InterferenceGraph {
        let scope = symtab.root_scope();
        let syms: Vec<SymId> = (0..n)
            .map(|i| symtab.declare(scope, crate::common::Id::from(format!("v{i}")), crate::middle::ir::INT, None))
            .collect();
        let mut g = InterferenceGraph { adjacency: crate::common::Map::new() };
        for &v in &syms {
            g.adjacency.entry(v).or_default();
        }
        for i in 0..syms.len() {
            for j in (i + 1)..syms.len() {
                g.add_edge(syms[i], syms[j]);
            }
        }
        g
    }

    #[test]
    fn a_clique_within_capacity_colors_every_symbol_distinctly() {
        let mut symtab = SymbolTable::new();
        let proc = symtab.global_proc;
        let graph = clique(&mut symtab, NUM_COLORS);
        color(&mut symtab, proc, &graph).expect("18 mutually-interfering symbols fit in 18 registers");
        let mut seen = std::collections::HashSet::new();
        for sym in graph.adjacency.keys() {
            let reg = symtab.symbol(*sym).registers[&proc];
            assert!((8..=25).contains(&reg.0));
            assert!(seen.insert(reg.0), "clique members must get distinct registers");
        }
    }

    #[test]
    fn a_clique_over_capacity_is_an_alloc_error() {
        let mut symtab = SymbolTable::new();
        let proc = symtab.global_proc;
        let graph = clique(&mut symtab, NUM_COLORS + 1);
        assert!(color(&mut symtab, proc, &graph).is_err());
    }

    #[test]
    fn non_interfering_symbols_can_share_a_register() {
        let mut symtab = SymbolTable::new();
        let proc = symtab.global_proc;
        let scope = symtab.root_scope();
        let a = symtab.declare(scope, crate::common::Id::from("a".to_string()), crate::middle::ir::INT, None);
        let b = symtab.declare(scope, crate::common::Id::from("b".to_string()), crate::middle::ir::INT, None);
        let mut graph = InterferenceGraph { adjacency: crate::common::Map::new() };
        graph.adjacency.entry(a).or_default();
        graph.adjacency.entry(b).or_default();
        color(&mut symtab, proc, &graph).unwrap();
        assert_eq!(symtab.symbol(a).registers[&proc], symtab.symbol(b).registers[&proc]);
    }
}
