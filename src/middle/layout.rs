//! Per-procedure activation-record layout.

use crate::middle::callgraph::CallGraph;
use crate::middle::ir::{ProcId, SymId};
use crate::middle::symtab::{ScopeId, SymbolTable};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotOwner {
    /// Slot 0, reserved and never assigned to a symbol.
    Unused,
    /// Holds the frame pointer of an enclosing procedure this one needs to
    /// reach (one slot per member of `uses(f)`, ordered by `ProcId`).
    EnclosingFrame(ProcId),
    /// A non-temporary, non-constant local variable, in declaration order.
    Local(SymId),
}

pub struct Frame {
    /// `slots[i]` is the owner of the slot at offset `-4*i` from `$fp`.
    pub slots: Vec<SlotOwner>,
}

impl Frame {
    pub fn offset_of(&self, owner: SlotOwner) -> Option<i32> {
        self.slots.iter().position(|&s| s == owner).map(|i| -4 * i as i32)
    }

    pub fn index_of_enclosing(&self, proc: ProcId) -> Option<usize> {
        self.slots.iter().position(|&s| s == SlotOwner::EnclosingFrame(proc))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, slot) in self.slots.iter().enumerate() {
            writeln!(f, "{:>5}($fp): {:?}", -4 * i as i32, slot)?;
        }
        Ok(())
    }
}

/// Computes every procedure's frame: slot 0 unused, then one slot per
/// procedure in `uses(f)` (ordered for determinism), then `f`'s own
/// non-temporary non-constant locals in declaration order.
pub fn build_layout(
    symtab: &SymbolTable,
    call_graph: &CallGraph,
    procs: &[(ProcId, ScopeId)],
) -> crate::common::Map<ProcId, Frame> {
    let mut frames = crate::common::Map::new();
    for &(proc, scope) in procs {
        let mut slots = vec![SlotOwner::Unused];
        for &used in call_graph.node(proc).uses.iter() {
            slots.push(SlotOwner::EnclosingFrame(used));
        }
        for local in symtab.locals_of(scope) {
            slots.push(SlotOwner::Local(local));
        }
        frames.insert(proc, Frame { slots });
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::cfg::build_cfg;
    use crate::middle::ir::{self, Expr, Stmt};
    use crate::middle::symtab::SymbolTable;

    #[test]
    fn slot_zero_is_unused_then_enclosing_frames_then_locals() {
        let mut symtab = SymbolTable::new();
        let root = symtab.root_scope();
        let x = symtab.declare(root, crate::common::Id::from("x".to_string()), ir::INT, None);
        let (sq, sq_scope) = symtab.declare_procedure(root, crate::common::Id::from("sq".to_string()));
        let s = symtab.declare(root, crate::common::Id::from("s".to_string()), ir::INT, None);

        let sq_body = vec![Stmt::Assign {
            target: s,
            expr: Expr::Bin { op: ir::BinOp::Times, lhs: Box::new(Expr::var(x)), rhs: Box::new(Expr::var(x)) },
        }];
        let global_body = vec![Stmt::Assign { target: x, expr: Expr::Const(6) }, Stmt::Call { callee: sq }];

        let procs = vec![(sq, sq_scope, sq_body), (symtab.global_proc, root, global_body)];
        let cfg = build_cfg(&mut symtab, &procs);
        let call_graph = crate::middle::callgraph::build_call_graph(&symtab, &cfg);
        let layout_procs: Vec<_> = procs.iter().map(|(p, s, _)| (*p, *s)).collect();
        let frames = build_layout(&symtab, &call_graph, &layout_procs);

        let sq_frame = &frames[&sq];
        assert_eq!(sq_frame.slots[0], SlotOwner::Unused);
        assert_eq!(sq_frame.slots[1], SlotOwner::EnclosingFrame(symtab.global_proc));
        assert_eq!(sq_frame.len(), 2);

        let global_frame = &frames[&symtab.global_proc];
        assert!(global_frame.slots.contains(&SlotOwner::Local(x)));
        assert!(global_frame.slots.contains(&SlotOwner::Local(s)));
    }
}
