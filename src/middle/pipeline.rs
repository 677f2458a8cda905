//! Orchestrates the middle-end passes in a fixed order:
//! optional constant folding, CFG construction, three-address lowering,
//! call-graph closure, stack layout, then per-procedure liveness, spill
//! insertion and register allocation.

use crate::common::Map;
use crate::middle::cfg::{self, Cfg};
use crate::middle::callgraph::{self, CallGraph};
use crate::middle::error::{AllocError, FoldError};
use crate::middle::fold;
use crate::middle::ir::{ProcId, Stmt};
use crate::middle::layout::{self, Frame};
use crate::middle::liveness;
use crate::middle::regalloc;
use crate::middle::spill;
use crate::middle::symtab::{ScopeId, SymbolTable};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error(transparent)]
    Fold(#[from] FoldError),
    #[error(transparent)]
    Alloc(#[from] AllocError),
}

/// A procedure as handed to the pipeline by `front::lower`: its own symbol,
/// the scope holding its locals, and its structured (pre-CFG) body.
pub type ProcBody = (ProcId, ScopeId, Vec<Stmt>);

/// Every artifact later stages (testing, MIPS emission) need.
pub struct CompiledProgram {
    pub symtab: SymbolTable,
    pub cfg: Cfg,
    pub call_graph: CallGraph,
    pub frames: Map<ProcId, Frame>,
}

/// Runs the whole middle end over an already-lowered program.
///
/// Folding always runs, unconditionally, before CFG construction: it is not
/// an optional optimization pass here, since it is also what substitutes
/// every reference to a `const` symbol with its literal value, and `const`
/// symbols never get a stack slot or a register of their own (`layout`
/// excludes them from a frame, so nothing would ever initialize one).
pub fn compile(
    mut symtab: SymbolTable,
    mut procs: Vec<ProcBody>,
) -> Result<CompiledProgram, PipelineError> {
    log::debug!("folding constants over {} procedures", procs.len());
    for (proc, _, stmts) in procs.iter_mut() {
        let before = stmts.len();
        *stmts = fold::fold_stmts(&symtab, stmts)?;
        log::debug!("folded {} ({} top-level statements)", symtab.symbol(*proc).name, before);
    }
    log::info!("constant folding done");

    log::debug!("building the control-flow graph");
    let mut cfg = cfg::build_cfg(&mut symtab, &procs);
    log::info!("cfg built: {} blocks over {} procedures", cfg.blocks.len(), procs.len());

    let scopes: Map<ProcId, ScopeId> = procs.iter().map(|(p, s, _)| (*p, *s)).collect();
    log::debug!("lowering to three-address form");
    crate::middle::three_addr::lower_cfg(&mut symtab, &mut cfg, &scopes);
    log::info!("three-address lowering done");

    log::debug!("building the call graph");
    let call_graph = callgraph::build_call_graph(&symtab, &cfg);
    log::info!("call graph closed over {} procedures", call_graph.nodes.len());

    log::debug!("laying out per-procedure stack frames");
    let layout_procs: Vec<(ProcId, ScopeId)> = procs.iter().map(|(p, s, _)| (*p, *s)).collect();
    let frames = layout::build_layout(&symtab, &call_graph, &layout_procs);
    for (proc, frame) in &frames {
        log::debug!(target: "pl0::layout", "{} frame ({} slots):\n{}", symtab.symbol(*proc).name, frame.len(), frame);
    }
    log::info!("stack layout done");

    for (proc, _, _) in &procs {
        let name = symtab.symbol(*proc).name;
        log::debug!("liveness/spill/allocation for {name}");
        let reachable = cfg.reachable[proc].clone();
        let graph = liveness::build_liveness(&cfg, &reachable);
        log::info!("{name}: liveness converged over {} nodes", graph.nodes.len());
        spill::insert_spills(&mut cfg, &graph);
        let interference = regalloc::build_interference(&graph);
        regalloc::color(&mut symtab, *proc, &interference)?;
        log::info!("{name}: registers allocated");
    }

    Ok(CompiledProgram { symtab, cfg, call_graph, frames })
}
