//! The middle end: symbol table, constant folding, CFG construction,
//! three-address lowering, call-graph closure, stack layout, liveness,
//! spill insertion and register allocation.

pub mod callgraph;
pub mod cfg;
pub mod error;
pub mod fold;
pub mod ir;
pub mod layout;
pub mod liveness;
pub mod pipeline;
pub mod regalloc;
pub mod spill;
pub mod symtab;
pub mod three_addr;

pub use pipeline::{compile, CompiledProgram, PipelineError};
