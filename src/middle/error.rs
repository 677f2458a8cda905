//! Per-stage error types for the middle end, composed into one
//! [`crate::error::CompileError`] at the crate root.

use crate::middle::ir::BinOp;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FoldError {
    #[error("division by zero while folding a constant '{op}' expression")]
    DivisionByZero { op: BinOp },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LowerError {
    #[error("undeclared identifier '{name}'")]
    UndeclaredIdent { name: String },
    #[error("'{name}' is a procedure and cannot be used as a variable")]
    NotAVariable { name: String },
    #[error("'{name}' is not a procedure and cannot be called")]
    NotAProcedure { name: String },
    #[error("cannot assign to constant '{name}'")]
    AssignToConst { name: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    #[error("procedure '{proc}' needs {needed} live registers but only 18 are available")]
    OutOfRegisters { proc: String, needed: usize },
}
