//! The abstract syntax tree produced by the parser.
//!
//! Mirrors the PL/0 grammar directly: a [`Block`] is a declaration group
//! (`const`/`var`/`procedure`) followed by one statement, which is usually
//! a `begin ... end` list. Lowering (`front::lower`) is what turns this
//! into the middle end's symbol table and [`crate::middle::ir::Stmt`] tree.

use crate::common::Id;

#[derive(Debug)]
pub struct Program {
    pub block: Block,
}

#[derive(Debug)]
pub struct Block {
    pub consts: Vec<(Id, i64)>,
    pub vars: Vec<Id>,
    pub procs: Vec<Procedure>,
    pub body: Stmt,
}

#[derive(Debug)]
pub struct Procedure {
    pub name: Id,
    pub body: Block,
}

#[derive(Debug)]
pub enum Stmt {
    Assign { target: Id, expr: Expr },
    Call { callee: Id },
    Begin(Vec<Stmt>),
    If { cond: Expr, then: Box<Stmt>, else_: Option<Box<Stmt>> },
    While { cond: Expr, body: Box<Stmt> },
    Print(Id),
    Input(Id),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Times,
    Slash,
    Plus,
    Minus,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Plus,
    Minus,
    Odd,
}

#[derive(Debug)]
pub enum Expr {
    Ident(Id),
    Const(i64),
    Bin { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Un { op: UnOp, arg: Box<Expr> },
}
