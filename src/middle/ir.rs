//! The intermediate representation shared by every middle-end pass.
//!
//! Node kinds are a tagged sum rather than an open class hierarchy: a rewrite
//! (constant folding, three-address lowering) builds a new node and the
//! caller substitutes it into the parent's child slot. There are no parent
//! back-pointers.

use derive_more::Display;

/// Base-kind tag for a [`TypeDesc`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Int,
    Float,
    Label,
    Struct,
    Function,
    Register,
}

/// A named type with a bit size and a base-kind tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeDesc {
    pub name: &'static str,
    pub size: u32,
    pub kind: TypeKind,
}

pub const INT: TypeDesc = TypeDesc { name: "int", size: 32, kind: TypeKind::Int };
pub const SHORT: TypeDesc = TypeDesc { name: "short", size: 16, kind: TypeKind::Int };
pub const CHAR: TypeDesc = TypeDesc { name: "char", size: 8, kind: TypeKind::Int };
pub const UINT: TypeDesc = TypeDesc { name: "uint", size: 32, kind: TypeKind::Int };
pub const USHORT: TypeDesc = TypeDesc { name: "ushort", size: 16, kind: TypeKind::Int };
pub const UCHAR: TypeDesc = TypeDesc { name: "uchar", size: 8, kind: TypeKind::Int };
pub const FLOAT: TypeDesc = TypeDesc { name: "float", size: 32, kind: TypeKind::Float };
pub const LABEL: TypeDesc = TypeDesc { name: "label", size: 0, kind: TypeKind::Label };
pub const FUNCTION: TypeDesc = TypeDesc { name: "function", size: 0, kind: TypeKind::Function };
pub const REGISTER: TypeDesc = TypeDesc { name: "register", size: 0, kind: TypeKind::Register };

/// Handle into [`crate::middle::symtab::SymbolTable`]'s symbol arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("sym{_0}")]
pub struct SymId(pub u32);

/// A procedure is identified by the [`SymId`] of its own function-typed symbol.
pub type ProcId = SymId;

/// Handle into a [`crate::middle::cfg::Cfg`]'s block arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("bb{_0}")]
pub struct BlockId(pub u32);

/// A physical MIPS register, `$8`-`$25` once the allocator has run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Display)]
#[display("${_0}")]
pub struct Register(pub u8);

/// Binary operators, named after the PL/0 grammar symbols.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum BinOp {
    #[display("times")]
    Times,
    #[display("slash")]
    Slash,
    #[display("plus")]
    Plus,
    #[display("minus")]
    Minus,
    #[display("eql")]
    Eql,
    #[display("neq")]
    Neq,
    #[display("lss")]
    Lss,
    #[display("leq")]
    Leq,
    #[display("gtr")]
    Gtr,
    #[display("geq")]
    Geq,
}

impl BinOp {
    /// True for the six comparison operators, which always produce a 0/1 result.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eql | BinOp::Neq | BinOp::Lss | BinOp::Leq | BinOp::Gtr | BinOp::Geq
        )
    }

    /// Host-integer evaluation used by constant folding.
    pub fn eval(self, lhs: i64, rhs: i64) -> Option<i64> {
        use BinOp::*;
        Some(match self {
            Times => lhs.wrapping_mul(rhs),
            Slash => lhs.checked_div(rhs)?,
            Plus => lhs.wrapping_add(rhs),
            Minus => lhs.wrapping_sub(rhs),
            Eql => (lhs == rhs) as i64,
            Neq => (lhs != rhs) as i64,
            Lss => (lhs < rhs) as i64,
            Leq => (lhs <= rhs) as i64,
            Gtr => (lhs > rhs) as i64,
            Geq => (lhs >= rhs) as i64,
        })
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum UnOp {
    #[display("plus")]
    Plus,
    #[display("minus")]
    Minus,
    #[display("oddsym")]
    Odd,
}

impl UnOp {
    pub fn eval(self, arg: i64) -> i64 {
        match self {
            UnOp::Plus => arg,
            UnOp::Minus => -arg,
            UnOp::Odd => (arg & 1 != 0) as i64,
        }
    }
}

/// An expression node. Post three-address lowering, every `Bin`/`Un` has only
/// `Var`/`Const` children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Const(i64),
    Var(SymId),
    Bin { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Un { op: UnOp, arg: Box<Expr> },
}

impl Expr {
    pub fn var(sym: SymId) -> Expr {
        Expr::Var(sym)
    }

    fn is_leaf(&self) -> bool {
        matches!(self, Expr::Const(_) | Expr::Var(_))
    }

    /// Checked by tests against the "three-address" invariant.
    pub fn is_three_address(&self) -> bool {
        match self {
            Expr::Const(_) | Expr::Var(_) => true,
            Expr::Bin { lhs, rhs, .. } => lhs.is_leaf() && rhs.is_leaf(),
            Expr::Un { arg, .. } => arg.is_leaf(),
        }
    }

    /// Every `Var` referenced anywhere in this expression (used for liveness
    /// `uses()` computation and for the call graph's free-variable scan).
    pub fn vars(&self, out: &mut Vec<SymId>) {
        match self {
            Expr::Const(_) => {}
            Expr::Var(s) => out.push(*s),
            Expr::Bin { lhs, rhs, .. } => {
                lhs.vars(out);
                rhs.vars(out);
            }
            Expr::Un { arg, .. } => arg.vars(out),
        }
    }
}

/// A structured statement, as produced by the front end and consumed by CFG
/// construction. Lowered to [`Instr`] once placed in a block.
#[derive(Clone, Debug)]
pub enum Stmt {
    Assign { target: SymId, expr: Expr },
    Call { callee: ProcId },
    If { cond: Expr, then: Vec<Stmt>, else_: Vec<Stmt> },
    While { cond: Expr, body: Vec<Stmt> },
    Print(SymId),
    Input(SymId),
    Nop,
}

/// A basic-block instruction: the lowered form of [`Stmt`], plus the
/// CFG-only `Branch` and the spill-insertion-only `Load`/`Store`.
#[derive(Clone, Debug)]
pub enum Instr {
    Assign { target: SymId, expr: Expr },
    Call { callee: ProcId },
    Print(SymId),
    Input(SymId),
    Branch { cond: SymId, on_true: BlockId, on_false: BlockId },
    Load(std::collections::BTreeSet<SymId>),
    Store(std::collections::BTreeSet<SymId>),
    Nop,
}

impl Instr {
    /// Variables read by this instruction.
    pub fn uses(&self) -> std::collections::BTreeSet<SymId> {
        let mut out = std::collections::BTreeSet::new();
        match self {
            Instr::Assign { expr, .. } => {
                let mut vars = Vec::new();
                expr.vars(&mut vars);
                out.extend(vars);
            }
            Instr::Print(s) | Instr::Branch { cond: s, .. } => {
                out.insert(*s);
            }
            Instr::Input(_) | Instr::Call { .. } | Instr::Load(_) | Instr::Store(_) | Instr::Nop => {}
        }
        out
    }

    /// Variables written by this instruction.
    pub fn defs(&self) -> std::collections::BTreeSet<SymId> {
        let mut out = std::collections::BTreeSet::new();
        match self {
            Instr::Assign { target, .. } | Instr::Input(target) => {
                out.insert(*target);
            }
            Instr::Print(_)
            | Instr::Branch { .. }
            | Instr::Call { .. }
            | Instr::Load(_)
            | Instr::Store(_)
            | Instr::Nop => {}
        }
        out
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Instr::Call { .. })
    }
}
