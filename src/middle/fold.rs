//! Constant folding and propagation.
//!
//! Runs over the structured [`Stmt`] tree produced by the front end, before
//! CFG construction. Always runs unconditionally: besides folding literal
//! arithmetic, it is what substitutes every `const` symbol with its value,
//! and `const` symbols never get a stack slot or register of their own.

use crate::middle::error::FoldError;
use crate::middle::ir::{BinOp, Expr, Stmt};
use crate::middle::symtab::SymbolTable;

/// Folds constant subexpressions and substitutes known-constant variables
/// wherever `expr` appears, returning the rewritten expression.
///
/// A constant `Var` (one whose symbol carries a `value`) is replaced by its
/// `Const`. A `Bin`/`Un` node whose children are now both constant is
/// evaluated with host-integer arithmetic; division by zero is a hard
/// error rather than a silently-preserved runtime fault.
pub fn fold_expr(symtab: &SymbolTable, expr: &Expr) -> Result<Expr, FoldError> {
    match expr {
        Expr::Const(_) => Ok(expr.clone()),
        Expr::Var(sym) => match symtab.symbol(*sym).value {
            Some(v) => Ok(Expr::Const(v)),
            None => Ok(expr.clone()),
        },
        Expr::Bin { op, lhs, rhs } => {
            let lhs = fold_expr(symtab, lhs)?;
            let rhs = fold_expr(symtab, rhs)?;
            if let (Expr::Const(a), Expr::Const(b)) = (&lhs, &rhs) {
                let v = op.eval(*a, *b).ok_or(FoldError::DivisionByZero { op: *op })?;
                Ok(Expr::Const(v))
            } else {
                Ok(Expr::Bin { op: *op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
            }
        }
        Expr::Un { op, arg } => {
            let arg = fold_expr(symtab, arg)?;
            if let Expr::Const(a) = arg {
                Ok(Expr::Const(op.eval(a)))
            } else {
                Ok(Expr::Un { op: *op, arg: Box::new(arg) })
            }
        }
    }
}

/// Applies [`fold_expr`] to every expression appearing in `stmts`,
/// recursing into `if`/`while` bodies.
pub fn fold_stmts(symtab: &SymbolTable, stmts: &[Stmt]) -> Result<Vec<Stmt>, FoldError> {
    stmts.iter().map(|s| fold_stmt(symtab, s)).collect()
}

fn fold_stmt(symtab: &SymbolTable, stmt: &Stmt) -> Result<Stmt, FoldError> {
    Ok(match stmt {
        Stmt::Assign { target, expr } => {
            Stmt::Assign { target: *target, expr: fold_expr(symtab, expr)? }
        }
        Stmt::Call { callee } => Stmt::Call { callee: *callee },
        Stmt::If { cond, then, else_ } => Stmt::If {
            cond: fold_expr(symtab, cond)?,
            then: fold_stmts(symtab, then)?,
            else_: fold_stmts(symtab, else_)?,
        },
        Stmt::While { cond, body } => {
            Stmt::While { cond: fold_expr(symtab, cond)?, body: fold_stmts(symtab, body)? }
        }
        Stmt::Print(s) => Stmt::Print(*s),
        Stmt::Input(s) => Stmt::Input(*s),
        Stmt::Nop => Stmt::Nop,
    })
}

/// Folds a comparison operator's result into `0`/`1`, exposed for use by
/// [`fold_expr`]'s evaluation of `BinOp`s; kept as a free function so tests
/// can exercise comparison folding directly without building a `SymbolTable`.
pub fn eval_const(op: BinOp, lhs: i64, rhs: i64) -> Option<i64> {
    op.eval(lhs, rhs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::ir;
    use pretty_assertions::assert_eq;

    #[test]
    fn folds_nested_constant_arithmetic() {
        let symtab = SymbolTable::new();
        // (2 + 3) * 4
        let expr = Expr::Bin {
            op: BinOp::Times,
            lhs: Box::new(Expr::Bin { op: BinOp::Plus, lhs: Box::new(Expr::Const(2)), rhs: Box::new(Expr::Const(3)) }),
            rhs: Box::new(Expr::Const(4)),
        };
        assert_eq!(fold_expr(&symtab, &expr).unwrap(), Expr::Const(20));
    }

    #[test]
    fn substitutes_const_symbol_before_folding() {
        let mut symtab = SymbolTable::new();
        let scope = symtab.root_scope();
        let k = symtab.declare(scope, crate::common::Id::from("k".to_string()), ir::INT, Some(7));
        let expr = Expr::Bin { op: BinOp::Times, lhs: Box::new(Expr::var(k)), rhs: Box::new(Expr::var(k)) };
        assert_eq!(fold_expr(&symtab, &expr).unwrap(), Expr::Const(49));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let symtab = SymbolTable::new();
        let expr = Expr::Bin { op: BinOp::Slash, lhs: Box::new(Expr::Const(1)), rhs: Box::new(Expr::Const(0)) };
        assert_eq!(fold_expr(&symtab, &expr), Err(FoldError::DivisionByZero { op: BinOp::Slash }));
    }

    #[test]
    fn non_constant_expression_is_left_unfolded() {
        let mut symtab = SymbolTable::new();
        let scope = symtab.root_scope();
        let x = symtab.declare(scope, crate::common::Id::from("x".to_string()), ir::INT, None);
        let expr = Expr::Bin { op: BinOp::Plus, lhs: Box::new(Expr::var(x)), rhs: Box::new(Expr::Const(1)) };
        assert_eq!(fold_expr(&symtab, &expr).unwrap(), expr);
    }
}
