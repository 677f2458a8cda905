//! Three-address lowering.
//!
//! Runs over a built [`Cfg`], rewriting every `Assign` whose expression is
//! not already three-address into a prefix of temp-assignments followed by
//! a final assignment whose `Bin`/`Un` has only `Var`/`Const` children.
//! `Branch`'s condition is already a bare `Var` by construction (CFG
//! construction introduces the condition temp itself), so it is untouched.

use crate::middle::cfg::Cfg;
use crate::middle::ir::{Expr, Instr};
use crate::middle::symtab::{ScopeId, SymbolTable};

/// Recursively flattens `expr`, returning the assignments needed to
/// compute its subexpressions followed by the now-flat expression itself.
fn lower_expr(symtab: &mut SymbolTable, scope: ScopeId, expr: &Expr) -> (Vec<Instr>, Expr) {
    match expr {
        Expr::Const(_) | Expr::Var(_) => (Vec::new(), expr.clone()),
        Expr::Bin { op, lhs, rhs } => {
            let mut prefix = Vec::new();
            let new_lhs = match lhs.as_ref() {
                Expr::Const(_) | Expr::Var(_) => (**lhs).clone(),
                other => {
                    let (mut pre, flat) = lower_expr(symtab, scope, other);
                    prefix.append(&mut pre);
                    let temp = symtab.fresh_temp(scope);
                    prefix.push(Instr::Assign { target: temp, expr: flat });
                    Expr::Var(temp)
                }
            };
            let new_rhs = match rhs.as_ref() {
                Expr::Const(_) | Expr::Var(_) => (**rhs).clone(),
                other => {
                    let (mut pre, flat) = lower_expr(symtab, scope, other);
                    prefix.append(&mut pre);
                    let temp = symtab.fresh_temp(scope);
                    prefix.push(Instr::Assign { target: temp, expr: flat });
                    Expr::Var(temp)
                }
            };
            (prefix, Expr::Bin { op: *op, lhs: Box::new(new_lhs), rhs: Box::new(new_rhs) })
        }
        Expr::Un { op, arg } => match arg.as_ref() {
            Expr::Const(_) | Expr::Var(_) => (Vec::new(), expr.clone()),
            other => {
                let (prefix, flat) = lower_expr(symtab, scope, other);
                let mut prefix = prefix;
                let temp = symtab.fresh_temp(scope);
                prefix.push(Instr::Assign { target: temp, expr: flat });
                (prefix, Expr::Un { op: *op, arg: Box::new(Expr::Var(temp)) })
            }
        },
    }
}

/// Rewrites every block reachable from any procedure's entry in place.
pub fn lower_cfg(symtab: &mut SymbolTable, cfg: &mut Cfg, scopes: &crate::common::Map<crate::middle::ir::ProcId, ScopeId>) {
    for (proc, blocks) in cfg.reachable.clone() {
        let scope = scopes[&proc];
        for block_id in blocks {
            let old_instrs = std::mem::take(&mut cfg.block_mut(block_id).instrs);
            let mut new_instrs = Vec::with_capacity(old_instrs.len());
            for instr in old_instrs {
                match instr {
                    Instr::Assign { target, expr } if !expr.is_three_address() => {
                        let (mut prefix, flat) = lower_expr(symtab, scope, &expr);
                        new_instrs.append(&mut prefix);
                        new_instrs.push(Instr::Assign { target, expr: flat });
                    }
                    other => new_instrs.push(other),
                }
            }
            cfg.block_mut(block_id).instrs = new_instrs;
        }
    }
}
