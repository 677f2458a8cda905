//! Lowers the parsed [`crate::front::ast`] into the middle end's
//! [`SymbolTable`] and per-procedure [`ProcBody`] list.
//!
//! Builds the symbol-table tree breadth-first per block (`const`s, then
//! `var`s, then nested `procedure`s, each recursively lowered before the
//! enclosing block's own body), resolving every identifier against the
//! scope chain as it goes. This is the only pass that can observe an
//! undeclared name, a call to a non-procedure, or an assignment to a
//! `const` -- everything after this point operates on [`SymId`]s that are
//! known to exist and be well-typed for their use.

use crate::common::Id;
use crate::front::ast;
use crate::middle::error::LowerError;
use crate::middle::ir::{self as mir, SymId};
use crate::middle::pipeline::ProcBody;
use crate::middle::symtab::{ScopeId, SymbolTable};

fn resolve(symtab: &SymbolTable, scope: ScopeId, name: Id) -> Result<SymId, LowerError> {
    symtab.find(scope, name.as_str()).ok_or_else(|| LowerError::UndeclaredIdent { name: name.to_string() })
}

fn resolve_var(symtab: &SymbolTable, scope: ScopeId, name: Id) -> Result<SymId, LowerError> {
    let sym = resolve(symtab, scope, name)?;
    if symtab.symbol(sym).is_function() {
        return Err(LowerError::NotAVariable { name: name.to_string() });
    }
    Ok(sym)
}

fn resolve_assign_target(symtab: &SymbolTable, scope: ScopeId, name: Id) -> Result<SymId, LowerError> {
    let sym = resolve_var(symtab, scope, name)?;
    if symtab.symbol(sym).is_const() {
        return Err(LowerError::AssignToConst { name: name.to_string() });
    }
    Ok(sym)
}

fn resolve_proc(symtab: &SymbolTable, scope: ScopeId, name: Id) -> Result<SymId, LowerError> {
    let sym = resolve(symtab, scope, name)?;
    if !symtab.symbol(sym).is_function() {
        return Err(LowerError::NotAProcedure { name: name.to_string() });
    }
    Ok(sym)
}

fn conv_binop(op: ast::BinOp) -> mir::BinOp {
    match op {
        ast::BinOp::Times => mir::BinOp::Times,
        ast::BinOp::Slash => mir::BinOp::Slash,
        ast::BinOp::Plus => mir::BinOp::Plus,
        ast::BinOp::Minus => mir::BinOp::Minus,
        ast::BinOp::Eql => mir::BinOp::Eql,
        ast::BinOp::Neq => mir::BinOp::Neq,
        ast::BinOp::Lss => mir::BinOp::Lss,
        ast::BinOp::Leq => mir::BinOp::Leq,
        ast::BinOp::Gtr => mir::BinOp::Gtr,
        ast::BinOp::Geq => mir::BinOp::Geq,
    }
}

fn conv_unop(op: ast::UnOp) -> mir::UnOp {
    match op {
        ast::UnOp::Plus => mir::UnOp::Plus,
        ast::UnOp::Minus => mir::UnOp::Minus,
        ast::UnOp::Odd => mir::UnOp::Odd,
    }
}

fn lower_expr(symtab: &SymbolTable, scope: ScopeId, expr: &ast::Expr) -> Result<mir::Expr, LowerError> {
    Ok(match expr {
        ast::Expr::Ident(name) => mir::Expr::Var(resolve_var(symtab, scope, *name)?),
        ast::Expr::Const(v) => mir::Expr::Const(*v),
        ast::Expr::Bin { op, lhs, rhs } => mir::Expr::Bin {
            op: conv_binop(*op),
            lhs: Box::new(lower_expr(symtab, scope, lhs)?),
            rhs: Box::new(lower_expr(symtab, scope, rhs)?),
        },
        ast::Expr::Un { op, arg } => {
            mir::Expr::Un { op: conv_unop(*op), arg: Box::new(lower_expr(symtab, scope, arg)?) }
        }
    })
}

fn lower_stmt(
    symtab: &mut SymbolTable,
    scope: ScopeId,
    stmt: &ast::Stmt,
) -> Result<Vec<mir::Stmt>, LowerError> {
    Ok(match stmt {
        ast::Stmt::Assign { target, expr } => {
            let target = resolve_assign_target(symtab, scope, *target)?;
            let expr = lower_expr(symtab, scope, expr)?;
            vec![mir::Stmt::Assign { target, expr }]
        }
        ast::Stmt::Call { callee } => {
            let callee = resolve_proc(symtab, scope, *callee)?;
            vec![mir::Stmt::Call { callee }]
        }
        ast::Stmt::Begin(stmts) => {
            let mut out = Vec::new();
            for s in stmts {
                out.extend(lower_stmt(symtab, scope, s)?);
            }
            out
        }
        ast::Stmt::If { cond, then, else_ } => {
            let cond = lower_expr(symtab, scope, cond)?;
            let then = lower_stmt(symtab, scope, then)?;
            let else_ = match else_ {
                Some(e) => lower_stmt(symtab, scope, e)?,
                None => Vec::new(),
            };
            vec![mir::Stmt::If { cond, then, else_ }]
        }
        ast::Stmt::While { cond, body } => {
            let cond = lower_expr(symtab, scope, cond)?;
            let body = lower_stmt(symtab, scope, body)?;
            vec![mir::Stmt::While { cond, body }]
        }
        ast::Stmt::Print(name) => vec![mir::Stmt::Print(resolve_var(symtab, scope, *name)?)],
        ast::Stmt::Input(name) => vec![mir::Stmt::Input(resolve_assign_target(symtab, scope, *name)?)],
    })
}

fn lower_block(
    symtab: &mut SymbolTable,
    scope: ScopeId,
    block: &ast::Block,
    procs: &mut Vec<ProcBody>,
) -> Result<Vec<mir::Stmt>, LowerError> {
    for (name, value) in &block.consts {
        symtab.declare(scope, *name, mir::INT, Some(*value));
    }
    for name in &block.vars {
        symtab.declare(scope, *name, mir::INT, None);
    }
    for proc in &block.procs {
        let (proc_id, proc_scope) = symtab.declare_procedure(scope, proc.name);
        let body = lower_block(symtab, proc_scope, &proc.body, procs)?;
        procs.push((proc_id, proc_scope, body));
    }
    lower_stmt(symtab, scope, &block.body)
}

/// Lowers a whole parsed program, returning the populated symbol table and
/// every procedure's body -- including the synthetic `global` procedure's,
/// appended last since its scope (the table's `root`) is only fully
/// populated once every nested procedure has been declared.
pub fn lower(program: &ast::Program) -> Result<(SymbolTable, Vec<ProcBody>), LowerError> {
    let mut symtab = SymbolTable::new();
    let mut procs = Vec::new();
    let scope = symtab.root_scope();
    let body = lower_block(&mut symtab, scope, &program.block, &mut procs)?;
    procs.push((symtab.global_proc, scope, body));
    Ok((symtab, procs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::parse::parse;

    fn lower_src(src: &str) -> Result<(SymbolTable, Vec<ProcBody>), LowerError> {
        let program = parse(src).expect("test programs parse cleanly");
        lower(&program)
    }

    #[test]
    fn a_well_formed_program_lowers_every_block_including_the_synthetic_global_body() {
        let (_, procs) = lower_src(
            "var x; procedure sq; var s; begin s := x * x end; begin x := 4; call sq end.",
        )
        .unwrap();
        // sq's body, then global's own (appended last).
        assert_eq!(procs.len(), 2);
    }

    #[test]
    fn referencing_an_undeclared_name_is_a_lower_error() {
        let err = lower_src("var x; begin y := 1 end.").unwrap_err();
        assert!(matches!(err, LowerError::UndeclaredIdent { name } if name == "y"));
    }

    #[test]
    fn calling_a_variable_is_a_lower_error() {
        let err = lower_src("var x; begin call x end.").unwrap_err();
        assert!(matches!(err, LowerError::NotAProcedure { name } if name == "x"));
    }

    #[test]
    fn assigning_to_a_constant_is_a_lower_error() {
        let err = lower_src("const c = 1; begin c := 2 end.").unwrap_err();
        assert!(matches!(err, LowerError::AssignToConst { name } if name == "c"));
    }

    #[test]
    fn reading_a_procedure_name_as_a_variable_is_a_lower_error() {
        let err = lower_src("var x; procedure p; begin x := 1 end; begin call p; x := p end.").unwrap_err();
        assert!(matches!(err, LowerError::NotAVariable { name } if name == "p"));
    }
}
