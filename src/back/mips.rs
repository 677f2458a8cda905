//! MIPS-32 code emission, targeting a SPIM-class simulator.
//!
//! Emission walks each procedure's CFG depth-first from its entry block,
//! inlining the first not-yet-emitted successor and falling back to an
//! explicit jump for one that was already printed elsewhere (needed once
//! two branches of an `if` rejoin at a shared `rest` block, or a `while`
//! loop's back edge revisits its own condition block). A basic block
//! always ends with some control transfer of its own (branch, call
//! prologue's `jal`, `jr $ra`, or the program-exit syscall), so laying two
//! unrelated blocks back to back in the output is always safe.
//!
//! Registers `$4`/`$5`/`$6` are used as scratch space for materializing
//! constant operands and chasing enclosing-frame pointers; they are never
//! handed out by the allocator, which only ever assigns `$8-$25`.

use crate::middle::cfg::Successors;
use crate::middle::ir::{BinOp, Expr, Instr, ProcId, Register, SymId, UnOp};
use crate::middle::layout::SlotOwner;
use crate::middle::pipeline::CompiledProgram;

const SCRATCH_1: u8 = 4;
const SCRATCH_2: u8 = 5;
const SCRATCH_3: u8 = 6;

/// Emits the whole program: the `main` bootstrap that builds the `global`
/// procedure's own frame, followed by every procedure's code in `order`.
pub fn emit(program: &CompiledProgram, order: &[ProcId]) -> String {
    let mut out = String::new();
    emit_bootstrap(program, &mut out);
    for &proc in order {
        let mut visited = crate::common::Set::new();
        emit_block(program, proc, program.cfg.entry[&proc], &mut visited, &mut out);
    }
    out
}

fn emit_bootstrap(program: &CompiledProgram, out: &mut String) {
    let global = program.symtab.global_proc;
    let frame_words = program.frames[&global].len().max(1);
    let entry_label = program.cfg.block(program.cfg.entry[&global]).label_begin;
    out.push_str("\t.text\n\t.ent\tmain\nmain:\n");
    out.push_str("\taddi\t$sp, $sp, -8\n");
    out.push_str("\tsw\t$fp, 8($sp)\n");
    out.push_str("\tsw\t$ra, 4($sp)\n");
    out.push_str("\tmove\t$fp, $sp\n");
    out.push_str(&format!("\taddi\t$sp, $sp, -{}\n", frame_words * 4));
    out.push_str(&format!("\tj\t{entry_label}\n"));
}

fn reg_of(program: &CompiledProgram, proc: ProcId, sym: SymId) -> Register {
    match program.symtab.symbol(sym).registers.get(&proc) {
        Some(r) => *r,
        None => {
            log::warn!("{} has no register in {}; falling back to $4", program.symtab.symbol(sym).name, program.symtab.symbol(proc).name);
            Register(SCRATCH_1)
        }
    }
}

fn emit_block(
    program: &CompiledProgram,
    proc: ProcId,
    block_id: crate::middle::ir::BlockId,
    visited: &mut crate::common::Set<crate::middle::ir::BlockId>,
    out: &mut String,
) {
    visited.insert(block_id);
    let block = program.cfg.block(block_id);
    out.push_str(&format!("{}:\n", block.label_begin));
    for instr in &block.instrs {
        emit_instr(program, proc, instr, out);
    }
    match &block.succ {
        Successors::None => {
            if proc == program.symtab.global_proc {
                out.push_str("\tli\t$v0, 10\n\tsyscall\n");
            } else {
                out.push_str("\tjr\t$ra\n");
            }
        }
        Successors::Next(n) => emit_successor(program, proc, *n, visited, out),
        Successors::Branch { on_true, on_false } => {
            emit_successor(program, proc, *on_true, visited, out);
            emit_successor(program, proc, *on_false, visited, out);
        }
    }
}

fn emit_successor(
    program: &CompiledProgram,
    proc: ProcId,
    target: crate::middle::ir::BlockId,
    visited: &mut crate::common::Set<crate::middle::ir::BlockId>,
    out: &mut String,
) {
    if visited.contains(&target) {
        out.push_str(&format!("\tj\t{}\n", program.cfg.block(target).label_begin));
    } else {
        emit_block(program, proc, target, visited, out);
    }
}

/// Resolves an already-three-address operand to a register, materializing
/// a `Const` into `scratch` with `ori`.
fn operand_reg(out: &mut String, expr: &Expr, scratch: u8, program: &CompiledProgram, proc: ProcId) -> u8 {
    match expr {
        Expr::Const(v) => {
            out.push_str(&format!("\tori\t${scratch}, $0, {v}\n"));
            scratch
        }
        Expr::Var(s) => reg_of(program, proc, *s).0,
        _ => unreachable!("three-address lowering guarantees Const/Var operands here"),
    }
}

fn emit_bin(out: &mut String, program: &CompiledProgram, proc: ProcId, d: Register, op: BinOp, lhs: &Expr, rhs: &Expr) {
    let a = operand_reg(out, lhs, SCRATCH_1, program, proc);
    let b = operand_reg(out, rhs, SCRATCH_2, program, proc);
    match op {
        BinOp::Times => out.push_str(&format!("\tmul\t${}, ${a}, ${b}\n", d.0)),
        BinOp::Slash => out.push_str(&format!("\tdiv\t${}, ${a}, ${b}\n", d.0)),
        BinOp::Plus => out.push_str(&format!("\tadd\t${}, ${a}, ${b}\n", d.0)),
        BinOp::Minus => out.push_str(&format!("\tsub\t${}, ${a}, ${b}\n", d.0)),
        BinOp::Lss => out.push_str(&format!("\tslt\t${}, ${a}, ${b}\n", d.0)),
        BinOp::Gtr => out.push_str(&format!("\tslt\t${}, ${b}, ${a}\n", d.0)),
        BinOp::Leq => {
            out.push_str(&format!("\tslt\t${SCRATCH_3}, ${b}, ${a}\n"));
            out.push_str(&format!("\tsltiu\t${}, ${SCRATCH_3}, 1\n", d.0));
        }
        BinOp::Geq => {
            out.push_str(&format!("\tslt\t${SCRATCH_3}, ${a}, ${b}\n"));
            out.push_str(&format!("\tsltiu\t${}, ${SCRATCH_3}, 1\n", d.0));
        }
        BinOp::Eql => {
            out.push_str(&format!("\tslt\t${SCRATCH_3}, ${a}, ${b}\n"));
            out.push_str(&format!("\tslt\t${SCRATCH_1}, ${b}, ${a}\n"));
            out.push_str(&format!("\tor\t${SCRATCH_3}, ${SCRATCH_3}, ${SCRATCH_1}\n"));
            out.push_str(&format!("\tsltiu\t${}, ${SCRATCH_3}, 1\n", d.0));
        }
        BinOp::Neq => {
            out.push_str(&format!("\tslt\t${SCRATCH_3}, ${a}, ${b}\n"));
            out.push_str(&format!("\tslt\t${SCRATCH_1}, ${b}, ${a}\n"));
            out.push_str(&format!("\tor\t${}, ${SCRATCH_3}, ${SCRATCH_1}\n", d.0));
        }
    }
}

fn emit_un(out: &mut String, program: &CompiledProgram, proc: ProcId, d: Register, op: UnOp, arg: &Expr) {
    let a = operand_reg(out, arg, SCRATCH_1, program, proc);
    match op {
        UnOp::Plus => out.push_str(&format!("\tadd\t${}, $0, ${a}\n", d.0)),
        UnOp::Minus => out.push_str(&format!("\tsub\t${}, $0, ${a}\n", d.0)),
        UnOp::Odd => out.push_str(&format!("\tandi\t${}, ${a}, 1\n", d.0)),
    }
}

fn emit_load_store(
    out: &mut String,
    program: &CompiledProgram,
    proc: ProcId,
    vars: &crate::common::Set<SymId>,
    is_load: bool,
) {
    for &v in vars {
        let sym = program.symtab.symbol(v);
        if sym.temp {
            continue;
        }
        let owner = sym.level.expect("non-temp symbols always have an owning procedure");
        let reg = reg_of(program, proc, v);
        let op = if is_load { "lw" } else { "sw" };
        if owner == proc {
            let frame = &program.frames[&proc];
            let off = frame
                .offset_of(SlotOwner::Local(v))
                .expect("a local owned by this procedure always has a stack slot");
            out.push_str(&format!("\t{op}\t{reg}, {off}($fp)\n"));
        } else {
            let frame = &program.frames[&proc];
            let link = frame
                .offset_of(SlotOwner::EnclosingFrame(owner))
                .expect("call-graph closure guarantees uses(f) reaches owner");
            out.push_str(&format!("\tlw\t${SCRATCH_1}, {link}($fp)\n"));
            let owner_frame = &program.frames[&owner];
            let off = owner_frame
                .offset_of(SlotOwner::Local(v))
                .expect("the owning procedure's frame always has this local's slot");
            out.push_str(&format!("\t{op}\t{reg}, {off}(${SCRATCH_1})\n"));
        }
    }
}

fn emit_call(out: &mut String, program: &CompiledProgram, caller: ProcId, callee: ProcId) {
    let callee_frame = &program.frames[&callee];
    let caller_frame = &program.frames[&caller];

    out.push_str("\taddi\t$sp, $sp, -8\n");
    out.push_str("\tsw\t$fp, 8($sp)\n");
    out.push_str("\tsw\t$ra, 4($sp)\n");

    for (i, slot) in callee_frame.slots.iter().enumerate() {
        if let SlotOwner::EnclosingFrame(p) = slot {
            let dest = -4 * i as i32;
            if *p == caller {
                out.push_str(&format!("\tsw\t$fp, {dest}($sp)\n"));
            } else {
                let src = caller_frame
                    .offset_of(SlotOwner::EnclosingFrame(*p))
                    .expect("closure guarantees uses(callee) subset of uses(caller)");
                out.push_str(&format!("\tlw\t${SCRATCH_1}, {src}($fp)\n"));
                out.push_str(&format!("\tsw\t${SCRATCH_1}, {dest}($sp)\n"));
            }
        }
    }

    out.push_str("\tmove\t$fp, $sp\n");
    out.push_str(&format!("\taddi\t$sp, $sp, -{}\n", callee_frame.len().max(1) * 4));
    let callee_label = program.cfg.block(program.cfg.entry[&callee]).label_begin;
    out.push_str(&format!("\tjal\t{callee_label}\n"));
    out.push_str("\tmove\t$sp, $fp\n");
    out.push_str("\tlw\t$ra, 4($sp)\n");
    out.push_str("\tlw\t$fp, 8($sp)\n");
    out.push_str("\taddi\t$sp, $sp, 8\n");
}

fn emit_instr(program: &CompiledProgram, proc: ProcId, instr: &Instr, out: &mut String) {
    match instr {
        Instr::Assign { target, expr } => {
            let d = reg_of(program, proc, *target);
            match expr {
                Expr::Const(v) => out.push_str(&format!("\tori\t{d}, $0, {v}\n")),
                Expr::Var(s) => {
                    let src = reg_of(program, proc, *s);
                    out.push_str(&format!("\tmove\t{d}, {src}\n"));
                }
                Expr::Bin { op, lhs, rhs } => emit_bin(out, program, proc, d, *op, lhs, rhs),
                Expr::Un { op, arg } => emit_un(out, program, proc, d, *op, arg),
            }
        }
        Instr::Branch { cond, on_true, on_false } => {
            let c = reg_of(program, proc, *cond);
            let true_label = program.cfg.block(*on_true).label_begin;
            let false_label = program.cfg.block(*on_false).label_begin;
            out.push_str(&format!("\tbnez\t{c}, {true_label}\n"));
            out.push_str(&format!("\tj\t{false_label}\n"));
        }
        Instr::Print(s) => {
            let r = reg_of(program, proc, *s);
            out.push_str("\tori\t$2, $0, 1\n");
            out.push_str(&format!("\tor\t$4, $0, {r}\n"));
            out.push_str("\tsyscall\n");
            out.push_str("\tori\t$2, $0, 11\n");
            out.push_str("\tori\t$4, $0, 10\n");
            out.push_str("\tsyscall\n");
        }
        Instr::Input(s) => {
            let d = reg_of(program, proc, *s);
            out.push_str("\tori\t$2, $0, 5\n");
            out.push_str("\tsyscall\n");
            out.push_str(&format!("\tmove\t{d}, $2\n"));
        }
        Instr::Call { callee } => emit_call(out, program, proc, *callee),
        Instr::Load(vars) => emit_load_store(out, program, proc, vars, true),
        Instr::Store(vars) => emit_load_store(out, program, proc, vars, false),
        Instr::Nop => {}
    }
}
