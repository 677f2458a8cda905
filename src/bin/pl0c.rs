//! The PL/0 compiler binary. Takes a source file and an optional output
//! stage, emitting MIPS-32 assembly by default.
//!
//! Run with `--help` for more info.

use clap::{Parser, ValueEnum};
use pl0::error::CompileError;
use pl0::{back, front, middle};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// the input file
    file: String,
    /// the output stage to print
    #[arg(value_enum, short, long, default_value_t = Stage::Asm)]
    out: Stage,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
enum Stage {
    /// the list of tokens
    Tokens,
    /// the ast data structure
    Ast,
    /// the basic-block graph, one block's instructions per line
    Cfg,
    /// the resulting MIPS-32 assembly
    Asm,
}

fn run(args: &Args) -> Result<String, CompileError> {
    let input = std::fs::read_to_string(&args.file)
        .map_err(|source| CompileError::Io { path: args.file.clone(), source })?;

    match args.out {
        Stage::Tokens => {
            let mut lexer = front::lex::Lexer::new(&input);
            let mut out = String::new();
            while let Some(token) = lexer.next()? {
                out.push_str(&format!("{token}\n"));
            }
            Ok(out)
        }
        Stage::Ast => {
            let program = front::parse(&input)?;
            Ok(format!("{program:#?}\n"))
        }
        Stage::Cfg => {
            let program = front::parse(&input)?;
            let (symtab, procs) = front::lower(&program)?;
            let order: Vec<_> = procs.iter().map(|(proc, _, _)| *proc).collect();
            let compiled = middle::compile(symtab, procs)?;
            let mut out = String::new();
            for &proc in &order {
                for &block_id in &compiled.cfg.reachable[&proc] {
                    let block = compiled.cfg.block(block_id);
                    out.push_str(&format!("{}: {{\n", block.label_begin));
                    for instr in &block.instrs {
                        out.push_str(&format!("    {instr:?}\n"));
                    }
                    out.push_str("}\n");
                }
            }
            Ok(out)
        }
        Stage::Asm => {
            let program = front::parse(&input)?;
            let (symtab, procs) = front::lower(&program)?;
            let order: Vec<_> = procs.iter().map(|(proc, _, _)| *proc).collect();
            let compiled = middle::compile(symtab, procs)?;
            Ok(back::emit(&compiled, &order))
        }
    }
}

fn main() -> std::process::ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(output) => {
            print!("{output}");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
