//! The back-end of the compiler: MIPS-32 assembly emission.

pub mod mips;

pub use mips::emit;
