//! The crate-root error type composing every pass's own error into one
//! value the CLI can match on and report.

use thiserror::Error;

use crate::front::lex::LexError;
use crate::front::parse::ParseError;
use crate::middle::error::LowerError;
use crate::middle::pipeline::PipelineError;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("could not read '{path}': {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Lower(#[from] LowerError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
