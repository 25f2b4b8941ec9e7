use std::io;

use thiserror::Error;

use super::command::{Segment, StackOp};

/// Everything that can stop a translation run.
/// None of these are recovered from inside the translator.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("malformed instruction on line {line}: {reason}")]
    MalformedInstruction { line: usize, reason: String },

    #[error("static {index} accessed before a module name was set")]
    UnboundModule { index: u16 },

    #[error("cannot {operation} the {segment} segment")]
    UnsupportedOperation { operation: StackOp, segment: Segment },

    #[error("unknown segment `{0}`")]
    UnknownSegment(String),

    #[error("unknown arithmetic operator `{0}`")]
    UnknownOperator(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, TranslateError>;
