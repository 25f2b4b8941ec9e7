//! The Translator module is in charge of taking VM
//! source text and producing Hack assembly.
//!
//! It does this with a line-at-a-time reader feeding
//! a single-pass emitter; nothing is buffered in between.

pub mod command;
pub mod emitter;
pub mod error;
pub mod reader;

#[cfg(test)]
mod machine;
