//! x86-64 GNU-assembler (Intel syntax) code generation (§4.4).
//!
//! Takes a parsed [`cmini_par::Program`] and writes assembly text to any
//! `impl std::io::Write`. Every expression and statement, once generated,
//! leaves exactly one 8-byte value on the machine stack; this stack
//! discipline is what lets `Block`/`If`/`While`/`For` compose without ever
//! special-casing "this statement produced no value".

mod emit;
mod generator;
mod program;

pub mod error;

pub use error::{CodegenError, Result};
pub use program::generate;
