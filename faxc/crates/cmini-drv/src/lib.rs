//! The `cminic` compiler driver: CLI argument handling, pipeline
//! orchestration, and the fatal-diagnostic rendering of §7.
//!
//! The pipeline itself is two stages, `cmini_par::Parser::parse` (which
//! internally drives `cmini-lex`) and `cmini_gen::generate`, wrapped in a
//! single [`compile`] function so the binary's `main` has nothing to do but
//! call it, print the result, and map a terminal `Err` to the caret
//! diagnostic plus exit code 1.

use cmini_gen::CodegenError;
use cmini_par::{ParseError, Parser};
use cmini_util::{Diagnostic, Span};
use thiserror::Error;

/// The compiler's external configuration (§2.1): the source text, plus an
/// optional verbosity knob the binary reads from `RUST_LOG`. Kept as a
/// value distinct from `std::env::args()` so [`compile`] stays a plain
/// function of data, never of the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub source: String,
}

impl Config {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// The top-level error, wrapping each phase's error with `#[from]` so
/// `compile` can use `?` uniformly across the pipeline.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

impl CompileError {
    /// `None` only when the underlying error has no source position to
    /// underline (currently just `CodegenError::Io`, a write failure rather
    /// than a fault in the compiled program).
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Parse(e) => Some(e.span()),
            CompileError::Codegen(e) => e.span(),
        }
    }

    /// Renders this error as the §7 caret diagnostic against the original
    /// source line, when it carries a position; errors with none (I/O
    /// failures writing the emitted assembly) get a plain one-line message
    /// instead, since there is nothing in `source` to underline.
    pub fn render(&self, source: &str) -> String {
        match self.span() {
            Some(span) => Diagnostic::new(span, self.to_string()).render(source),
            None => format!("{self}\n"),
        }
    }
}

/// Runs the full pipeline: parse `config.source`, then generate assembly
/// into an in-memory buffer and return it as a `String`.
pub fn compile(config: &Config) -> Result<String, CompileError> {
    log::debug!("compiling {} byte(s) of source", config.source.len());
    let program = Parser::parse(&config.source)?;
    log::debug!(
        "parsed {} function(s), {} global(s)",
        program.functions.len(),
        program.globals.iter().count()
    );
    let mut buf = Vec::new();
    cmini_gen::generate(&program, &mut buf)?;
    // `generate` only ever writes valid UTF-8 (assembler mnemonics, decimal
    // literals, identifiers carried verbatim from the source text).
    Ok(String::from_utf8(buf).expect("emitted assembly is always valid UTF-8"))
}

/// Parses `argv` (excluding the program name) into a [`Config`], per §6:
/// exactly one positional argument, the source text itself rather than a
/// file path.
pub fn parse_args(args: &[String]) -> Result<Config, UsageError> {
    match args {
        [source] => Ok(Config::new(source.clone())),
        _ => Err(UsageError),
    }
}

/// The CLI was invoked with the wrong argument count. Distinct from
/// [`CompileError`]: this is a usage mistake, not a compile failure, and
/// per §6 its message goes to standard output rather than standard error.
#[derive(Debug, Error)]
#[error("usage: cminic <source>")]
pub struct UsageError;

/// Installs `env_logger` reading `RUST_LOG`, per §2.1: off by default,
/// stderr-only, and never touching the assembly written to stdout.
pub fn init_logging() {
    env_logger::init();
}
