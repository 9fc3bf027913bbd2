//! The compiler module turns Milan source text into a textual
//! assembly listing for the course's abstract stack machine.
//!
//! Two interchangeable strategies fill the same kind of instruction
//! buffer: [`compile`] translates in a single pass, emitting code while
//! it parses, and [`compile_tree`] builds a typed syntax tree first and
//! walks it in post order. The tree strategy additionally accepts the
//! extended `repeat`/`until`, `break` and `continue` statements.

pub mod ast;
pub mod codegen;
pub mod generator;
pub mod lexer;
pub mod parser;
pub mod symbols;
pub mod translator;

use std::error::Error;
use std::fmt;

use crate::compiler::codegen::CodeBuffer;

/// Compilation finished with diagnostics already logged; the listing is
/// withheld.
#[derive(Debug, PartialEq, Eq)]
pub struct CompileError {
    pub errors: usize,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} error(s)", self.errors)
    }
}

impl Error for CompileError {}

/// Compiles `source` in a single pass.
pub fn compile(source: &str) -> Result<CodeBuffer, CompileError> {
    translator::Translator::new(source).run()
}

/// Compiles `source` through a syntax tree.
pub fn compile_tree(source: &str) -> Result<CodeBuffer, CompileError> {
    let root = parser::Parser::new(source).run()?;
    generator::generate(&root).map_err(|err| {
        error!("Error: {}", err);
        CompileError { errors: 1 }
    })
}
