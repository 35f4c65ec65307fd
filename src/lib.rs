//! picovm: a stack bytecode virtual machine with a tagged value model, a
//! mark-and-sweep object heap, and an interactive debug controller.
//!
//! The crate consumes bytecode (an ordered sequence of 32-bit words) either
//! compiled in-process from a statement tree or loaded from a flat binary
//! file, and executes it on a single-threaded machine whose heap, stack,
//! and variable slots are owned by that machine alone.

pub mod ast;
pub mod error;
pub mod session;
pub mod vm;

use std::path::Path;

use error::PicoError;
use vm::{Compiler, Program, Vm};

/// Lower a statement tree to bytecode.
pub fn compile(stmts: &[ast::Stmt]) -> Result<Program, error::CompileError> {
    Compiler::compile(stmts)
}

/// Compile and run a statement tree, returning the halted machine for
/// inspection.
pub fn run_ast(stmts: &[ast::Stmt]) -> Result<Vm, PicoError> {
    let program = Compiler::compile(stmts)?;
    run_program(program)
}

/// Run a compiled program to completion.
pub fn run_program(program: Program) -> Result<Vm, PicoError> {
    let mut vm = Vm::new(program);
    vm.run()?;
    Ok(vm)
}

/// Load a `.byc` bytecode file and run it.
pub fn run_file(path: &Path) -> Result<Vm, PicoError> {
    let program = Program::from_file(path)?;
    run_program(program)
}
