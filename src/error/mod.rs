//! Error types for code generation, bytecode loading, and execution.

use thiserror::Error;

/// Code-generation errors. Fatal: no bytecode is produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Unresolved label L{0} at end of code generation")]
    UnresolvedLabel(usize),

    #[error("Label L{0} placed more than once")]
    DuplicateLabel(usize),
}

/// Bytecode-file loading errors. Fatal: the program never starts running.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot read bytecode file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bytecode file length {len} is not a multiple of 4")]
    Misaligned { len: usize },
}

/// Runtime faults. Each one halts execution and leaves the VM in a
/// well-defined, introspectable state; none are retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmFault {
    #[error("Stack underflow in {instruction}")]
    StackUnderflow { instruction: &'static str },

    #[error("Type error: {instruction} expects integers, found {actual}")]
    TypeError {
        instruction: &'static str,
        actual: &'static str,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid jump target {target} in {instruction} (program length {len})")]
    InvalidJumpTarget {
        instruction: &'static str,
        target: i32,
        len: usize,
    },

    #[error("Invalid memory index {index} in {instruction} (memory size {size})")]
    InvalidMemoryIndex {
        instruction: &'static str,
        index: i32,
        size: usize,
    },

    #[error("RET with empty call stack")]
    CallStackUnderflow,

    #[error("Unknown opcode 0x{word:02x} at address {addr}")]
    InvalidOpcode { word: i32, addr: usize },

    #[error("Truncated instruction: {instruction} at address {addr} is missing its operand")]
    TruncatedInstruction {
        instruction: &'static str,
        addr: usize,
    },

    #[error("Step budget exhausted after {executed} instructions (possible infinite loop)")]
    StepBudgetExceeded { executed: u64 },
}

impl VmFault {
    /// Whether the VM can keep executing after this fault was reported.
    ///
    /// Only the step-budget abort is recoverable: the run loop stops but the
    /// machine itself is still in a runnable state, so a debugger can inspect
    /// and resume it. Every other fault halts the machine.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::StepBudgetExceeded { .. })
    }
}

/// A unified error type for all phases.
#[derive(Debug, Error)]
pub enum PicoError {
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Runtime fault: {0}")]
    Fault(#[from] VmFault),
}
