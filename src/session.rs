//! Program lifecycle: the state machine the orchestration layer sees.

use std::fmt;

use crate::ast::{self, Stmt};
use crate::error::{CompileError, VmFault};
use crate::vm::{Compiler, Debugger, Program, Vm};

/// Lifecycle states exposed to the orchestration layer. `Error` is terminal
/// and reachable from any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    Submitted,
    Parsed,
    Compiled,
    Running,
    Terminated,
    Error,
}

impl fmt::Display for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProgramState::Submitted => "SUBMITTED",
            ProgramState::Parsed => "PARSED",
            ProgramState::Compiled => "COMPILED",
            ProgramState::Running => "RUNNING",
            ProgramState::Terminated => "TERMINATED",
            ProgramState::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// One program's journey through the core: tree in, bytecode out, a VM to
/// run or debug it. Sequences calls into the core; parsing happens outside.
pub struct Session {
    ast: Option<Vec<Stmt>>,
    program: Option<Program>,
    debugger: Option<Debugger>,
    state: ProgramState,
}

impl Session {
    pub fn new() -> Self {
        Self {
            ast: None,
            program: None,
            debugger: None,
            state: ProgramState::Submitted,
        }
    }

    /// Attach an already-parsed statement tree.
    pub fn attach_ast(&mut self, ast: Vec<Stmt>) {
        self.ast = Some(ast);
        self.state = ProgramState::Parsed;
    }

    /// Attach precompiled bytecode (e.g. loaded from a `.byc` file).
    pub fn attach_program(&mut self, program: Program) {
        self.program = Some(program);
        self.state = ProgramState::Compiled;
    }

    pub fn state(&self) -> ProgramState {
        self.state
    }

    /// Lower the attached tree to bytecode.
    pub fn compile(&mut self) -> Result<(), CompileError> {
        let ast = match &self.ast {
            Some(ast) if self.state == ProgramState::Parsed => ast,
            _ => return Ok(()),
        };
        match Compiler::compile(ast) {
            Ok(program) => {
                self.program = Some(program);
                self.state = ProgramState::Compiled;
                Ok(())
            }
            Err(err) => {
                self.state = ProgramState::Error;
                Err(err)
            }
        }
    }

    /// Run the compiled program to completion.
    ///
    /// Runtime faults move the session to `Error`; the recoverable
    /// step-budget abort leaves it `Running` so the machine can be
    /// inspected and resumed through the debugger.
    pub fn run(&mut self) -> Result<(), VmFault> {
        let program = match &self.program {
            Some(program) if self.state == ProgramState::Compiled => program.clone(),
            _ => return Ok(()),
        };
        self.state = ProgramState::Running;
        let mut debugger = Debugger::new(Vm::new(program));
        let result = debugger.vm_mut().run();
        self.debugger = Some(debugger);
        match result {
            Ok(()) => {
                self.state = ProgramState::Terminated;
                Ok(())
            }
            Err(fault) if fault.is_recoverable() => Err(fault),
            Err(fault) => {
                self.state = ProgramState::Error;
                Err(fault)
            }
        }
    }

    /// Dispatch one debug command string.
    ///
    /// `state` and `ast` are answered here (the controller does not know
    /// about the lifecycle or the tree); everything else goes to the
    /// debugger, which is created on demand from the compiled program.
    pub fn debug_command(&mut self, line: &str) -> Result<Option<String>, VmFault> {
        let command = line.split_whitespace().next().unwrap_or("");
        match command {
            "state" => Ok(Some(self.state.to_string())),
            "ast" => Ok(Some(match &self.ast {
                Some(ast) => ast::dump(ast),
                None => "no tree attached".to_string(),
            })),
            _ => {
                let debugger = match self.ensure_debugger() {
                    Some(debugger) => debugger,
                    None => return Ok(Some("no compiled program".to_string())),
                };
                let output = debugger.handle_command(line)?;
                if let Some(debugger) = &self.debugger {
                    if !debugger.vm().running() && self.state == ProgramState::Running {
                        self.state = ProgramState::Terminated;
                    }
                }
                Ok(output)
            }
        }
    }

    /// The VM behind the session, if one has been created.
    pub fn vm(&self) -> Option<&Vm> {
        self.debugger.as_ref().map(|debugger| debugger.vm())
    }

    fn ensure_debugger(&mut self) -> Option<&mut Debugger> {
        if self.debugger.is_none() {
            let program = self.program.as_ref()?.clone();
            self.debugger = Some(Debugger::new(Vm::new(program)));
            if self.state == ProgramState::Compiled {
                self.state = ProgramState::Running;
            }
        }
        self.debugger.as_mut()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
