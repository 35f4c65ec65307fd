//! The debug controller: breakpoints and stepping layered over the
//! interpreter.
//!
//! The controller checks addresses against a breakpoint set at instruction
//! boundaries; the program itself is never patched. Stopping happens
//! *before* the breakpointed instruction executes. The hit is latched, so
//! the next `step` (or `run`) moves past it instead of reporting it again.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::error::VmFault;

use super::disassembler;
use super::vm::{Vm, STEP_BUDGET};

/// Outcome of a single `step`/`next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// One instruction executed.
    Executed,
    /// Stopped on a breakpoint before executing it.
    BreakpointHit(usize),
    /// Nothing to do: the machine is halted or past the end of the program.
    Finished,
}

/// Outcome of a `run`/`continue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    /// The machine halted or ran off the end of the program.
    Halted,
    /// Stopped on a breakpoint before executing it.
    Breakpoint(usize),
}

/// Interactive execution controller wrapping a [`Vm`].
pub struct Debugger {
    vm: Vm,
    breakpoints: BTreeSet<usize>,
    /// Breakpoint already reported at this address; the next step executes
    /// through it instead of re-reporting.
    stopped_at: Option<usize>,
}

impl Debugger {
    pub fn new(vm: Vm) -> Self {
        Self {
            vm,
            breakpoints: BTreeSet::new(),
            stopped_at: None,
        }
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }

    pub fn set_breakpoint(&mut self, addr: usize) {
        self.breakpoints.insert(addr);
    }

    pub fn clear_breakpoint(&mut self, addr: usize) {
        self.breakpoints.remove(&addr);
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = usize> + '_ {
        self.breakpoints.iter().copied()
    }

    /// Execute one instruction, unless an unacknowledged breakpoint sits at
    /// the current address, in which case stop in front of it.
    pub fn step(&mut self) -> Result<StepEvent, VmFault> {
        if !self.vm.running() || self.vm.pc() >= self.vm.program().len() {
            return Ok(StepEvent::Finished);
        }
        let pc = self.vm.pc();
        if self.breakpoints.contains(&pc) && self.stopped_at != Some(pc) {
            self.stopped_at = Some(pc);
            return Ok(StepEvent::BreakpointHit(pc));
        }
        self.stopped_at = None;
        self.vm.step()?;
        Ok(StepEvent::Executed)
    }

    /// Step over one logical instruction: re-step while the program counter
    /// has not moved from its starting value (a self-targeted jump is the
    /// only way that happens), stopping early on a breakpoint report.
    pub fn next(&mut self) -> Result<StepEvent, VmFault> {
        let start = self.vm.pc();
        match self.step()? {
            StepEvent::Executed => {}
            other => return Ok(other),
        }
        let mut steps: u64 = 1;
        while self.vm.running() && self.vm.pc() == start {
            match self.step()? {
                StepEvent::Executed => {}
                other => return Ok(other),
            }
            steps += 1;
            if steps >= STEP_BUDGET {
                return Err(VmFault::StepBudgetExceeded { executed: steps });
            }
        }
        Ok(StepEvent::Executed)
    }

    /// Step repeatedly until the machine halts or an unacknowledged
    /// breakpoint address is reached. Stops in front of the breakpointed
    /// instruction. Subject to the same step budget as a plain run.
    pub fn run(&mut self) -> Result<RunEvent, VmFault> {
        let mut steps: u64 = 0;
        loop {
            match self.step()? {
                StepEvent::Executed => {}
                StepEvent::BreakpointHit(addr) => return Ok(RunEvent::Breakpoint(addr)),
                StepEvent::Finished => return Ok(RunEvent::Halted),
            }
            steps += 1;
            if steps >= STEP_BUDGET {
                return Err(VmFault::StepBudgetExceeded { executed: steps });
            }
        }
    }

    /// Force the machine to stop without executing anything further.
    pub fn halt(&mut self) {
        self.vm.halt();
    }

    // --- Read-only views. None of these mutate interpreter or heap state. ---

    /// Register state: program counter, run flag, stacks.
    pub fn regs(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "pc      : {}", self.vm.pc());
        let _ = writeln!(out, "running : {}", self.vm.running());
        let stack: Vec<String> = self.vm.stack().iter().map(|v| v.to_string()).collect();
        let _ = writeln!(out, "stack   : [ {} ]", stack.join(" "));
        let calls: Vec<String> = self.vm.call_stack().iter().map(|a| a.to_string()).collect();
        let _ = writeln!(out, "calls   : [ {} ]", calls.join(" "));
        out
    }

    /// Operand stack rendering, bottom to top.
    pub fn print_stack(&self) -> String {
        if self.vm.stack().is_empty() {
            return "stack is empty".to_string();
        }
        let values: Vec<String> = self.vm.stack().iter().map(|v| v.to_string()).collect();
        format!("stack (bottom -> top): {}", values.join(" "))
    }

    /// Heap status: live object count and approximate footprint.
    pub fn memstat(&self) -> String {
        format!(
            "heap objects: {} ({} bytes approx)",
            self.vm.heap().object_count(),
            self.vm.heap().bytes_used()
        )
    }

    /// Execution statistics.
    pub fn info(&self) -> String {
        format!(
            "instructions executed: {}\nmax stack depth: {}",
            self.vm.instruction_count(),
            self.vm.max_stack_depth()
        )
    }

    /// Disassembly of the whole program.
    pub fn bytecode(&self) -> String {
        disassembler::disassemble(self.vm.program())
    }

    /// Dispatch one command string from the external shell.
    ///
    /// Returns the command's textual output, or `None` for commands this
    /// controller does not recognize (they are ignored, not errors).
    pub fn handle_command(&mut self, line: &str) -> Result<Option<String>, VmFault> {
        let mut parts = line.split_whitespace();
        let command = match parts.next() {
            Some(command) => command,
            None => return Ok(None),
        };
        let output = match command {
            "step" => describe_step(self.step()?),
            "next" => describe_step(self.next()?),
            "run" | "continue" => match self.run()? {
                RunEvent::Halted => "program halted".to_string(),
                RunEvent::Breakpoint(addr) => format!("stopped at breakpoint {}", addr),
            },
            "halt" => {
                self.halt();
                "machine halted".to_string()
            }
            "regs" => self.regs(),
            "print" => self.print_stack(),
            "info" => self.info(),
            "memstat" => self.memstat(),
            "bytecode" => self.bytecode(),
            "break" => match parts.next().and_then(|arg| arg.parse::<usize>().ok()) {
                Some(addr) => {
                    self.set_breakpoint(addr);
                    format!("breakpoint set at {}", addr)
                }
                None => "usage: break <address>".to_string(),
            },
            "clear" => match parts.next().and_then(|arg| arg.parse::<usize>().ok()) {
                Some(addr) => {
                    self.clear_breakpoint(addr);
                    format!("breakpoint removed from {}", addr)
                }
                None => "usage: clear <address>".to_string(),
            },
            _ => return Ok(None),
        };
        Ok(Some(output))
    }
}

fn describe_step(event: StepEvent) -> String {
    match event {
        StepEvent::Executed => "stepped".to_string(),
        StepEvent::BreakpointHit(addr) => format!("breakpoint hit at {}", addr),
        StepEvent::Finished => "program finished".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::opcode::Op;
    use crate::vm::program::Program;
    use crate::vm::value::Value;

    fn debugger(ops: &[Op]) -> Debugger {
        Debugger::new(Vm::new(Program::from_ops(ops)))
    }

    #[test]
    fn breakpoint_round_trip() {
        // 0: PUSH 10; 2: PUSH 20; 4: ADD; 5: PRINT; 6: HALT
        let mut dbg = debugger(&[Op::Push(10), Op::Push(20), Op::Add, Op::Print, Op::Halt]);
        dbg.set_breakpoint(4);

        let event = dbg.run().expect("run failed");
        assert_eq!(event, RunEvent::Breakpoint(4));
        assert_eq!(dbg.vm().pc(), 4);
        // Stopped before ADD: both pushes still on the stack.
        assert_eq!(dbg.vm().stack(), [Value::Int(10), Value::Int(20)]);

        // A following step executes the breakpointed instruction.
        let event = dbg.step().expect("step failed");
        assert_eq!(event, StepEvent::Executed);
        assert_eq!(dbg.vm().pc(), 5);
        assert_eq!(dbg.vm().stack(), [Value::Int(30)]);
    }

    #[test]
    fn step_reports_breakpoint_once_then_executes() {
        let mut dbg = debugger(&[Op::Push(1), Op::Halt]);
        dbg.set_breakpoint(0);

        assert_eq!(dbg.step().expect("step failed"), StepEvent::BreakpointHit(0));
        assert_eq!(dbg.vm().pc(), 0);
        assert_eq!(dbg.step().expect("step failed"), StepEvent::Executed);
        assert_eq!(dbg.vm().pc(), 2);
    }

    #[test]
    fn continue_past_acknowledged_breakpoint_runs_to_halt() {
        let mut dbg = debugger(&[Op::Push(1), Op::Push(2), Op::Add, Op::Halt]);
        dbg.set_breakpoint(2);

        assert_eq!(dbg.run().expect("run failed"), RunEvent::Breakpoint(2));
        assert_eq!(dbg.run().expect("run failed"), RunEvent::Halted);
        assert!(!dbg.vm().running());
        assert_eq!(dbg.vm().stack(), [Value::Int(3)]);
    }

    #[test]
    fn next_steps_over_a_two_word_instruction() {
        let mut dbg = debugger(&[Op::Push(7), Op::Halt]);
        assert_eq!(dbg.next().expect("next failed"), StepEvent::Executed);
        assert_eq!(dbg.vm().pc(), 2);
        assert_eq!(dbg.vm().stack(), [Value::Int(7)]);
    }

    #[test]
    fn halt_stops_without_executing() {
        let mut dbg = debugger(&[Op::Push(1), Op::Halt]);
        dbg.halt();
        assert!(!dbg.vm().running());
        assert_eq!(dbg.step().expect("step failed"), StepEvent::Finished);
        assert!(dbg.vm().stack().is_empty());
    }

    #[test]
    fn clear_breakpoint_lets_run_pass_through() {
        let mut dbg = debugger(&[Op::Push(1), Op::Halt]);
        dbg.set_breakpoint(0);
        dbg.clear_breakpoint(0);
        assert_eq!(dbg.run().expect("run failed"), RunEvent::Halted);
    }

    #[test]
    fn introspection_does_not_mutate_state() {
        let mut dbg = debugger(&[Op::Push(5), Op::Print, Op::Halt]);
        dbg.step().expect("step failed");

        let pc = dbg.vm().pc();
        let depth = dbg.vm().stack().len();
        let _ = dbg.regs();
        let _ = dbg.print_stack();
        let _ = dbg.memstat();
        let _ = dbg.info();
        let _ = dbg.bytecode();
        assert_eq!(dbg.vm().pc(), pc);
        assert_eq!(dbg.vm().stack().len(), depth);
    }

    #[test]
    fn faults_surface_through_step() {
        let mut dbg = debugger(&[Op::Pop, Op::Halt]);
        let fault = dbg.step().expect_err("expected fault");
        assert_eq!(fault, VmFault::StackUnderflow { instruction: "POP" });
        assert!(!dbg.vm().running());
    }

    #[test]
    fn command_dispatch_maps_the_shell_surface() {
        let mut dbg = debugger(&[Op::Push(1), Op::Print, Op::Halt]);

        assert_eq!(
            dbg.handle_command("break 2").expect("command failed"),
            Some("breakpoint set at 2".to_string())
        );
        assert_eq!(
            dbg.handle_command("run").expect("command failed"),
            Some("stopped at breakpoint 2".to_string())
        );
        assert_eq!(
            dbg.handle_command("clear 2").expect("command failed"),
            Some("breakpoint removed from 2".to_string())
        );
        let regs = dbg.handle_command("regs").expect("command failed").unwrap();
        assert!(regs.contains("pc      : 2"));
        assert_eq!(
            dbg.handle_command("continue").expect("command failed"),
            Some("program halted".to_string())
        );
    }

    #[test]
    fn unknown_commands_are_ignored() {
        let mut dbg = debugger(&[Op::Halt]);
        assert_eq!(dbg.handle_command("frobnicate").expect("command failed"), None);
        assert_eq!(dbg.handle_command("").expect("command failed"), None);
    }

    #[test]
    fn break_without_address_reports_usage() {
        let mut dbg = debugger(&[Op::Halt]);
        assert_eq!(
            dbg.handle_command("break").expect("command failed"),
            Some("usage: break <address>".to_string())
        );
    }
}
