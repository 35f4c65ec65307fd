//! Tree-to-bytecode code generator.
//!
//! Single pass over the statement tree, emitting words directly. Forward
//! jump targets go through a label fixup table and are patched in place once
//! the label is placed. Variables get slots on first use, in encounter order.

use indexmap::IndexMap;

use crate::ast::{BinaryOp, Expr, Stmt};
use crate::error::CompileError;

use super::opcode::{
    OP_ADD, OP_CMP, OP_DIV, OP_EQ, OP_HALT, OP_JMP, OP_JZ, OP_LOAD, OP_MUL, OP_PRINT, OP_PUSH,
    OP_STORE, OP_SUB,
};
use super::program::Program;

/// A code-generation label. Refers to an address that may not be known yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Label(usize);

/// A patch site waiting for its label to be placed.
#[derive(Debug, Clone, Copy)]
struct Fixup {
    site: usize,
    label: Label,
}

/// The code generator: lowers a statement tree into a linear word program.
#[derive(Debug, Default)]
pub struct Compiler {
    code: Vec<i32>,
    variables: IndexMap<String, i32>,
    labels: Vec<Option<usize>>,
    fixups: Vec<Fixup>,
}

impl Compiler {
    /// Compile a full statement tree. Every generated program ends with an
    /// implicit `HALT`.
    pub fn compile(stmts: &[Stmt]) -> Result<Program, CompileError> {
        let mut compiler = Compiler::default();
        for stmt in stmts {
            compiler.gen_stmt(stmt)?;
        }
        compiler.emit(OP_HALT);
        compiler.finish()
    }

    fn finish(self) -> Result<Program, CompileError> {
        // Fixups are drained as labels are placed; anything left never got a
        // target, which is a code-generator bug, not a runtime fault.
        if let Some(fixup) = self.fixups.first() {
            return Err(CompileError::UnresolvedLabel(fixup.label.0));
        }
        Ok(Program::new(self.code))
    }

    // --- Emission helpers ---

    fn emit(&mut self, word: i32) {
        self.code.push(word);
    }

    fn emit_push(&mut self, value: i32) {
        self.emit(OP_PUSH);
        self.emit(value);
    }

    /// Emit a jump to `label`, queueing a fixup if it is not placed yet.
    fn emit_jump(&mut self, opcode: i32, label: Label) {
        self.emit(opcode);
        match self.labels[label.0] {
            Some(offset) => self.emit(offset as i32),
            None => {
                self.fixups.push(Fixup {
                    site: self.code.len(),
                    label,
                });
                self.emit(0);
            }
        }
    }

    fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Record the current offset as the label's address and patch every
    /// jump already emitted against it.
    fn place_label(&mut self, label: Label) -> Result<(), CompileError> {
        if self.labels[label.0].is_some() {
            return Err(CompileError::DuplicateLabel(label.0));
        }
        let offset = self.code.len();
        self.labels[label.0] = Some(offset);
        let mut i = 0;
        while i < self.fixups.len() {
            if self.fixups[i].label == label {
                let fixup = self.fixups.swap_remove(i);
                self.code[fixup.site] = offset as i32;
            } else {
                i += 1;
            }
        }
        Ok(())
    }

    /// Slot for a variable, assigned on first use in encounter order.
    fn slot(&mut self, name: &str) -> i32 {
        if let Some(&slot) = self.variables.get(name) {
            return slot;
        }
        let slot = self.variables.len() as i32;
        self.variables.insert(name.to_string(), slot);
        slot
    }

    // --- Lowering ---

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Let { name, init } => {
                match init {
                    Some(expr) => self.gen_expr(expr),
                    None => self.emit_push(0),
                }
                let slot = self.slot(name);
                self.emit(OP_STORE);
                self.emit(slot);
            }
            Stmt::Assign { name, value } => {
                self.gen_expr(value);
                let slot = self.slot(name);
                self.emit(OP_STORE);
                self.emit(slot);
            }
            Stmt::Print(expr) => {
                self.gen_expr(expr);
                self.emit(OP_PRINT);
            }
            Stmt::If {
                condition,
                then_body,
                else_body,
            } => {
                let else_label = self.new_label();
                self.gen_expr(condition);
                self.emit_jump(OP_JZ, else_label);
                for stmt in then_body {
                    self.gen_stmt(stmt)?;
                }
                match else_body {
                    Some(else_body) => {
                        let end_label = self.new_label();
                        self.emit_jump(OP_JMP, end_label);
                        self.place_label(else_label)?;
                        for stmt in else_body {
                            self.gen_stmt(stmt)?;
                        }
                        self.place_label(end_label)?;
                    }
                    None => self.place_label(else_label)?,
                }
            }
            Stmt::While { condition, body } => {
                let start_label = self.new_label();
                let end_label = self.new_label();
                self.place_label(start_label)?;
                self.gen_expr(condition);
                self.emit_jump(OP_JZ, end_label);
                for stmt in body {
                    self.gen_stmt(stmt)?;
                }
                self.emit_jump(OP_JMP, start_label);
                self.place_label(end_label)?;
            }
        }
        Ok(())
    }

    fn gen_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Int(value) => self.emit_push(*value),
            Expr::Var(name) => {
                let slot = self.slot(name);
                self.emit(OP_LOAD);
                self.emit(slot);
            }
            Expr::Binary { op, left, right } => {
                self.gen_expr(left);
                self.gen_expr(right);
                self.emit(match op {
                    BinaryOp::Add => OP_ADD,
                    BinaryOp::Sub => OP_SUB,
                    BinaryOp::Mul => OP_MUL,
                    BinaryOp::Div => OP_DIV,
                    BinaryOp::Less => OP_CMP,
                    BinaryOp::Equal => OP_EQ,
                });
            }
            Expr::Neg(operand) => {
                self.gen_expr(operand);
                self.emit_push(-1);
                self.emit(OP_MUL);
            }
        }
    }
}
