//! Statement/expression tree consumed by the code generator.
//!
//! The tree arrives already parsed; the front end that produces it is a
//! separate tool. Nodes carry no source positions for that reason.

use std::fmt::Write;

/// All expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal: 42
    Int(i32),
    /// Variable reference: foo
    Var(String),
    /// Binary operation: a + b
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary negation: -x
    Neg(Box<Expr>),
}

/// Binary operators the instruction set can express directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Less-than, yields 0/1.
    Less,
    /// Equality, yields 0/1.
    Equal,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Less => "<",
            BinaryOp::Equal => "==",
        }
    }
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Variable declaration: let x = expr; (missing initializer defaults to 0)
    Let { name: String, init: Option<Expr> },
    /// Assignment: x = expr;
    Assign { name: String, value: Expr },
    /// Print statement: print expr;
    Print(Expr),
    /// Conditional with optional else branch.
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    /// While loop.
    While { condition: Expr, body: Vec<Stmt> },
}

/// Render a statement list as an indented tree, one node per line.
pub fn dump(stmts: &[Stmt]) -> String {
    let mut out = String::new();
    for stmt in stmts {
        dump_stmt(stmt, 0, &mut out);
    }
    out
}

fn dump_stmt(stmt: &Stmt, level: usize, out: &mut String) {
    let pad = "  ".repeat(level);
    match stmt {
        Stmt::Let { name, init } => {
            let _ = writeln!(out, "{pad}Let {name}");
            if let Some(init) = init {
                dump_expr(init, level + 1, out);
            }
        }
        Stmt::Assign { name, value } => {
            let _ = writeln!(out, "{pad}Assign {name}");
            dump_expr(value, level + 1, out);
        }
        Stmt::Print(expr) => {
            let _ = writeln!(out, "{pad}Print");
            dump_expr(expr, level + 1, out);
        }
        Stmt::If {
            condition,
            then_body,
            else_body,
        } => {
            let _ = writeln!(out, "{pad}If");
            dump_expr(condition, level + 1, out);
            let _ = writeln!(out, "{pad}Then");
            for s in then_body {
                dump_stmt(s, level + 1, out);
            }
            if let Some(else_body) = else_body {
                let _ = writeln!(out, "{pad}Else");
                for s in else_body {
                    dump_stmt(s, level + 1, out);
                }
            }
        }
        Stmt::While { condition, body } => {
            let _ = writeln!(out, "{pad}While");
            dump_expr(condition, level + 1, out);
            let _ = writeln!(out, "{pad}Do");
            for s in body {
                dump_stmt(s, level + 1, out);
            }
        }
    }
}

fn dump_expr(expr: &Expr, level: usize, out: &mut String) {
    let pad = "  ".repeat(level);
    match expr {
        Expr::Int(n) => {
            let _ = writeln!(out, "{pad}Int {n}");
        }
        Expr::Var(name) => {
            let _ = writeln!(out, "{pad}Var {name}");
        }
        Expr::Binary { op, left, right } => {
            let _ = writeln!(out, "{pad}Binary {}", op.symbol());
            dump_expr(left, level + 1, out);
            dump_expr(right, level + 1, out);
        }
        Expr::Neg(operand) => {
            let _ = writeln!(out, "{pad}Neg");
            dump_expr(operand, level + 1, out);
        }
    }
}
