//! The opcode catalogue and its 32-bit word encoding.

use crate::error::VmFault;

// Word values, one per opcode. Operand-bearing opcodes occupy two
// consecutive words in the program stream.
pub const OP_PUSH: i32 = 0x01;
pub const OP_POP: i32 = 0x02;
pub const OP_DUP: i32 = 0x03;
pub const OP_ADD: i32 = 0x10;
pub const OP_SUB: i32 = 0x11;
pub const OP_MUL: i32 = 0x12;
pub const OP_DIV: i32 = 0x13;
pub const OP_CMP: i32 = 0x14;
pub const OP_EQ: i32 = 0x15;
pub const OP_JMP: i32 = 0x20;
pub const OP_JZ: i32 = 0x21;
pub const OP_JNZ: i32 = 0x22;
pub const OP_STORE: i32 = 0x30;
pub const OP_LOAD: i32 = 0x31;
pub const OP_CALL: i32 = 0x40;
pub const OP_RET: i32 = 0x41;
pub const OP_PRINT: i32 = 0x42;
pub const OP_HALT: i32 = 0xFF;

/// A decoded instruction with its inline operand, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Push an immediate integer.
    Push(i32),
    /// Pop the top of the stack.
    Pop,
    /// Duplicate the top of the stack.
    Dup,
    Add,
    Sub,
    Mul,
    Div,
    /// Less-than comparison, yields 0/1.
    Cmp,
    /// Equality comparison, yields 0/1.
    Eq,
    /// Unconditional jump to an absolute address.
    Jmp(i32),
    /// Jump if the popped condition is zero.
    Jz(i32),
    /// Jump if the popped condition is nonzero.
    Jnz(i32),
    /// Pop into a variable slot.
    Store(i32),
    /// Push from a variable slot.
    Load(i32),
    /// Push the return address and jump.
    Call(i32),
    /// Pop the return address and jump back.
    Ret,
    /// Pop and print.
    Print,
    /// Stop execution.
    Halt,
}

impl Op {
    /// Decode the instruction starting at `addr` in the word stream.
    ///
    /// Returns the instruction and the number of words it occupies (1 or 2).
    /// The caller guarantees `addr < words.len()`.
    pub fn decode(words: &[i32], addr: usize) -> Result<(Op, usize), VmFault> {
        let word = words[addr];
        let op = match word {
            OP_PUSH => Op::Push(operand(words, addr, "PUSH")?),
            OP_POP => Op::Pop,
            OP_DUP => Op::Dup,
            OP_ADD => Op::Add,
            OP_SUB => Op::Sub,
            OP_MUL => Op::Mul,
            OP_DIV => Op::Div,
            OP_CMP => Op::Cmp,
            OP_EQ => Op::Eq,
            OP_JMP => Op::Jmp(operand(words, addr, "JMP")?),
            OP_JZ => Op::Jz(operand(words, addr, "JZ")?),
            OP_JNZ => Op::Jnz(operand(words, addr, "JNZ")?),
            OP_STORE => Op::Store(operand(words, addr, "STORE")?),
            OP_LOAD => Op::Load(operand(words, addr, "LOAD")?),
            OP_CALL => Op::Call(operand(words, addr, "CALL")?),
            OP_RET => Op::Ret,
            OP_PRINT => Op::Print,
            OP_HALT => Op::Halt,
            _ => return Err(VmFault::InvalidOpcode { word, addr }),
        };
        Ok((op, op.size()))
    }

    /// Append this instruction's word encoding to `code`.
    pub fn encode_into(&self, code: &mut Vec<i32>) {
        match *self {
            Op::Push(imm) => {
                code.push(OP_PUSH);
                code.push(imm);
            }
            Op::Pop => code.push(OP_POP),
            Op::Dup => code.push(OP_DUP),
            Op::Add => code.push(OP_ADD),
            Op::Sub => code.push(OP_SUB),
            Op::Mul => code.push(OP_MUL),
            Op::Div => code.push(OP_DIV),
            Op::Cmp => code.push(OP_CMP),
            Op::Eq => code.push(OP_EQ),
            Op::Jmp(addr) => {
                code.push(OP_JMP);
                code.push(addr);
            }
            Op::Jz(addr) => {
                code.push(OP_JZ);
                code.push(addr);
            }
            Op::Jnz(addr) => {
                code.push(OP_JNZ);
                code.push(addr);
            }
            Op::Store(idx) => {
                code.push(OP_STORE);
                code.push(idx);
            }
            Op::Load(idx) => {
                code.push(OP_LOAD);
                code.push(idx);
            }
            Op::Call(addr) => {
                code.push(OP_CALL);
                code.push(addr);
            }
            Op::Ret => code.push(OP_RET),
            Op::Print => code.push(OP_PRINT),
            Op::Halt => code.push(OP_HALT),
        }
    }

    /// Number of words this instruction occupies.
    pub fn size(&self) -> usize {
        match self {
            Op::Push(_)
            | Op::Jmp(_)
            | Op::Jz(_)
            | Op::Jnz(_)
            | Op::Store(_)
            | Op::Load(_)
            | Op::Call(_) => 2,
            _ => 1,
        }
    }

    /// The instruction's mnemonic, without its operand.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Push(_) => "PUSH",
            Op::Pop => "POP",
            Op::Dup => "DUP",
            Op::Add => "ADD",
            Op::Sub => "SUB",
            Op::Mul => "MUL",
            Op::Div => "DIV",
            Op::Cmp => "CMP",
            Op::Eq => "EQ",
            Op::Jmp(_) => "JMP",
            Op::Jz(_) => "JZ",
            Op::Jnz(_) => "JNZ",
            Op::Store(_) => "STORE",
            Op::Load(_) => "LOAD",
            Op::Call(_) => "CALL",
            Op::Ret => "RET",
            Op::Print => "PRINT",
            Op::Halt => "HALT",
        }
    }

    /// The inline operand, if this instruction carries one.
    pub fn operand(&self) -> Option<i32> {
        match *self {
            Op::Push(v)
            | Op::Jmp(v)
            | Op::Jz(v)
            | Op::Jnz(v)
            | Op::Store(v)
            | Op::Load(v)
            | Op::Call(v) => Some(v),
            _ => None,
        }
    }
}

fn operand(words: &[i32], addr: usize, instruction: &'static str) -> Result<i32, VmFault> {
    words
        .get(addr + 1)
        .copied()
        .ok_or(VmFault::TruncatedInstruction { instruction, addr })
}
