//! Word-stream disassembler for debug output.

use std::fmt::Write;

use super::opcode::Op;
use super::program::Program;

/// Disassemble a program to a human-readable listing, one instruction per
/// line, prefixed with its word address.
pub fn disassemble(program: &Program) -> String {
    let mut out = String::new();
    let words = program.words();
    let mut addr = 0;
    while addr < words.len() {
        match Op::decode(words, addr) {
            Ok((op, size)) => {
                match op.operand() {
                    Some(operand) => {
                        let _ = writeln!(out, "{:04} {:<5} {}", addr, op.mnemonic(), operand);
                    }
                    None => {
                        let _ = writeln!(out, "{:04} {}", addr, op.mnemonic());
                    }
                }
                addr += size;
            }
            Err(_) => {
                // Unknown or truncated word: show it raw and keep going so
                // the rest of the listing stays readable.
                let _ = writeln!(out, "{:04} ???   (0x{:02x})", addr, words[addr]);
                addr += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_shows_addresses_and_operands() {
        let program = Program::from_ops(&[Op::Push(10), Op::Push(20), Op::Add, Op::Halt]);
        let listing = disassemble(&program);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(
            lines,
            ["0000 PUSH  10", "0002 PUSH  20", "0004 ADD", "0005 HALT"]
        );
    }

    #[test]
    fn unknown_words_are_rendered_raw() {
        let program = Program::new(vec![0x01, 7, 0x99, 0xFF]);
        let listing = disassemble(&program);
        assert!(listing.contains("0002 ???   (0x99)"));
        assert!(listing.contains("0003 HALT"));
    }
}
