//! The immutable bytecode program: an ordered sequence of 32-bit words.

use std::fs;
use std::path::Path;

use crate::error::LoadError;

use super::opcode::Op;

/// A compiled program. Opcodes and their inline operands are interpreted
/// positionally; there is no separate operand table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    words: Vec<i32>,
}

impl Program {
    pub fn new(words: Vec<i32>) -> Self {
        Self { words }
    }

    /// Build a program from decoded instructions. Convenient for tests and
    /// embedders that construct bytecode directly.
    pub fn from_ops(ops: &[Op]) -> Self {
        let mut words = Vec::new();
        for op in ops {
            op.encode_into(&mut words);
        }
        Self { words }
    }

    /// Decode a flat little-endian bytecode image.
    ///
    /// The byte length must be a multiple of 4; anything else is a load-time
    /// fault, before any execution.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        if bytes.len() % 4 != 0 {
            return Err(LoadError::Misaligned { len: bytes.len() });
        }
        let words = bytes
            .chunks_exact(4)
            .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Ok(Self { words })
    }

    /// Load a `.byc` file from disk.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// The flat little-endian image of this program.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.words.len() * 4);
        for word in &self.words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    pub fn words(&self) -> &[i32] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, addr: usize) -> Option<i32> {
        self.words.get(addr).copied()
    }

    /// Whether `addr` is a valid word address in this program.
    pub fn in_bounds(&self, addr: i32) -> bool {
        addr >= 0 && (addr as usize) < self.words.len()
    }
}
