//! Instruction decoder for the LS-8.
//!
//! An instruction is one opcode byte followed by zero, one or two operand
//! bytes. The opcode itself carries its layout:
//!
//! ```text
//! AABCDDDD
//!  AA    number of operands (0-2)
//!  B     1 if the ALU executes the instruction
//!  C     1 if the instruction sets the PC itself
//!  DDDD  instruction identifier
//! ```

use crate::cpu::memory::MemoryError;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Set on opcodes that are executed by the ALU.
pub const ALU_BIT: u8 = 0b0010_0000;

/// Number of operand bytes that follow an opcode byte.
#[inline]
pub const fn operand_count(opcode: u8) -> usize {
    ((opcode >> 6) & 0b11) as usize
}

/// Total instruction length in bytes, opcode included.
#[inline]
pub const fn instruction_len(opcode: u8) -> usize {
    operand_count(opcode) + 1
}

/// Every operation the LS-8 understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // ==================== Data Transfer ====================

    /// Load immediate: R[a] := b
    Ldi,
    /// Store register: R[b] := R[a]
    St,
    /// Print register: emit R[a]
    Prn,

    // ==================== ALU ====================

    /// R[a] := R[a] + R[b]
    Add,
    /// Emit R[a] * R[b]
    Mul,
    /// Compare R[a] with R[b], setting FL
    Cmp,

    // ==================== Stack ====================

    /// Push R[a]
    Push,
    /// Pop into R[a]
    Pop,
    /// Push return address, jump to R[a]
    Call,
    /// Pop return address into PC
    Ret,

    // ==================== Control Flow ====================

    /// PC := R[a]
    Jmp,
    /// PC := R[a] if FL.E
    Jeq,
    /// PC := R[a] if !FL.E
    Jne,
    /// Halt execution
    Hlt,
}

impl Opcode {
    /// All opcodes, in table order.
    pub const ALL: [Opcode; 14] = [
        Opcode::Ldi,
        Opcode::St,
        Opcode::Prn,
        Opcode::Add,
        Opcode::Mul,
        Opcode::Cmp,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Call,
        Opcode::Ret,
        Opcode::Jmp,
        Opcode::Jeq,
        Opcode::Jne,
        Opcode::Hlt,
    ];

    /// The byte encoding of this opcode.
    pub const fn byte(self) -> u8 {
        match self {
            Opcode::Ldi => 0b1000_0010,
            Opcode::St => 0b1000_0100,
            Opcode::Prn => 0b0100_0111,
            Opcode::Add => 0b1010_0000,
            Opcode::Mul => 0b1010_0010,
            Opcode::Cmp => 0b1010_0111,
            Opcode::Push => 0b0100_0101,
            Opcode::Pop => 0b0100_0110,
            Opcode::Call => 0b0101_0000,
            Opcode::Ret => 0b0001_0001,
            Opcode::Jmp => 0b0101_0100,
            Opcode::Jeq => 0b0101_0101,
            Opcode::Jne => 0b0101_0110,
            Opcode::Hlt => 0b0000_0001,
        }
    }

    /// Look up the opcode for a byte, if there is one.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.byte() == byte)
    }

    /// Assembly mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Ldi => "LDI",
            Opcode::St => "ST",
            Opcode::Prn => "PRN",
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
            Opcode::Cmp => "CMP",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Jmp => "JMP",
            Opcode::Jeq => "JEQ",
            Opcode::Jne => "JNE",
            Opcode::Hlt => "HLT",
        }
    }

    /// Look up an opcode by mnemonic (case-insensitive).
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(mnemonic))
    }

    /// Number of operand bytes this opcode takes.
    pub const fn operand_count(self) -> usize {
        operand_count(self.byte())
    }

    /// True for ADD, MUL and CMP.
    pub const fn is_alu(self) -> bool {
        self.byte() & ALU_BIT != 0
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded instruction: opcode plus its operand bytes.
///
/// Operands beyond `opcode.operand_count()` are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: [u8; 2],
}

impl Instruction {
    /// Build an instruction, zeroing operands the opcode does not take.
    pub fn new(opcode: Opcode, operands: [u8; 2]) -> Self {
        let mut operands = operands;
        for slot in operands.iter_mut().skip(opcode.operand_count()) {
            *slot = 0;
        }
        Self { opcode, operands }
    }

    /// First operand byte.
    pub fn a(&self) -> u8 {
        self.operands[0]
    }

    /// Second operand byte.
    pub fn b(&self) -> u8 {
        self.operands[1]
    }

    /// Length in bytes.
    pub fn size(&self) -> usize {
        instruction_len(self.opcode.byte())
    }
}

/// Decode the instruction starting at `addr`.
pub fn decode(bytes: &[u8], addr: usize) -> Result<Instruction, DecodeError> {
    let byte = fetch(bytes, addr)?;
    let opcode = Opcode::from_byte(byte)
        .ok_or(DecodeError::UnknownOpcode { opcode: byte, addr })?;

    let mut operands = [0u8; 2];
    for (i, slot) in operands.iter_mut().take(opcode.operand_count()).enumerate() {
        *slot = fetch(bytes, addr + 1 + i)?;
    }

    Ok(Instruction { opcode, operands })
}

fn fetch(bytes: &[u8], addr: usize) -> Result<u8, DecodeError> {
    bytes.get(addr).copied().ok_or(DecodeError::Memory(MemoryError::OutOfBounds {
        addr,
        capacity: bytes.len(),
    }))
}

/// Encode an instruction back to bytes.
pub fn encode(instr: &Instruction) -> Vec<u8> {
    let mut out = Vec::with_capacity(instr.size());
    out.push(instr.opcode.byte());
    out.extend_from_slice(&instr.operands[..instr.opcode.operand_count()]);
    out
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {opcode:#010b} at address {addr:#04x}")]
    UnknownOpcode { opcode: u8, addr: usize },

    #[error("{0}")]
    Memory(#[from] MemoryError),
}
