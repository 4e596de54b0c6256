//! Arithmetic-logic unit.
//!
//! The ALU works on register indices, not values: every operation reads
//! its operands out of the register file and either writes a register,
//! writes FL, or hands a result back to the caller.

use crate::cpu::decode::Opcode;
use crate::cpu::registers::{Flags, RegisterError, Registers};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Operations the ALU performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AluOp {
    /// R[a] := R[a] + R[b], wrapping
    Add,
    /// Result := R[a] * R[b], wrapping; registers untouched
    Mul,
    /// FL := compare(R[a], R[b])
    Cmp,
}

impl AluOp {
    /// Map a raw opcode byte onto an ALU operation.
    pub fn from_opcode(byte: u8) -> Result<Self, AluError> {
        Opcode::from_byte(byte)
            .filter(|op| op.is_alu())
            .and_then(Self::from_instruction)
            .ok_or(AluError::UnsupportedOp(byte))
    }

    /// The ALU operation behind a decoded opcode, if it has one.
    pub fn from_instruction(opcode: Opcode) -> Option<Self> {
        match opcode {
            Opcode::Add => Some(AluOp::Add),
            Opcode::Mul => Some(AluOp::Mul),
            Opcode::Cmp => Some(AluOp::Cmp),
            _ => None,
        }
    }
}

/// How CMP treats the condition bits already in FL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagMode {
    /// Clear E, G and L before recording the new result.
    #[default]
    Reset,
    /// OR the new result into FL, leaving earlier bits set.
    Sticky,
}

/// Apply an ALU operation to registers `a` and `b`.
///
/// Returns the product for MUL and `None` otherwise.
pub fn apply(
    regs: &mut Registers,
    op: AluOp,
    a: u8,
    b: u8,
    mode: FlagMode,
) -> Result<Option<u8>, AluError> {
    let lhs = regs.get(a)?;
    let rhs = regs.get(b)?;

    match op {
        AluOp::Add => {
            regs.set(a, lhs.wrapping_add(rhs))?;
            Ok(None)
        }

        AluOp::Mul => Ok(Some(lhs.wrapping_mul(rhs))),

        AluOp::Cmp => {
            let result = match lhs.cmp(&rhs) {
                std::cmp::Ordering::Equal => Flags::EQUAL,
                std::cmp::Ordering::Greater => Flags::GREATER,
                std::cmp::Ordering::Less => Flags::LESS,
            };
            let base = match mode {
                FlagMode::Reset => regs.flags() & !Flags::CONDITION,
                FlagMode::Sticky => regs.flags(),
            };
            regs.set_flags(base | result);
            Ok(None)
        }
    }
}

/// Apply the ALU operation encoded by a raw opcode byte.
pub fn apply_opcode(
    regs: &mut Registers,
    byte: u8,
    a: u8,
    b: u8,
    mode: FlagMode,
) -> Result<Option<u8>, AluError> {
    apply(regs, AluOp::from_opcode(byte)?, a, b, mode)
}

/// Errors raised by the ALU.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AluError {
    #[error("unsupported ALU operation {0:#010b}")]
    UnsupportedOp(u8),

    #[error("{0}")]
    Register(#[from] RegisterError),
}
