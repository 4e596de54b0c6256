//! LS-8 CPU registers.
//!
//! The LS-8 has eight byte-wide registers, R0 through R7. The top four
//! have fixed roles:
//! - R4 (FL): condition flags
//! - R5 (IM): interrupt mask
//! - R6 (IS): interrupt status
//! - R7 (SP): stack pointer
//!
//! IM and IS are reserved; nothing in the emulator delivers interrupts.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of registers in the register file.
pub const REGISTER_COUNT: usize = 8;

/// Flags register index.
pub const FL: u8 = 4;
/// Interrupt mask register index.
pub const IM: u8 = 5;
/// Interrupt status register index.
pub const IS: u8 = 6;
/// Stack pointer register index.
pub const SP: u8 = 7;

/// Bits of the flags register.
pub struct Flags;

impl Flags {
    /// Last comparison found the operands equal.
    pub const EQUAL: u8 = 0b0000_0001;
    /// Last comparison found the first operand greater.
    pub const GREATER: u8 = 0b0000_0010;
    /// Last comparison found the first operand less.
    pub const LESS: u8 = 0b0000_0100;
    /// Reserved: interrupts disabled while servicing one.
    pub const INTERRUPT: u8 = 0b0000_1000;

    /// Mask covering every comparison bit.
    pub const CONDITION: u8 = Self::EQUAL | Self::GREATER | Self::LESS;
}

/// The LS-8 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    slots: [u8; REGISTER_COUNT],
}

impl Registers {
    /// Create a register file with every slot zeroed and SP at `stack_top`.
    pub fn new(stack_top: u8) -> Self {
        let mut slots = [0; REGISTER_COUNT];
        slots[SP as usize] = stack_top;
        Self { slots }
    }

    /// Read a register.
    #[inline]
    pub fn get(&self, index: u8) -> Result<u8, RegisterError> {
        self.slots
            .get(index as usize)
            .copied()
            .ok_or(RegisterError::InvalidRegister(index))
    }

    /// Write a register.
    #[inline]
    pub fn set(&mut self, index: u8, value: u8) -> Result<(), RegisterError> {
        let slot = self.slots
            .get_mut(index as usize)
            .ok_or(RegisterError::InvalidRegister(index))?;
        *slot = value;
        Ok(())
    }

    /// All eight registers in index order.
    pub fn all(&self) -> [u8; REGISTER_COUNT] {
        self.slots
    }

    /// The flags register.
    pub fn flags(&self) -> u8 {
        self.slots[FL as usize]
    }

    /// Overwrite the flags register.
    pub fn set_flags(&mut self, value: u8) {
        self.slots[FL as usize] = value;
    }

    /// True if every bit of `mask` is set in FL.
    pub fn flag_set(&self, mask: u8) -> bool {
        self.flags() & mask == mask
    }

    /// The stack pointer.
    pub fn sp(&self) -> u8 {
        self.slots[SP as usize]
    }

    /// Overwrite the stack pointer.
    pub fn set_sp(&mut self, value: u8) {
        self.slots[SP as usize] = value;
    }
}

/// Errors raised by register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid register index {0} (valid: 0-7)")]
    InvalidRegister(u8),
}
