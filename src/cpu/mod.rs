//! CPU emulation for the LS-8.
//!
//! This module implements the complete LS-8 machine:
//! - up to 256 byte-wide memory cells
//! - 8 registers, R4-R7 reserved for FL, IM, IS and SP
//! - a 14-instruction set with 0, 1 or 2 operand bytes

pub mod memory;
pub mod registers;
pub mod decode;
pub mod alu;
pub mod handlers;
pub mod output;
pub mod trace;
pub mod execute;

pub use memory::{Memory, MemoryError};
pub use registers::{Flags, Registers, RegisterError};
pub use decode::{Instruction, Opcode, DecodeError};
pub use alu::{AluOp, AluError, FlagMode};
pub use output::{Output, LineOutput};
pub use trace::Snapshot;
pub use execute::{Cpu, CpuError, CpuState};
