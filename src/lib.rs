//! # LS-8 Emulator
//!
//! An emulator for the LS-8, a small 8-bit computer with eight registers,
//! 256 bytes of memory and a downward-growing stack.
//!
//! The machine executes a byte stream loaded at address 0 until it reaches
//! `HLT` or faults. Every fault (unknown opcode, stack overflow, bad memory
//! access) stops the run for good.

pub mod config;
pub mod cpu;
pub mod error;
pub mod program;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use config::{MachineConfig, ConfigError};
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Instruction, Opcode, Output, LineOutput, Snapshot};
pub use error::Error;
pub use program::{assemble, disassemble, AssemblerError, ProgramImage, LoadError, load_image, save_image};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
