//! Program images, assembler and disassembler for the LS-8.
//!
//! This module provides:
//! - The `.ls8` image format (binary literal per line)
//! - A two-pass assembler (mnemonics → image)
//! - A disassembler (bytes → readable text)

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, assemble_image, AssemblerError};
pub use disasm::{disassemble, disassemble_at};
pub use image::{ProgramImage, LoadError, load_image, parse_image, read_source, save_image};
