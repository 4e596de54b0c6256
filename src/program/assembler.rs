//! Simple assembler for LS-8 programs.
//!
//! Syntax:
//! ```text
//! ; Comment (# works too)
//! LOOP:           ; Define a label
//!     LDI R0, 8   ; Register, immediate
//!     LDI R1, LOOP ; Labels are immediates
//!     PRN R0
//!     CMP R0, R1
//!     JNE R1
//!     HLT
//!
//!     ORG 0x40    ; Pad with zeros up to an address
//!     DB 42       ; Define a data byte
//! ```
//!
//! Numbers may be decimal, `0x` hex or `0b` binary.

use crate::cpu::decode::{Instruction, Opcode};
use crate::cpu::memory::MEMORY_SIZE;
use crate::program::disasm::format_instruction;
use crate::program::image::ProgramImage;
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to program bytes.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    assemble_image(source).map(|image| image.bytes)
}

/// Assemble source code to an image whose comments carry the mnemonics.
pub fn assemble_image(source: &str) -> Result<ProgramImage, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)?;
    Ok(asm.output)
}

/// Kind of operand an opcode expects in each slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    Register,
    Immediate,
}

fn operand_kinds(opcode: Opcode) -> &'static [Operand] {
    match (opcode, opcode.operand_count()) {
        (Opcode::Ldi, _) => &[Operand::Register, Operand::Immediate],
        (_, 0) => &[],
        (_, 1) => &[Operand::Register],
        _ => &[Operand::Register, Operand::Register],
    }
}

/// The assembler state.
struct Assembler {
    /// Symbol table (label -> address).
    symbols: HashMap<String, usize>,
    /// Pending references (output_index, label, source_line).
    pending: Vec<(usize, String, usize)>,
    /// Output image.
    output: ProgramImage,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: ProgramImage::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<(), AssemblerError> {
        // Pass 1: Collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: Resolve forward references
        self.resolve_references()
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find([';', '#']) {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();

        if line.is_empty() {
            return Ok(());
        }

        // Check for label definition
        if let Some((label, rest)) = line.split_once(':') {
            let label = label.trim().to_uppercase();
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label {:?}", label),
                });
            }
            if self.symbols.insert(label.clone(), self.output.len()).is_some() {
                return Err(AssemblerError::DuplicateLabel { line: line_num, label });
            }

            // Process rest of line if any
            let rest = rest.trim();
            if !rest.is_empty() {
                return self.process_instruction(rest, line_num);
            }
            return Ok(());
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((mnemonic, rest)) => (mnemonic.to_uppercase(), rest.trim()),
            None => (line.to_uppercase(), ""),
        };
        let operands: Vec<&str> = rest
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        match mnemonic.as_str() {
            // Directives
            "ORG" => {
                let [target] = operands.as_slice() else {
                    return Err(AssemblerError::OperandCount {
                        line: line_num,
                        mnemonic: mnemonic.clone(),
                        expected: 1,
                        found: operands.len(),
                    });
                };
                let value = self.parse_number(target, line_num)?;
                let addr = usize::try_from(value)
                    .ok()
                    .filter(|&addr| addr <= MEMORY_SIZE)
                    .ok_or(AssemblerError::ValueOutOfRange { line: line_num, value })?;
                if addr < self.output.len() {
                    return Err(AssemblerError::SyntaxError {
                        line: line_num,
                        message: format!("ORG {} is behind the current address {}", addr, self.output.len()),
                    });
                }
                while self.output.len() < addr {
                    self.output.push(0, "");
                }
            }

            "DB" | "DATA" => {
                if operands.is_empty() {
                    return Err(AssemblerError::OperandCount {
                        line: line_num,
                        mnemonic: mnemonic.clone(),
                        expected: 1,
                        found: 0,
                    });
                }
                for value in operands {
                    let byte = self.parse_immediate(value, line_num)?;
                    self.output.push(byte, "DB");
                }
            }

            // Instructions
            _ => {
                let opcode = Opcode::from_mnemonic(&mnemonic).ok_or_else(|| {
                    AssemblerError::UnknownMnemonic { line: line_num, mnemonic: mnemonic.clone() }
                })?;
                self.emit_instruction(opcode, &operands, line_num)?;
            }
        }

        Ok(())
    }

    fn emit_instruction(&mut self, opcode: Opcode, operands: &[&str], line_num: usize) -> Result<(), AssemblerError> {
        let kinds = operand_kinds(opcode);
        if operands.len() != kinds.len() {
            return Err(AssemblerError::OperandCount {
                line: line_num,
                mnemonic: opcode.mnemonic().to_string(),
                expected: kinds.len(),
                found: operands.len(),
            });
        }

        // Operand bytes land right after the opcode byte
        let base = self.output.len() + 1;
        let mut bytes = [0u8; 2];
        for (i, (text, kind)) in operands.iter().zip(kinds).enumerate() {
            bytes[i] = match kind {
                Operand::Register => parse_register(text).ok_or_else(|| AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("expected a register R0-R7, found {:?}", text),
                })?,
                Operand::Immediate => {
                    if is_label(text) {
                        self.pending.push((base + i, text.to_uppercase(), line_num));
                        0
                    } else {
                        self.parse_immediate(text, line_num)?
                    }
                }
            };
        }

        let instr = Instruction::new(opcode, bytes);
        self.output.push(opcode.byte(), &format_instruction(&instr));
        for byte in &instr.operands[..kinds.len()] {
            self.output.push(*byte, "");
        }
        Ok(())
    }

    fn parse_immediate(&self, text: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let value = self.parse_number(text, line_num)?;
        u8::try_from(value).map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })
    }

    fn parse_number(&self, text: &str, line_num: usize) -> Result<i64, AssemblerError> {
        let text = text.trim();
        let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16)
        } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
            i64::from_str_radix(bin, 2)
        } else {
            text.parse::<i64>()
        };

        parsed.map_err(|_| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid number {:?}", text),
        })
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (out_idx, label, line_num) in &self.pending {
            let addr = *self.symbols.get(label).ok_or_else(|| AssemblerError::UndefinedLabel {
                line: *line_num,
                label: label.clone(),
            })?;

            let byte = u8::try_from(addr).map_err(|_| AssemblerError::ValueOutOfRange {
                line: *line_num,
                value: addr as i64,
            })?;
            self.output.bytes[*out_idx] = byte;
            self.output.comments[*out_idx] = label.clone();
        }
        Ok(())
    }
}

/// Parse `R0`..`R7` (case-insensitive).
fn parse_register(text: &str) -> Option<u8> {
    let digits = text.strip_prefix(['R', 'r'])?;
    digits.parse::<u8>().ok().filter(|&r| r < 8)
}

/// Labels start with a letter or underscore; numbers never do.
fn is_label(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("{mnemonic} on line {line} takes {expected} operand(s), found {found}")]
    OperandCount { line: usize, mnemonic: String, expected: usize, found: usize },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },
}
