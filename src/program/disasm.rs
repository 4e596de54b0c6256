//! Disassembler for LS-8 programs.
//!
//! Converts program bytes back to readable assembly.

use crate::cpu::decode::{decode, Instruction, Opcode};

/// Disassemble the instruction at `addr`.
///
/// Returns the text and the number of bytes consumed. Bytes that do not
/// decode (unknown opcodes, instructions cut off by the end of the
/// buffer) come back as a one-byte `DB`.
pub fn disassemble_at(bytes: &[u8], addr: usize) -> (String, usize) {
    match decode(bytes, addr) {
        Ok(instr) => (format_instruction(&instr), instr.size()),
        Err(_) => match bytes.get(addr) {
            Some(byte) => (format!("DB {:#04x}", byte), 1),
            None => (String::from("??"), 1),
        },
    }
}

/// Disassemble a whole buffer into an address-prefixed listing.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; LS-8 Disassembly\n");
    output.push_str("; ----------------\n\n");

    let mut addr = 0;
    while addr < bytes.len() {
        let (line, size) = disassemble_at(bytes, addr);
        let end = (addr + size).min(bytes.len());
        let raw: Vec<String> = bytes[addr..end].iter().map(|b| format!("{:02X}", b)).collect();
        output.push_str(&format!("{:02X}: {:<12} ; {}\n", addr, line, raw.join(" ")));
        addr += size;
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    let mnemonic = instr.opcode.mnemonic();
    match instr.opcode.operand_count() {
        0 => mnemonic.to_string(),
        1 => format!("{} R{}", mnemonic, instr.a()),
        // LDI takes an immediate as its second operand
        _ if instr.opcode == Opcode::Ldi => {
            format!("{} R{},{}", mnemonic, instr.a(), instr.b())
        }
        _ => format!("{} R{},R{}", mnemonic, instr.a(), instr.b()),
    }
}
