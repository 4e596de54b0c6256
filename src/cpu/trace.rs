//! Read-only machine snapshots for tracing and state dumps.

use crate::cpu::execute::{Cpu, CpuState};
use crate::cpu::registers::REGISTER_COUNT;
use serde::{Serialize, Deserialize};

/// The state of a machine at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub pc: usize,
    /// Bytes at PC, PC+1 and PC+2. Cells past the end of memory read as 0.
    pub fetch: [u8; 3],
    pub registers: [u8; REGISTER_COUNT],
    pub state: CpuState,
    pub cycles: u64,
}

impl Snapshot {
    /// Capture the current state of `cpu`.
    pub fn capture(cpu: &Cpu) -> Self {
        let mut fetch = [0u8; 3];
        for (i, byte) in fetch.iter_mut().enumerate() {
            *byte = cpu.mem.get(cpu.pc + i).unwrap_or(0);
        }

        Self {
            pc: cpu.pc,
            fetch,
            registers: cpu.regs.all(),
            state: cpu.state,
            cycles: cpu.cycles,
        }
    }
}

impl std::fmt::Display for Snapshot {
    /// `TRACE: PC | B0 B1 B2 | R0 R1 R2 R3 R4 R5 R6 R7`, all hex.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
            self.pc, self.fetch[0], self.fetch[1], self.fetch[2]
        )?;
        for reg in self.registers {
            write!(f, " {:02X}", reg)?;
        }
        Ok(())
    }
}
