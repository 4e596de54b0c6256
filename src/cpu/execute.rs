//! CPU execution engine for the LS-8.
//!
//! Implements the fetch-decode-execute cycle and dispatches each opcode
//! to its handler.

use crate::config::{ConfigError, MachineConfig};
use crate::cpu::{Memory, Registers};
use crate::cpu::alu::AluError;
use crate::cpu::decode::{self, Instruction, Opcode, DecodeError};
use crate::cpu::handlers::{self, Flow};
use crate::cpu::memory::MemoryError;
use crate::cpu::output::Output;
use crate::cpu::registers::RegisterError;
use crate::cpu::trace::Snapshot;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HLT instruction).
    Halted,
    /// CPU encountered a fatal error.
    Error,
}

/// The LS-8 CPU: registers, memory and program counter of one machine.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Program counter.
    pub pc: usize,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    config: MachineConfig,
    stack_floor: usize,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a stock LS-8.
    pub fn new() -> Self {
        Self::build(MachineConfig::default())
    }

    /// Create a CPU from a custom configuration.
    pub fn with_config(config: MachineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: MachineConfig) -> Self {
        Self {
            regs: Registers::new(config.stack_top()),
            mem: Memory::with_capacity(config.memory_size),
            pc: 0,
            state: CpuState::Running,
            cycles: 0,
            stack_floor: config.stack_floor.unwrap_or(0),
            config,
            last_instr: None,
        }
    }

    /// Reset the CPU to its freshly constructed state. Memory is cleared,
    /// so the program has to be loaded again.
    pub fn reset(&mut self) {
        *self = Self::build(self.config.clone());
    }

    /// The configuration this machine was built with.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Lowest address the stack may occupy.
    pub fn stack_floor(&self) -> usize {
        self.stack_floor
    }

    /// Load a program image at address 0.
    ///
    /// Unless the configuration pins the stack floor, the stack may grow
    /// down to the byte after the image.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(0, program)?;
        self.stack_floor = self.config.stack_floor.unwrap_or(program.len());
        log::debug!(
            "Loaded {} byte program, stack {:#04x}..{:#04x}",
            program.len(),
            self.stack_floor,
            self.config.stack_top()
        );
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error. Any error
    /// is fatal: the CPU moves to [`CpuState::Error`] and refuses to step
    /// again.
    pub fn step(&mut self, out: &mut dyn Output) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        match self.cycle(out) {
            Ok(instr) => Ok(instr),
            Err(e) => {
                log::warn!("CPU fault at PC={:#04x}: {}", self.pc, e);
                self.state = CpuState::Error;
                Err(e)
            }
        }
    }

    fn cycle(&mut self, out: &mut dyn Output) -> Result<Instruction, CpuError> {
        // Fetch + decode
        let instr = decode::decode(self.mem.as_slice(), self.pc)?;
        log::trace!("{:#04x}: {:?}", self.pc, instr);

        // Execute
        match self.execute(&instr, out)? {
            Flow::Advance => self.pc += instr.size(),
            Flow::Jump(addr) => self.pc = addr as usize,
            Flow::Halt => {
                log::debug!("Halted at PC={:#04x} after {} cycles", self.pc, self.cycles + 1);
                self.state = CpuState::Halted;
            }
        }

        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(instr)
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self, out: &mut dyn Output) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, out: &mut dyn Output, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Dispatch a decoded instruction to its handler.
    fn execute(&mut self, instr: &Instruction, out: &mut dyn Output) -> Result<Flow, CpuError> {
        match instr.opcode {
            // ==================== Data Transfer ====================
            Opcode::Ldi => handlers::ldi(self, instr),
            Opcode::St => handlers::st(self, instr),
            Opcode::Prn => handlers::prn(self, instr, out),

            // ==================== ALU ====================
            Opcode::Add | Opcode::Mul | Opcode::Cmp => handlers::alu(self, instr, out),

            // ==================== Stack ====================
            Opcode::Push => handlers::push(self, instr),
            Opcode::Pop => handlers::pop(self, instr),
            Opcode::Call => handlers::call(self, instr),
            Opcode::Ret => handlers::ret(self),

            // ==================== Control Flow ====================
            Opcode::Jmp => handlers::jmp(self, instr),
            Opcode::Jeq => handlers::jeq(self, instr),
            Opcode::Jne => handlers::jne(self, instr),
            Opcode::Hlt => handlers::hlt(),
        }
    }

    /// Read-only view of the machine for tracing.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("pc", &self.pc)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("memory error: {0}")]
    MemoryError(#[from] MemoryError),

    #[error("register error: {0}")]
    RegisterError(#[from] RegisterError),

    #[error("decode error: {0}")]
    DecodeError(#[from] DecodeError),

    #[error("ALU error: {0}")]
    AluError(#[from] AluError),

    #[error("stack overflow: SP={sp:#04x} cannot grow below {floor:#04x}")]
    StackOverflow { sp: u8, floor: usize },

    #[error("stack underflow: SP={sp:#04x} is at the stack top {top:#04x}")]
    StackUnderflow { sp: u8, top: u8 },

    #[error("output error: {0}")]
    Output(String),
}

impl CpuError {
    /// True if the run stopped on a byte with no handler.
    pub fn is_unknown_opcode(&self) -> bool {
        matches!(self, CpuError::DecodeError(DecodeError::UnknownOpcode { .. }))
    }

    /// True for stack overflow and underflow.
    pub fn is_stack_fault(&self) -> bool {
        matches!(self, CpuError::StackOverflow { .. } | CpuError::StackUnderflow { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::alu::FlagMode;
    use crate::cpu::decode::encode;
    use crate::cpu::registers::Flags;

    fn make_program(instructions: &[Instruction]) -> Vec<u8> {
        instructions.iter().flat_map(encode).collect()
    }

    fn op(opcode: Opcode, a: u8, b: u8) -> Instruction {
        Instruction::new(opcode, [a, b])
    }

    fn run_program(program: &[Instruction]) -> (Cpu, Vec<u8>, Result<u64, CpuError>) {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(program)).unwrap();
        let mut out = Vec::new();
        let result = cpu.run(&mut out);
        (cpu, out, result)
    }

    #[test]
    fn test_cpu_halt() {
        let (cpu, out, result) = run_program(&[op(Opcode::Hlt, 0, 0)]);

        assert_eq!(result.unwrap(), 1);
        assert!(cpu.is_halted());
        assert!(out.is_empty());
        assert_eq!(cpu.pc, 0);
    }

    #[test]
    fn test_print8() {
        let program = [0b1000_0010, 0b0000_0000, 0b0000_1000, 0b0100_0111, 0b0000_0000, 0b0000_0001];
        let mut cpu = Cpu::new();
        cpu.load_program(&program).unwrap();
        let mut out = Vec::new();

        assert_eq!(cpu.run(&mut out).unwrap(), 3);
        assert_eq!(out, vec![8]);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_add() {
        let (cpu, out, result) = run_program(&[
            op(Opcode::Ldi, 0, 250),
            op(Opcode::Ldi, 1, 10),
            op(Opcode::Add, 0, 1),
            op(Opcode::Prn, 0, 0),
            op(Opcode::Hlt, 0, 0),
        ]);

        result.unwrap();
        assert_eq!(out, vec![4]);
        assert_eq!(cpu.regs.get(1).unwrap(), 10);
    }

    #[test]
    fn test_mul_prints_product() {
        let (cpu, out, result) = run_program(&[
            op(Opcode::Ldi, 0, 8),
            op(Opcode::Ldi, 1, 9),
            op(Opcode::Mul, 0, 1),
            op(Opcode::Hlt, 0, 0),
        ]);

        result.unwrap();
        assert_eq!(out, vec![72]);
        assert_eq!(cpu.regs.get(0).unwrap(), 8);
        assert_eq!(cpu.regs.get(1).unwrap(), 9);
    }

    #[test]
    fn test_cmp_jeq_taken() {
        // 0: LDI R0,5  3: LDI R1,5  6: LDI R2,17  9: CMP R0,R1
        // 12: JEQ R2  14: PRN R0  16: HLT  17: PRN R1  19: HLT
        let (cpu, out, result) = run_program(&[
            op(Opcode::Ldi, 0, 5),
            op(Opcode::Ldi, 1, 5),
            op(Opcode::Ldi, 2, 17),
            op(Opcode::Cmp, 0, 1),
            op(Opcode::Jeq, 2, 0),
            op(Opcode::Prn, 0, 0),
            op(Opcode::Hlt, 0, 0),
            op(Opcode::Prn, 1, 0),
            op(Opcode::Hlt, 0, 0),
        ]);

        result.unwrap();
        assert_eq!(out, vec![5]);
        assert_eq!(cpu.pc, 19);
    }

    #[test]
    fn test_cmp_jne_taken() {
        // Same layout, but R1 differs so JNE branches to the second PRN/HLT
        let (cpu, out, result) = run_program(&[
            op(Opcode::Ldi, 0, 5),
            op(Opcode::Ldi, 1, 6),
            op(Opcode::Ldi, 2, 17),
            op(Opcode::Cmp, 0, 1),
            op(Opcode::Jne, 2, 0),
            op(Opcode::Prn, 0, 0),
            op(Opcode::Hlt, 0, 0),
            op(Opcode::Prn, 1, 0),
            op(Opcode::Hlt, 0, 0),
        ]);

        result.unwrap();
        assert_eq!(out, vec![6]);
        assert_eq!(cpu.regs.flags(), Flags::LESS);
    }

    #[test]
    fn test_flags_reset_between_compares() {
        // An equal compare followed by an unequal one must not leave E set
        let program = [
            op(Opcode::Ldi, 0, 1),
            op(Opcode::Ldi, 1, 1),
            op(Opcode::Cmp, 0, 1),
            op(Opcode::Ldi, 1, 0),
            op(Opcode::Cmp, 0, 1),
            op(Opcode::Hlt, 0, 0),
        ];

        let (cpu, _, result) = run_program(&program);
        result.unwrap();
        assert_eq!(cpu.regs.flags(), Flags::GREATER);

        let config = MachineConfig { flag_mode: FlagMode::Sticky, ..Default::default() };
        let mut sticky = Cpu::with_config(config).unwrap();
        sticky.load_program(&make_program(&program)).unwrap();
        sticky.run(&mut Vec::new()).unwrap();
        assert_eq!(sticky.regs.flags(), Flags::EQUAL | Flags::GREATER);
    }

    #[test]
    fn test_push_pop() {
        let (cpu, out, result) = run_program(&[
            op(Opcode::Ldi, 0, 77),
            op(Opcode::Push, 0, 0),
            op(Opcode::Ldi, 0, 0),
            op(Opcode::Pop, 3, 0),
            op(Opcode::Prn, 3, 0),
            op(Opcode::Hlt, 0, 0),
        ]);

        result.unwrap();
        assert_eq!(out, vec![77]);
        assert_eq!(cpu.regs.sp(), cpu.config().stack_top());
    }

    #[test]
    fn test_call_ret() {
        // 0: LDI R1,8   3: CALL R1   5: PRN R0   7: HLT
        // 8: LDI R0,42  11: RET
        let (cpu, out, result) = run_program(&[
            op(Opcode::Ldi, 1, 8),
            op(Opcode::Call, 1, 0),
            op(Opcode::Prn, 0, 0),
            op(Opcode::Hlt, 0, 0),
            op(Opcode::Ldi, 0, 42),
            op(Opcode::Ret, 0, 0),
        ]);

        assert_eq!(result.unwrap(), 6);
        assert_eq!(out, vec![42]);
        assert_eq!(cpu.pc, 7);
        assert_eq!(cpu.regs.sp(), cpu.config().stack_top());
    }

    #[test]
    fn test_store_copies_register() {
        let (cpu, _, result) = run_program(&[
            op(Opcode::Ldi, 0, 19),
            op(Opcode::St, 0, 6),
            op(Opcode::Hlt, 0, 0),
        ]);

        result.unwrap();
        assert_eq!(cpu.regs.get(6).unwrap(), 19);
        assert_eq!(cpu.regs.get(0).unwrap(), 19);
    }

    #[test]
    fn test_unknown_opcode_is_fatal() {
        let mut program = make_program(&[op(Opcode::Ldi, 0, 1)]);
        program.push(0xFF);
        program.extend(make_program(&[op(Opcode::Prn, 0, 0), op(Opcode::Hlt, 0, 0)]));

        let mut cpu = Cpu::new();
        cpu.load_program(&program).unwrap();
        let mut out = Vec::new();

        let err = cpu.run(&mut out).unwrap_err();
        assert!(err.is_unknown_opcode());
        assert_eq!(
            err,
            CpuError::DecodeError(DecodeError::UnknownOpcode { opcode: 0xFF, addr: 3 })
        );
        assert_eq!(cpu.state, CpuState::Error);
        assert!(out.is_empty());

        // Nothing further executes
        assert_eq!(cpu.step(&mut out), Err(CpuError::NotRunning(CpuState::Error)));
    }

    #[test]
    fn test_stack_overflow() {
        // 0: LDI R1,3  3: PUSH R0  5: JMP R1
        let (cpu, _, result) = run_program(&[
            op(Opcode::Ldi, 1, 3),
            op(Opcode::Push, 0, 0),
            op(Opcode::Jmp, 1, 0),
        ]);

        let err = result.unwrap_err();
        assert!(err.is_stack_fault());
        assert_eq!(err, CpuError::StackOverflow { sp: 7, floor: 7 });
        assert_eq!(cpu.state, CpuState::Error);
    }

    #[test]
    fn test_stack_underflow() {
        let (_, _, result) = run_program(&[op(Opcode::Pop, 0, 0), op(Opcode::Hlt, 0, 0)]);
        assert!(matches!(result, Err(CpuError::StackUnderflow { .. })));

        let (_, _, result) = run_program(&[op(Opcode::Ret, 0, 0)]);
        assert!(matches!(result, Err(CpuError::StackUnderflow { .. })));
    }

    #[test]
    fn test_configured_stack_floor() {
        let config = MachineConfig { stack_floor: Some(240), ..Default::default() };
        let mut cpu = Cpu::with_config(config).unwrap();
        cpu.load_program(&make_program(&[
            op(Opcode::Ldi, 1, 3),
            op(Opcode::Push, 0, 0),
            op(Opcode::Jmp, 1, 0),
        ]))
        .unwrap();

        let err = cpu.run(&mut Vec::new()).unwrap_err();
        // 0xF3 down to 0xF0 holds three values
        assert_eq!(err, CpuError::StackOverflow { sp: 240, floor: 240 });
    }

    #[test]
    fn test_invalid_register() {
        let (_, _, result) = run_program(&[op(Opcode::Ldi, 9, 1)]);
        assert_eq!(
            result.unwrap_err(),
            CpuError::RegisterError(RegisterError::InvalidRegister(9))
        );
    }

    #[test]
    fn test_running_off_the_end() {
        let config = MachineConfig { memory_size: 4, vector_table_size: 0, ..Default::default() };
        let mut cpu = Cpu::with_config(config).unwrap();
        cpu.load_program(&make_program(&[op(Opcode::Ldi, 0, 1)])).unwrap();
        cpu.mem.write(3, Opcode::Prn.byte()).unwrap();

        let err = cpu.run(&mut Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            CpuError::DecodeError(DecodeError::Memory(MemoryError::OutOfBounds { addr: 4, .. }))
        ));
    }

    #[test]
    fn test_run_limited() {
        // 0: LDI R0,3  3: JMP R0 (spins forever)
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[op(Opcode::Ldi, 0, 3), op(Opcode::Jmp, 0, 0)]))
            .unwrap();

        let executed = cpu.run_limited(&mut Vec::new(), 10).unwrap();

        assert_eq!(executed, 10);
        assert!(cpu.is_running());
        assert_eq!(cpu.last_instruction().map(|i| i.opcode), Some(Opcode::Jmp));
    }

    #[test]
    fn test_run_has_no_cycle_cap() {
        // 64 passes of a 256-step inner loop, then print the pass count
        let source = "
                LDI R1, 1
                LDI R2, 0
                LDI R5, 0
                LDI R6, 64
            OUTER:
                LDI R0, 0
            INNER:
                ADD R0, R1
                LDI R3, INNER
                CMP R0, R2
                JNE R3
                ADD R5, R1
                LDI R3, OUTER
                CMP R5, R6
                JNE R3
                PRN R5
                HLT
        ";
        let mut cpu = Cpu::new();
        cpu.load_program(&crate::program::assemble(source).unwrap()).unwrap();
        let mut out = Vec::new();

        let executed = cpu.run(&mut out).unwrap();

        assert!(executed > 10_000);
        assert!(cpu.is_halted());
        assert_eq!(out, vec![64]);
    }

    #[test]
    fn test_reset() {
        let (mut cpu, _, result) = run_program(&[op(Opcode::Ldi, 2, 9), op(Opcode::Hlt, 0, 0)]);
        result.unwrap();

        cpu.reset();

        assert!(cpu.is_running());
        assert_eq!(cpu.cycles, 0);
        assert_eq!(cpu.pc, 0);
        assert_eq!(cpu.regs.get(2).unwrap(), 0);
        assert_eq!(cpu.mem.read(0).unwrap(), 0);
    }
}
