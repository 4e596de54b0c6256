//! Per-opcode instruction handlers.
//!
//! Each handler reads its operands from the decoded [`Instruction`],
//! mutates the machine, and tells the dispatch loop what to do with the
//! PC through the returned [`Flow`]. Handlers never touch `cpu.pc`
//! themselves.

use crate::cpu::alu;
use crate::cpu::decode::Instruction;
use crate::cpu::execute::{Cpu, CpuError};
use crate::cpu::memory::MemoryError;
use crate::cpu::output::Output;
use crate::cpu::registers::Flags;

/// What the dispatch loop does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Move past the instruction.
    Advance,
    /// Continue at an explicit address.
    Jump(u8),
    /// Stop the machine.
    Halt,
}

// ==================== Data Transfer ====================

/// LDI: R[a] := b
pub fn ldi(cpu: &mut Cpu, instr: &Instruction) -> Result<Flow, CpuError> {
    cpu.regs.set(instr.a(), instr.b())?;
    Ok(Flow::Advance)
}

/// ST: R[b] := R[a]
pub fn st(cpu: &mut Cpu, instr: &Instruction) -> Result<Flow, CpuError> {
    let value = cpu.regs.get(instr.a())?;
    cpu.regs.set(instr.b(), value)?;
    Ok(Flow::Advance)
}

/// PRN: emit R[a]
pub fn prn(cpu: &mut Cpu, instr: &Instruction, out: &mut dyn Output) -> Result<Flow, CpuError> {
    let value = cpu.regs.get(instr.a())?;
    emit(out, value)?;
    Ok(Flow::Advance)
}

// ==================== ALU ====================

/// ADD, MUL, CMP. A MUL product goes to the output sink.
pub fn alu(cpu: &mut Cpu, instr: &Instruction, out: &mut dyn Output) -> Result<Flow, CpuError> {
    let mode = cpu.config().flag_mode;
    let byte = instr.opcode.byte();
    if let Some(result) = alu::apply_opcode(&mut cpu.regs, byte, instr.a(), instr.b(), mode)? {
        emit(out, result)?;
    }
    Ok(Flow::Advance)
}

// ==================== Stack ====================

/// PUSH: SP -= 1; [SP] := R[a]
pub fn push(cpu: &mut Cpu, instr: &Instruction) -> Result<Flow, CpuError> {
    let value = cpu.regs.get(instr.a())?;
    push_value(cpu, value)?;
    Ok(Flow::Advance)
}

/// POP: R[a] := [SP]; SP += 1
pub fn pop(cpu: &mut Cpu, instr: &Instruction) -> Result<Flow, CpuError> {
    // Validate the destination before the stack moves
    cpu.regs.get(instr.a())?;
    let value = pop_value(cpu)?;
    cpu.regs.set(instr.a(), value)?;
    Ok(Flow::Advance)
}

/// CALL: push the address of the next instruction, then jump to R[a].
pub fn call(cpu: &mut Cpu, instr: &Instruction) -> Result<Flow, CpuError> {
    let next = cpu.pc + instr.size();
    let ret = u8::try_from(next).map_err(|_| MemoryError::OutOfBounds {
        addr: next,
        capacity: cpu.mem.len(),
    })?;

    push_value(cpu, ret)?;
    Ok(Flow::Jump(cpu.regs.get(instr.a())?))
}

/// RET: pop the return address into the PC.
pub fn ret(cpu: &mut Cpu) -> Result<Flow, CpuError> {
    Ok(Flow::Jump(pop_value(cpu)?))
}

// ==================== Control Flow ====================

/// JMP: PC := R[a]
pub fn jmp(cpu: &mut Cpu, instr: &Instruction) -> Result<Flow, CpuError> {
    Ok(Flow::Jump(cpu.regs.get(instr.a())?))
}

/// JEQ: PC := R[a] if the E flag is set
pub fn jeq(cpu: &mut Cpu, instr: &Instruction) -> Result<Flow, CpuError> {
    jump_if(cpu, instr, cpu.regs.flag_set(Flags::EQUAL))
}

/// JNE: PC := R[a] if the E flag is clear
pub fn jne(cpu: &mut Cpu, instr: &Instruction) -> Result<Flow, CpuError> {
    jump_if(cpu, instr, !cpu.regs.flag_set(Flags::EQUAL))
}

/// HLT
pub fn hlt() -> Result<Flow, CpuError> {
    Ok(Flow::Halt)
}

fn jump_if(cpu: &Cpu, instr: &Instruction, taken: bool) -> Result<Flow, CpuError> {
    if taken {
        Ok(Flow::Jump(cpu.regs.get(instr.a())?))
    } else {
        Ok(Flow::Advance)
    }
}

/// Decrement SP and store `value` at the new top.
///
/// Fails once SP would drop below the stack floor.
fn push_value(cpu: &mut Cpu, value: u8) -> Result<(), CpuError> {
    let sp = cpu.regs.sp();
    let floor = cpu.stack_floor();

    if sp == 0 || ((sp - 1) as usize) < floor {
        return Err(CpuError::StackOverflow { sp, floor });
    }

    let new_sp = sp - 1;
    cpu.mem.write(new_sp as usize, value)?;
    cpu.regs.set_sp(new_sp);
    Ok(())
}

/// Read the top of the stack and increment SP.
///
/// Fails when the stack is empty, i.e. SP is at or above the stack top.
fn pop_value(cpu: &mut Cpu) -> Result<u8, CpuError> {
    let sp = cpu.regs.sp();
    let top = cpu.config().stack_top();

    if sp >= top {
        return Err(CpuError::StackUnderflow { sp, top });
    }

    let value = cpu.mem.read(sp as usize)?;
    cpu.regs.set_sp(sp + 1);
    Ok(value)
}

fn emit(out: &mut dyn Output, value: u8) -> Result<(), CpuError> {
    out.emit(value).map_err(|e| CpuError::Output(e.to_string()))
}
