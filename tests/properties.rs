//! Property-based tests for machine invariants.
//!
//! Each property builds a tiny program, runs it on a stock LS-8 and checks
//! the observable result: emitted values, registers, SP and PC.

use ls8::cpu::{CpuError, CpuState, DecodeError};
use ls8::program::{assemble, parse_image};
use ls8::{Cpu, Opcode};
use proptest::prelude::*;

const LDI: u8 = 0b1000_0010;
const PRN: u8 = 0b0100_0111;
const ADD: u8 = 0b1010_0000;
const MUL: u8 = 0b1010_0010;
const CMP: u8 = 0b1010_0111;
const PUSH: u8 = 0b0100_0101;
const POP: u8 = 0b0100_0110;
const CALL: u8 = 0b0101_0000;
const RET: u8 = 0b0001_0001;
const JEQ: u8 = 0b0101_0101;
const JNE: u8 = 0b0101_0110;
const HLT: u8 = 0b0000_0001;

/// Initial SP of the stock machine.
const STACK_TOP: u8 = 0xF3;

/// Load `program` on a stock machine and run it to completion.
fn run(program: &[u8]) -> (Cpu, Vec<u8>, Result<u64, CpuError>) {
    let mut cpu = Cpu::new();
    cpu.load_program(program).unwrap();
    let mut out = Vec::new();
    let result = cpu.run_limited(&mut out, 1_000);
    (cpu, out, result)
}

/// Bytes that are not LS-8 opcodes.
fn unknown_opcodes() -> Vec<u8> {
    (0u8..=255)
        .filter(|b| Opcode::from_byte(*b).is_none())
        .collect()
}

// ========== Data Transfer ==========

proptest! {
    /// Property: LDI r,v then PRN r emits exactly v
    #[test]
    fn prop_ldi_then_prn_emits_value(reg in 0u8..8, value in 0u8..=255u8) {
        let (cpu, out, result) = run(&[LDI, reg, value, PRN, reg, HLT]);

        prop_assert!(result.is_ok());
        prop_assert_eq!(cpu.state, CpuState::Halted);
        prop_assert_eq!(out, vec![value]);
    }

    /// Property: PUSH r then POP r' copies the value and restores SP
    #[test]
    fn prop_push_pop_round_trip(
        src in 0u8..4,
        dst in 0u8..4,
        value in 0u8..=255u8,
    ) {
        let (cpu, _, result) = run(&[LDI, src, value, PUSH, src, POP, dst, HLT]);

        prop_assert!(result.is_ok());
        prop_assert_eq!(cpu.regs.get(dst).unwrap(), value);
        prop_assert_eq!(cpu.regs.sp(), STACK_TOP);
    }
}

// ========== ALU ==========

proptest! {
    /// Property: MUL emits (a * b) mod 256 and leaves both registers alone
    #[test]
    fn prop_mul_wraps_without_mutation(a in 0u8..=255u8, b in 0u8..=255u8) {
        let (cpu, out, result) = run(&[LDI, 0, a, LDI, 1, b, MUL, 0, 1, HLT]);

        prop_assert!(result.is_ok());
        prop_assert_eq!(out, vec![((a as u16 * b as u16) % 256) as u8]);
        prop_assert_eq!(cpu.regs.get(0).unwrap(), a);
        prop_assert_eq!(cpu.regs.get(1).unwrap(), b);
    }

    /// Property: ADD stores the wrapping sum in the first register
    #[test]
    fn prop_add_wraps(a in 0u8..=255u8, b in 0u8..=255u8) {
        let (cpu, _, result) = run(&[LDI, 0, a, LDI, 1, b, ADD, 0, 1, HLT]);

        prop_assert!(result.is_ok());
        prop_assert_eq!(cpu.regs.get(0).unwrap(), a.wrapping_add(b));
        prop_assert_eq!(cpu.regs.get(1).unwrap(), b);
    }

    /// Property: exactly one of E, G, L is set after CMP
    #[test]
    fn prop_cmp_sets_one_condition(a in 0u8..=255u8, b in 0u8..=255u8) {
        let (cpu, _, _) = run(&[LDI, 0, a, LDI, 1, b, CMP, 0, 1, HLT]);

        let expected = match a.cmp(&b) {
            std::cmp::Ordering::Equal => 0b001,
            std::cmp::Ordering::Greater => 0b010,
            std::cmp::Ordering::Less => 0b100,
        };
        prop_assert_eq!(cpu.regs.flags() & 0b111, expected);
    }
}

// ========== Control Flow ==========

/// `CMP R0,R1` then a conditional jump over an `HLT` to `PRN R1`.
///
/// ```text
/// 00 LDI R0,a   03 LDI R1,b   06 LDI R2,15
/// 09 CMP R0,R1  0C Jxx R2     0E HLT
/// 0F PRN R1     11 HLT
/// ```
fn branch_program(jump: u8, a: u8, b: u8) -> Vec<u8> {
    vec![
        LDI, 0, a, LDI, 1, b, LDI, 2, 15,
        CMP, 0, 1,
        jump, 2,
        HLT,
        PRN, 1,
        HLT,
    ]
}

proptest! {
    /// Property: JEQ branches exactly when the operands compared equal
    #[test]
    fn prop_jeq_follows_cmp(a in 0u8..=255u8, b in 0u8..=255u8) {
        let (_, out, result) = run(&branch_program(JEQ, a, b));

        prop_assert!(result.is_ok());
        let expected = if a == b { vec![b] } else { vec![] };
        prop_assert_eq!(out, expected);
    }

    /// Property: JNE branches exactly when the operands compared unequal
    #[test]
    fn prop_jne_follows_cmp(a in 0u8..=255u8, b in 0u8..=255u8) {
        let (_, out, result) = run(&branch_program(JNE, a, b));

        prop_assert!(result.is_ok());
        let expected = if a != b { vec![b] } else { vec![] };
        prop_assert_eq!(out, expected);
    }

    /// Property: an unequal CMP clears the E bit left by an earlier one
    #[test]
    fn prop_cmp_resets_stale_flags(a in 0u8..255u8) {
        // 00 LDI R0,a   03 LDI R1,a+1  06 CMP R0,R0  09 CMP R0,R1
        // 0C LDI R2,18  0F JEQ R2      11 HLT        12 PRN R0  14 HLT
        let program = [
            LDI, 0, a, LDI, 1, a + 1,
            CMP, 0, 0, CMP, 0, 1,
            LDI, 2, 18, JEQ, 2,
            HLT,
            PRN, 0,
            HLT,
        ];
        let (_, out, result) = run(&program);

        prop_assert!(result.is_ok());
        prop_assert!(out.is_empty());
    }

    /// Property: CALL then RET resumes right after the CALL
    #[test]
    fn prop_call_ret_resumes(value in 0u8..=255u8) {
        // 00 LDI R1,9  03 CALL R1  05 PRN R0  07 HLT  08 (pad)
        // 09 LDI R0,value  0C RET
        let program = [LDI, 1, 9, CALL, 1, PRN, 0, HLT, 0, LDI, 0, value, RET];
        let (cpu, out, result) = run(&program);

        prop_assert!(result.is_ok());
        prop_assert_eq!(out, vec![value]);
        prop_assert_eq!(cpu.pc, 7);
        prop_assert_eq!(cpu.regs.sp(), STACK_TOP);
    }
}

// ========== Faults ==========

proptest! {
    /// Property: an unknown opcode stops the machine and nothing after it runs
    #[test]
    fn prop_unknown_opcode_is_fatal(
        opcode in prop::sample::select(unknown_opcodes()),
        value in 0u8..=255u8,
    ) {
        let (cpu, out, result) = run(&[LDI, 0, value, opcode, PRN, 0, HLT]);

        let is_unknown = matches!(
            result,
            Err(CpuError::DecodeError(DecodeError::UnknownOpcode { addr: 3, .. }))
        );
        prop_assert!(is_unknown);
        prop_assert_eq!(cpu.state, CpuState::Error);
        prop_assert_eq!(cpu.pc, 3);
        prop_assert!(out.is_empty());
    }

    /// Property: POP on an empty stack underflows from any register
    #[test]
    fn prop_pop_empty_underflows(reg in 0u8..4) {
        let (cpu, _, result) = run(&[POP, reg, HLT]);

        let is_underflow = matches!(result, Err(CpuError::StackUnderflow { .. }));
        prop_assert!(is_underflow);
        prop_assert_eq!(cpu.regs.sp(), STACK_TOP);
    }
}

#[test]
fn repeated_push_overflows() {
    // 00 PUSH R0  02 LDI R1,0  05 JMP R1
    let program = [PUSH, 0, LDI, 1, 0, 0b0101_0100, 1];
    let (cpu, _, result) = run(&program);

    assert_eq!(
        result,
        Err(CpuError::StackOverflow { sp: 7, floor: 7 })
    );
    assert_eq!(cpu.state, CpuState::Error);
}

#[test]
fn print8_image_emits_8() {
    let text = "\
10000010 # LDI R0,8
00000000
00001000
01000111 # PRN R0
00000000
00000001 # HLT
";
    let image = parse_image(text).unwrap();
    let (cpu, out, result) = run(&image.bytes);

    assert_eq!(result, Ok(3));
    assert!(cpu.is_halted());
    assert_eq!(out, vec![8]);
}

#[test]
fn assembled_print8_matches_image() {
    let bytes = assemble("LDI R0, 8\nPRN R0\nHLT\n").unwrap();
    let image = parse_image("10000010\n00000000\n00001000\n01000111\n00000000\n00000001\n").unwrap();

    assert_eq!(bytes, image.bytes);
}

#[test]
fn load_image_from_disk() {
    let dir = std::env::temp_dir().join(format!("ls8-props-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let path = dir.join("mult.ls8");
    let program = assemble("LDI R0, 8\nLDI R1, 9\nMUL R0, R1\nHLT\n").unwrap();
    ls8::save_image(&path, &ls8::ProgramImage::from_bytes(program.clone())).unwrap();

    let image = ls8::load_image(&path).unwrap();
    assert_eq!(image.bytes, program);

    let (_, out, _) = run(&image.bytes);
    assert_eq!(out, vec![72]);

    std::fs::remove_dir_all(&dir).unwrap();
}
