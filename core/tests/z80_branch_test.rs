use quartz_core::cpu::z80::Flag;
mod common;
use common::{cpu_with, mem, run_instruction};

// ============================================================
// JP
// ============================================================

#[test]
fn test_jp_nn() {
    let mut cpu = cpu_with(&[0xC3, 0x34, 0x12]); // JP 0x1234

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 10, "JP nn should be 10 T-states");
    assert_eq!(cpu.regs.pc, 0x1234);
}

#[test]
fn test_jp_cc_not_taken_same_cost() {
    let mut cpu = cpu_with(&[0xCA, 0x34, 0x12]); // JP Z, 0x1234
    cpu.regs.f = 0x00;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 10);
    assert_eq!(cpu.regs.pc, 0x0003);
}

#[test]
fn test_jp_pe_and_m() {
    let mut cpu = cpu_with(&[0xEA, 0x00, 0x10]); // JP PE, 0x1000
    cpu.regs.f = Flag::PV as u8;
    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.pc, 0x1000);

    cpu.memory_mut().load(0x1000, &[0xFA, 0x00, 0x20]); // JP M, 0x2000
    cpu.regs.f = 0x00;
    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.pc, 0x1003, "S clear: JP M falls through");
}

#[test]
fn test_jp_hl() {
    let mut cpu = cpu_with(&[0xE9]); // JP (HL)
    cpu.regs.set_hl(0x4321);

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 4);
    assert_eq!(cpu.regs.pc, 0x4321);
}

#[test]
fn test_jp_ix() {
    let mut cpu = cpu_with(&[0xDD, 0xE9]); // JP (IX)
    cpu.regs.ix = 0x8000;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 8);
    assert_eq!(cpu.regs.pc, 0x8000);
}

// ============================================================
// JR / DJNZ
// ============================================================

#[test]
fn test_jr_backwards() {
    let mut cpu = cpu_with(&[0x00, 0x00, 0x18, 0xFC]); // NOP ; NOP ; JR -4
    cpu.regs.pc = 2;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 12, "JR e should be 12 T-states");
    assert_eq!(cpu.regs.pc, 0x0000);
}

#[test]
fn test_jr_nz_taken_and_not_taken() {
    let mut cpu = cpu_with(&[0x20, 0x10]); // JR NZ, +16
    cpu.regs.f = 0x00;
    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 12, "taken JR cc should be 12 T-states");
    assert_eq!(cpu.regs.pc, 0x0012);

    let mut cpu = cpu_with(&[0x20, 0x10]);
    cpu.regs.f = Flag::Z as u8;
    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 7, "not-taken JR cc should be 7 T-states");
    assert_eq!(cpu.regs.pc, 0x0002);
}

#[test]
fn test_jr_c_wraps_address_space() {
    let mut cpu = cpu_with(&[0x38, 0x80]); // JR C, -128
    cpu.regs.f = Flag::C as u8;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.pc, 0xFF82);
}

#[test]
fn test_djnz_loop() {
    let mut cpu = cpu_with(&[0x10, 0xFE]); // DJNZ $
    cpu.regs.b = 0x03;

    assert_eq!(run_instruction(&mut cpu), 13, "DJNZ taken should be 13 T-states");
    assert_eq!(cpu.regs.pc, 0x0000);
    assert_eq!(run_instruction(&mut cpu), 13);
    assert_eq!(run_instruction(&mut cpu), 8, "DJNZ not taken should be 8 T-states");
    assert_eq!(cpu.regs.b, 0x00);
    assert_eq!(cpu.regs.pc, 0x0002);
}

#[test]
fn test_djnz_from_zero_wraps() {
    let mut cpu = cpu_with(&[0x10, 0x00]); // DJNZ +0
    cpu.regs.b = 0x00;
    cpu.regs.f = 0xFF;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.b, 0xFF);
    assert_eq!(cpu.regs.f, 0xFF, "DJNZ affects no flags");
}

// ============================================================
// CALL / RET / RST
// ============================================================

#[test]
fn test_call_and_ret() {
    let mut cpu = cpu_with(&[0xCD, 0x00, 0x10]); // CALL 0x1000
    cpu.memory_mut().load(0x1000, &[0xC9]); // RET
    cpu.regs.sp = 0x8000;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 17, "CALL nn should be 17 T-states");
    assert_eq!(cpu.regs.pc, 0x1000);
    assert_eq!(cpu.regs.sp, 0x7FFE);
    assert_eq!(mem(&cpu, 0x7FFF), 0x00, "return address high byte");
    assert_eq!(mem(&cpu, 0x7FFE), 0x03, "return address low byte");

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 10, "RET should be 10 T-states");
    assert_eq!(cpu.regs.pc, 0x0003);
    assert_eq!(cpu.regs.sp, 0x8000);
}

#[test]
fn test_call_cc_timing() {
    let mut cpu = cpu_with(&[0xDC, 0x00, 0x10]); // CALL C, 0x1000
    cpu.regs.sp = 0x8000;
    cpu.regs.f = 0x00;
    assert_eq!(run_instruction(&mut cpu), 10, "not-taken CALL cc should be 10 T-states");
    assert_eq!(cpu.regs.sp, 0x8000);

    let mut cpu = cpu_with(&[0xDC, 0x00, 0x10]);
    cpu.regs.sp = 0x8000;
    cpu.regs.f = Flag::C as u8;
    assert_eq!(run_instruction(&mut cpu), 17, "taken CALL cc should be 17 T-states");
    assert_eq!(cpu.regs.pc, 0x1000);
}

#[test]
fn test_ret_cc_timing() {
    let mut cpu = cpu_with(&[0xC0]); // RET NZ
    cpu.regs.sp = 0x8000;
    cpu.memory_mut().load(0x8000, &[0x34, 0x12]);
    cpu.regs.f = Flag::Z as u8;
    assert_eq!(run_instruction(&mut cpu), 5, "not-taken RET cc should be 5 T-states");
    assert_eq!(cpu.regs.pc, 0x0001);

    let mut cpu = cpu_with(&[0xC0]);
    cpu.regs.sp = 0x8000;
    cpu.memory_mut().load(0x8000, &[0x34, 0x12]);
    cpu.regs.f = 0x00;
    assert_eq!(run_instruction(&mut cpu), 11, "taken RET cc should be 11 T-states");
    assert_eq!(cpu.regs.pc, 0x1234);
    assert_eq!(cpu.regs.sp, 0x8002);
}

#[test]
fn test_rst_28() {
    let mut cpu = cpu_with(&[0x00, 0xEF]); // NOP ; RST 28h
    cpu.regs.pc = 1;
    cpu.regs.sp = 0x8000;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 11, "RST should be 11 T-states");
    assert_eq!(cpu.regs.pc, 0x0028);
    assert_eq!(mem(&cpu, 0x7FFE), 0x02);
}

#[test]
fn test_retn_restores_iff1() {
    let mut cpu = cpu_with(&[0xED, 0x45]); // RETN
    cpu.regs.sp = 0x8000;
    cpu.memory_mut().load(0x8000, &[0x00, 0x20]);
    cpu.regs.iff1 = false;
    cpu.regs.iff2 = true;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 14, "RETN should be 14 T-states");
    assert_eq!(cpu.regs.pc, 0x2000);
    assert!(cpu.regs.iff1);
}
