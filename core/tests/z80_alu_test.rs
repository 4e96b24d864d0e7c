use quartz_core::cpu::z80::Flag;
mod common;
use common::{cpu_with, mem, run_instruction};

// --- ADD HL, rr ---

#[test]
fn test_add_hl_bc() {
    let mut cpu = cpu_with(&[0x09]); // ADD HL, BC
    cpu.regs.h = 0x10; cpu.regs.l = 0x00;
    cpu.regs.b = 0x20; cpu.regs.c = 0x00;
    cpu.regs.f = 0x00;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 11, "ADD HL,rr should be 11 T-states");
    assert_eq!(cpu.regs.get_hl(), 0x3000);
    assert_eq!(cpu.regs.f & Flag::C as u8, 0, "C should be clear");
    assert_eq!(cpu.regs.f & Flag::N as u8, 0, "N should be clear");
}

#[test]
fn test_add_hl_de_carry() {
    let mut cpu = cpu_with(&[0x19]); // ADD HL, DE
    cpu.regs.set_hl(0x8000);
    cpu.regs.set_de(0x8000);
    cpu.regs.f = 0x00;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.get_hl(), 0x0000);
    assert!(cpu.regs.flag(Flag::C), "C should be set");
}

#[test]
fn test_add_hl_half_carry() {
    let mut cpu = cpu_with(&[0x29]); // ADD HL, HL
    cpu.regs.set_hl(0x0800);
    cpu.regs.f = 0x00;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.get_hl(), 0x1000);
    assert!(cpu.regs.flag(Flag::H), "H set on carry out of bit 11");
}

#[test]
fn test_add_hl_preserves_szpv() {
    let mut cpu = cpu_with(&[0x39]); // ADD HL, SP
    cpu.regs.set_hl(0x0001);
    cpu.regs.sp = 0x0001;
    cpu.regs.f = Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.get_hl(), 0x0002);
    assert_eq!(cpu.regs.f & 0xC4, 0xC4, "S, Z and PV untouched");
}

#[test]
fn test_add_ix_bc() {
    let mut cpu = cpu_with(&[0xDD, 0x09]); // ADD IX, BC
    cpu.regs.ix = 0x1000;
    cpu.regs.set_bc(0x0234);

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 15, "ADD IX,rr should be 15 T-states");
    assert_eq!(cpu.regs.ix, 0x1234);
    assert_eq!(cpu.regs.get_hl(), 0x0000, "HL untouched");
}

// --- INC/DEC rr ---

#[test]
fn test_inc_bc() {
    let mut cpu = cpu_with(&[0x03]); // INC BC
    cpu.regs.set_bc(0x00FF);
    cpu.regs.f = 0xFF;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 6, "INC rr should be 6 T-states");
    assert_eq!(cpu.regs.get_bc(), 0x0100);
    assert_eq!(cpu.regs.f, 0xFF, "INC rr affects no flags");
}

#[test]
fn test_dec_de_wrap() {
    let mut cpu = cpu_with(&[0x1B]); // DEC DE
    cpu.regs.set_de(0x0000);

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.get_de(), 0xFFFF);
}

#[test]
fn test_inc_sp() {
    let mut cpu = cpu_with(&[0x33]); // INC SP
    cpu.regs.sp = 0xFFFF;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.sp, 0x0000);
}

// --- INC/DEC r ---

#[test]
fn test_inc_a_overflow() {
    let mut cpu = cpu_with(&[0x3C]); // INC A
    cpu.regs.a = 0x7F;
    cpu.regs.f = Flag::C as u8;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 4);
    assert_eq!(cpu.regs.a, 0x80);
    assert!(cpu.regs.flag(Flag::PV), "7F -> 80 overflows");
    assert!(cpu.regs.flag(Flag::H));
    assert!(cpu.regs.flag(Flag::S));
    assert!(cpu.regs.flag(Flag::C), "C preserved");
}

#[test]
fn test_dec_b_to_zero() {
    let mut cpu = cpu_with(&[0x05]); // DEC B
    cpu.regs.b = 0x01;
    cpu.regs.f = 0x00;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.b, 0x00);
    assert!(cpu.regs.flag(Flag::Z));
    assert!(cpu.regs.flag(Flag::N));
    assert!(!cpu.regs.flag(Flag::C), "C preserved (clear)");
}

#[test]
fn test_dec_underflow_half_borrow() {
    let mut cpu = cpu_with(&[0x0D]); // DEC C
    cpu.regs.c = 0x80;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.c, 0x7F);
    assert!(cpu.regs.flag(Flag::PV), "80 -> 7F overflows");
    assert!(cpu.regs.flag(Flag::H));
}

#[test]
fn test_inc_hl_indirect() {
    let mut cpu = cpu_with(&[0x34]); // INC (HL)
    cpu.regs.set_hl(0x4000);
    cpu.memory_mut().load(0x4000, &[0xFF]);

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 11, "INC (HL) should be 11 T-states");
    assert_eq!(mem(&cpu, 0x4000), 0x00);
    assert!(cpu.regs.flag(Flag::Z));
}

// --- 8-bit arithmetic ---

#[test]
fn test_add_a_n() {
    let mut cpu = cpu_with(&[0xC6, 0x01]); // ADD A, 1
    cpu.regs.a = 0xFF;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 7);
    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.flag(Flag::Z));
    assert!(cpu.regs.flag(Flag::C));
    assert!(cpu.regs.flag(Flag::H));
    assert!(!cpu.regs.flag(Flag::PV));
}

#[test]
fn test_adc_a_uses_carry() {
    let mut cpu = cpu_with(&[0x88]); // ADC A, B
    cpu.regs.a = 0x10;
    cpu.regs.b = 0x20;
    cpu.regs.f = Flag::C as u8;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.a, 0x31);
    assert!(!cpu.regs.flag(Flag::C));
}

#[test]
fn test_sub_overflow() {
    let mut cpu = cpu_with(&[0xD6, 0x01]); // SUB 1
    cpu.regs.a = 0x80;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.a, 0x7F);
    assert!(cpu.regs.flag(Flag::PV), "80 - 1 overflows");
    assert!(cpu.regs.flag(Flag::N));
    assert!(cpu.regs.flag(Flag::H));
    assert!(!cpu.regs.flag(Flag::C));
}

#[test]
fn test_sbc_a_borrow() {
    let mut cpu = cpu_with(&[0x9F]); // SBC A, A
    cpu.regs.a = 0x42;
    cpu.regs.f = Flag::C as u8;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.a, 0xFF);
    assert!(cpu.regs.flag(Flag::C));
    assert!(cpu.regs.flag(Flag::S));
}

#[test]
fn test_and_sets_h() {
    let mut cpu = cpu_with(&[0xE6, 0x0F]); // AND 0x0F
    cpu.regs.a = 0xF3;
    cpu.regs.f = Flag::C as u8 | Flag::N as u8;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.a, 0x03);
    assert!(cpu.regs.flag(Flag::H));
    assert!(cpu.regs.flag(Flag::PV), "0x03 has even parity");
    assert!(!cpu.regs.flag(Flag::C));
    assert!(!cpu.regs.flag(Flag::N));
}

#[test]
fn test_xor_a_clears() {
    let mut cpu = cpu_with(&[0xAF]); // XOR A
    cpu.regs.a = 0x5A;
    cpu.regs.f = 0xFF;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.a, 0);
    assert_eq!(cpu.regs.f, Flag::Z as u8 | Flag::PV as u8);
}

#[test]
fn test_or_hl_indirect() {
    let mut cpu = cpu_with(&[0xB6]); // OR (HL)
    cpu.regs.set_hl(0x2000);
    cpu.memory_mut().load(0x2000, &[0x80]);
    cpu.regs.a = 0x01;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 7);
    assert_eq!(cpu.regs.a, 0x81);
    assert!(cpu.regs.flag(Flag::S));
}

#[test]
fn test_cp_xy_from_operand() {
    let mut cpu = cpu_with(&[0xFE, 0x28]); // CP 0x28
    cpu.regs.a = 0x30;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.a, 0x30, "CP leaves A alone");
    assert!(cpu.regs.flag(Flag::N));
    assert!(!cpu.regs.flag(Flag::Z));
    assert_eq!(cpu.regs.f & (Flag::X as u8 | Flag::Y as u8), 0x28);
}

#[test]
fn test_cp_equal_sets_z() {
    let mut cpu = cpu_with(&[0xB8]); // CP B
    cpu.regs.a = 0x42;
    cpu.regs.b = 0x42;

    run_instruction(&mut cpu);
    assert!(cpu.regs.flag(Flag::Z));
    assert!(!cpu.regs.flag(Flag::C));
}

/// Every (A, operand) pair of ADD A,B against flags computed independently.
#[test]
fn test_add_flag_table_exhaustive() {
    let mut cpu = cpu_with(&[0x80]); // ADD A, B
    for a in 0..=255u8 {
        for b in 0..=255u8 {
            cpu.regs.pc = 0;
            cpu.regs.a = a;
            cpu.regs.b = b;
            cpu.regs.f = 0;
            run_instruction(&mut cpu);

            let sum = u16::from(a) + u16::from(b);
            let result = sum as u8;
            let mut expected = result & 0xA8; // S, Y, X
            if result == 0 { expected |= 0x40; }
            if (a & 0x0F) + (b & 0x0F) > 0x0F { expected |= 0x10; }
            let overflow = (a as i8).checked_add(b as i8).is_none();
            if overflow { expected |= 0x04; }
            if sum > 0xFF { expected |= 0x01; }

            assert_eq!(cpu.regs.a, result, "ADD {a:02X}+{b:02X}");
            assert_eq!(cpu.regs.f, expected, "flags for ADD {a:02X}+{b:02X}");
        }
    }
}

// --- 16-bit ADC/SBC ---

#[test]
fn test_adc_hl_overflow() {
    let mut cpu = cpu_with(&[0xED, 0x4A]); // ADC HL, BC
    cpu.regs.set_hl(0x7FFF);
    cpu.regs.set_bc(0x0000);
    cpu.regs.f = Flag::C as u8;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 15, "ADC HL,rr should be 15 T-states");
    assert_eq!(cpu.regs.get_hl(), 0x8000);
    assert!(cpu.regs.flag(Flag::PV));
    assert!(cpu.regs.flag(Flag::S));
    assert!(cpu.regs.flag(Flag::H));
}

#[test]
fn test_sbc_hl_to_zero() {
    let mut cpu = cpu_with(&[0xED, 0x52]); // SBC HL, DE
    cpu.regs.set_hl(0x1234);
    cpu.regs.set_de(0x1233);
    cpu.regs.f = Flag::C as u8;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.get_hl(), 0x0000);
    assert!(cpu.regs.flag(Flag::Z));
    assert!(cpu.regs.flag(Flag::N));
    assert!(!cpu.regs.flag(Flag::C));
}

// --- Accumulator rotates and misc ---

#[test]
fn test_rlca() {
    let mut cpu = cpu_with(&[0x07]); // RLCA
    cpu.regs.a = 0x81;
    cpu.regs.f = Flag::Z as u8;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.a, 0x03);
    assert!(cpu.regs.flag(Flag::C));
    assert!(cpu.regs.flag(Flag::Z), "Z preserved");
}

#[test]
fn test_rra_through_carry() {
    let mut cpu = cpu_with(&[0x1F]); // RRA
    cpu.regs.a = 0x02;
    cpu.regs.f = Flag::C as u8;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.a, 0x81);
    assert!(!cpu.regs.flag(Flag::C));
}

#[test]
fn test_daa_after_add() {
    // 0x15 + 0x27 = 0x3C, adjusted to BCD 42
    let mut cpu = cpu_with(&[0xC6, 0x27, 0x27]); // ADD A, 0x27 ; DAA
    cpu.regs.a = 0x15;

    run_instruction(&mut cpu);
    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.a, 0x42);
    assert!(!cpu.regs.flag(Flag::C));
}

#[test]
fn test_daa_after_sub() {
    // 0x42 - 0x15 = 0x2D, adjusted to BCD 27
    let mut cpu = cpu_with(&[0xD6, 0x15, 0x27]); // SUB 0x15 ; DAA
    cpu.regs.a = 0x42;

    run_instruction(&mut cpu);
    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.a, 0x27);
    assert!(cpu.regs.flag(Flag::N), "N survives DAA");
}

#[test]
fn test_cpl() {
    let mut cpu = cpu_with(&[0x2F]); // CPL
    cpu.regs.a = 0x5A;
    cpu.regs.f = 0x00;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.a, 0xA5);
    assert!(cpu.regs.flag(Flag::H));
    assert!(cpu.regs.flag(Flag::N));
}

#[test]
fn test_scf_ccf() {
    let mut cpu = cpu_with(&[0x37, 0x3F]); // SCF ; CCF
    cpu.regs.f = 0x00;

    run_instruction(&mut cpu);
    assert!(cpu.regs.flag(Flag::C));
    run_instruction(&mut cpu);
    assert!(!cpu.regs.flag(Flag::C));
    assert!(cpu.regs.flag(Flag::H), "CCF moves old C into H");
}

#[test]
fn test_neg() {
    let mut cpu = cpu_with(&[0xED, 0x44]); // NEG
    cpu.regs.a = 0x01;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 8);
    assert_eq!(cpu.regs.a, 0xFF);
    assert!(cpu.regs.flag(Flag::C));
    assert!(cpu.regs.flag(Flag::N));
}

#[test]
fn test_neg_0x80_overflows() {
    let mut cpu = cpu_with(&[0xED, 0x44]);
    cpu.regs.a = 0x80;

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.a, 0x80);
    assert!(cpu.regs.flag(Flag::PV));
}

#[test]
fn test_rld_rrd() {
    let mut cpu = cpu_with(&[0xED, 0x6F, 0xED, 0x67]); // RLD ; RRD
    cpu.regs.set_hl(0x5000);
    cpu.memory_mut().load(0x5000, &[0x34]);
    cpu.regs.a = 0x12;

    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 18, "RLD should be 18 T-states");
    assert_eq!(cpu.regs.a, 0x13);
    assert_eq!(mem(&cpu, 0x5000), 0x42);

    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.a, 0x12);
    assert_eq!(mem(&cpu, 0x5000), 0x34);
}
