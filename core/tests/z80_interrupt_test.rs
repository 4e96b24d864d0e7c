use quartz_core::core::InterruptKind;
use quartz_core::cpu::z80::{IM1_VECTOR, NMI_VECTOR};
mod common;
use common::{cpu_with, mem, run_instruction};

#[test]
fn test_im1_interrupt() {
    let mut cpu = cpu_with(&[0x00, 0x00]);
    cpu.regs.sp = 0x8000;
    cpu.regs.im = 1;
    cpu.set_interrupt_enabled(true);

    run_instruction(&mut cpu);
    cpu.request_interrupt(InterruptKind::Maskable);
    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 13, "IM 1 response should be 13 T-states");
    assert_eq!(cpu.regs.pc, IM1_VECTOR);
    assert_eq!(cpu.regs.sp, 0x7FFE);
    assert_eq!(mem(&cpu, 0x7FFE), 0x01, "return address is the next instruction");
    assert!(!cpu.regs.iff1);
    assert!(!cpu.regs.iff2);
    assert_eq!(cpu.pending_interrupt(), None);
}

#[test]
fn test_maskable_ignored_while_disabled() {
    let mut cpu = cpu_with(&[0x00, 0x00, 0xFB, 0x00, 0x00]); // NOP ; NOP ; EI ; NOP ; NOP
    cpu.regs.sp = 0x8000;
    cpu.regs.im = 1;

    cpu.request_interrupt(InterruptKind::Maskable);
    run_instruction(&mut cpu);
    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.pc, 2, "DI state leaves the request latched");
    assert_eq!(cpu.pending_interrupt(), Some(InterruptKind::Maskable));

    run_instruction(&mut cpu); // EI
    run_instruction(&mut cpu); // NOP still runs: EI delays acceptance
    assert_eq!(cpu.regs.pc, 4);
    assert_eq!(run_instruction(&mut cpu), 13);
    assert_eq!(cpu.regs.pc, IM1_VECTOR);
}

#[test]
fn test_im2_vector_table() {
    let mut cpu = cpu_with(&[0x00]);
    cpu.regs.sp = 0x8000;
    cpu.regs.im = 2;
    cpu.regs.i = 0x40;
    cpu.set_interrupt_enabled(true);
    cpu.set_interrupt_data(0x10);
    cpu.memory_mut().load(0x4010, &[0x00, 0x90]);

    cpu.request_interrupt(InterruptKind::Maskable);
    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 19, "IM 2 response should be 19 T-states");
    assert_eq!(cpu.regs.pc, 0x9000);
}

#[test]
fn test_im0_behaves_as_rst38() {
    let mut cpu = cpu_with(&[0x00]);
    cpu.regs.sp = 0x8000;
    cpu.set_interrupt_enabled(true);

    cpu.request_interrupt(InterruptKind::Maskable);
    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.pc, 0x0038);
}

#[test]
fn test_nmi_ignores_iff() {
    let mut cpu = cpu_with(&[0x00]);
    cpu.regs.sp = 0x8000;
    cpu.regs.pc = 0x1234;
    cpu.regs.iff1 = true;
    cpu.regs.iff2 = true;

    cpu.request_interrupt(InterruptKind::NonMaskable);
    let cycles = run_instruction(&mut cpu);
    assert_eq!(cycles, 11, "NMI response should be 11 T-states");
    assert_eq!(cpu.regs.pc, NMI_VECTOR);
    assert!(!cpu.regs.iff1);
    assert!(cpu.regs.iff2, "IFF2 keeps the old IFF1 for RETN");
    assert_eq!(mem(&cpu, 0x7FFF), 0x12);
    assert_eq!(mem(&cpu, 0x7FFE), 0x34);
}

#[test]
fn test_nmi_then_retn_restores_enable() {
    let mut cpu = cpu_with(&[0x00]);
    cpu.memory_mut().load(NMI_VECTOR, &[0xED, 0x45]); // RETN
    cpu.regs.sp = 0x8000;
    cpu.set_interrupt_enabled(true);

    cpu.request_interrupt(InterruptKind::NonMaskable);
    run_instruction(&mut cpu);
    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.pc, 0x0000);
    assert!(cpu.regs.iff1);
}

#[test]
fn test_nmi_takes_priority() {
    let mut cpu = cpu_with(&[0x00]);
    cpu.regs.sp = 0x8000;
    cpu.regs.im = 1;
    cpu.set_interrupt_enabled(true);

    cpu.request_interrupt(InterruptKind::NonMaskable);
    cpu.request_interrupt(InterruptKind::Maskable);
    assert_eq!(cpu.pending_interrupt(), Some(InterruptKind::NonMaskable));
    run_instruction(&mut cpu);
    assert_eq!(cpu.regs.pc, NMI_VECTOR);
}

#[test]
fn test_interrupt_wakes_halt() {
    let mut cpu = cpu_with(&[0x76, 0x00]); // HALT
    cpu.regs.sp = 0x8000;
    cpu.regs.im = 1;
    cpu.set_interrupt_enabled(true);

    run_instruction(&mut cpu);
    run_instruction(&mut cpu);
    assert!(cpu.is_halted());

    cpu.request_interrupt(InterruptKind::Maskable);
    run_instruction(&mut cpu);
    assert!(!cpu.is_halted());
    assert_eq!(cpu.regs.pc, IM1_VECTOR);
    assert_eq!(mem(&cpu, 0x7FFE), 0x01, "returns past HALT");
}

#[test]
fn test_reti_returns() {
    let mut cpu = cpu_with(&[0x00]);
    cpu.memory_mut().load(0x0038, &[0xFB, 0xED, 0x4D]); // EI ; RETI
    cpu.regs.sp = 0x8000;
    cpu.regs.im = 1;
    cpu.set_interrupt_enabled(true);

    cpu.request_interrupt(InterruptKind::Maskable);
    run_instruction(&mut cpu);
    run_instruction(&mut cpu);
    assert_eq!(run_instruction(&mut cpu), 14);
    assert_eq!(cpu.regs.pc, 0x0000);
    assert!(cpu.regs.iff1);
}
