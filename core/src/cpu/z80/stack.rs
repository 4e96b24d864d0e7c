use crate::core::{IoPorts, Memory};
use crate::cpu::z80::instruction::Exec;
use crate::cpu::z80::registers::{RegPair, Registers};

/// Push a word: high byte at SP-1, low byte at SP-2. SP wraps below zero
/// with a warning instead of faulting.
pub(crate) fn push_word<M: Memory + ?Sized>(regs: &mut Registers, mem: &mut M, val: u16) {
    if regs.sp < 2 {
        log::warn!(target: "cpu", "stack pointer wrapped below 0000 on push at PC={:04X}", regs.pc);
    }
    let [low, high] = val.to_le_bytes();
    regs.sp = regs.sp.wrapping_sub(1);
    mem.write_byte(regs.sp, high);
    regs.sp = regs.sp.wrapping_sub(1);
    mem.write_byte(regs.sp, low);
}

/// Pop a word: low byte from SP, high byte from SP+1. SP wraps past FFFF
/// with a warning instead of faulting.
pub(crate) fn pop_word<M: Memory + ?Sized>(regs: &mut Registers, mem: &mut M) -> u16 {
    if regs.sp > 0xFFFD {
        log::warn!(target: "cpu", "stack pointer wrapped past FFFF on pop at PC={:04X}", regs.pc);
    }
    let low = mem.read_byte(regs.sp);
    regs.sp = regs.sp.wrapping_add(1);
    let high = mem.read_byte(regs.sp);
    regs.sp = regs.sp.wrapping_add(1);
    u16::from_le_bytes([low, high])
}

impl<M: Memory + ?Sized, I: IoPorts + ?Sized> Exec<'_, M, I> {
    pub(crate) fn push_word(&mut self, val: u16) {
        push_word(&mut *self.regs, &mut *self.mem, val);
    }

    pub(crate) fn pop_word(&mut self) -> u16 {
        pop_word(&mut *self.regs, &mut *self.mem)
    }

    /// PUSH rr (BC, DE, HL/IX/IY, AF)
    pub(crate) fn op_push(&mut self, pair: RegPair) -> u32 {
        let val = self.regs.get_pair(pair);
        self.push_word(val);
        0
    }

    /// POP rr (BC, DE, HL/IX/IY, AF)
    pub(crate) fn op_pop(&mut self, pair: RegPair) -> u32 {
        let val = self.pop_word();
        self.regs.set_pair(pair, val);
        0
    }

    /// EX (SP),HL / EX (SP),IX / EX (SP),IY
    pub(crate) fn op_ex_sp(&mut self, pair: RegPair) -> u32 {
        let sp = self.regs.sp;
        let from_stack = self.mem.read_word(sp);
        self.mem.write_word(sp, self.regs.get_pair(pair));
        self.regs.set_pair(pair, from_stack);
        0
    }
}
