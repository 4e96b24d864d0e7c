use crate::core::{IoPorts, Memory};
use crate::cpu::z80::alu::sz53p;
use crate::cpu::z80::instruction::{Exec, Operand8, ShiftOp};
use crate::cpu::z80::registers::{Flag, Reg8};

impl<M: Memory + ?Sized, I: IoPorts + ?Sized> Exec<'_, M, I> {
    /// Perform CB rotate/shift operation on a value.
    /// Returns (result, new_flags). Flags: S, Z, PV(parity), C from shifted bit. H=0, N=0.
    fn do_cb_rotate_shift(&self, op: ShiftOp, val: u8) -> (u8, u8) {
        let old_c = u8::from(self.regs.flag(Flag::C));
        let (result, carry) = match op {
            ShiftOp::Rlc => (val.rotate_left(1), val >> 7),
            ShiftOp::Rrc => (val.rotate_right(1), val & 1),
            // RL/RR rotate through carry
            ShiftOp::Rl => ((val << 1) | old_c, val >> 7),
            ShiftOp::Rr => ((val >> 1) | (old_c << 7), val & 1),
            ShiftOp::Sla => (val << 1, val >> 7),
            // SRA preserves the sign bit
            ShiftOp::Sra => (((val as i8) >> 1) as u8, val & 1),
            // SLL: shift left, set bit 0 (undocumented)
            ShiftOp::Sll => ((val << 1) | 1, val >> 7),
            ShiftOp::Srl => (val >> 1, val & 1),
        };

        let mut f = sz53p(result);
        if carry != 0 {
            f |= Flag::C as u8;
        }
        (result, f)
    }

    /// Write a CB result back to its operand, and for the DD/FD CB forms
    /// also to the copy register.
    fn store_cb(&mut self, target: Operand8, copy: Option<Reg8>, result: u8) {
        self.write8(target, result);
        if let Some(reg) = copy {
            self.regs.set_reg8(reg, result);
        }
    }

    /// RLC/RRC/RL/RR/SLA/SRA/SLL/SRL on r, (HL) or (IX+d).
    pub(crate) fn op_shift(&mut self, op: ShiftOp, target: Operand8, copy: Option<Reg8>) -> u32 {
        let val = self.read8(target);
        let (result, f) = self.do_cb_rotate_shift(op, val);
        self.regs.f = f;
        self.store_cb(target, copy, result);
        0
    }

    /// BIT b,x: Z = ~bit, S = bit 7 if tested, PV = Z, H=1, N=0, C preserved.
    /// X/Y from the tested value.
    pub(crate) fn op_bit(&mut self, bit: u8, target: Operand8) -> u32 {
        let val = self.read8(target);
        let tested = val & (1 << bit);
        let mut f = self.regs.f & Flag::C as u8; // preserve C
        f |= Flag::H as u8;
        if tested == 0 {
            f |= Flag::Z as u8;
            f |= Flag::PV as u8; // PV = Z for BIT
        }
        if bit == 7 && tested != 0 {
            f |= Flag::S as u8;
        }
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.regs.f = f;
        0
    }

    /// RES b,x / SET b,x: no flag changes.
    pub(crate) fn op_res_set(
        &mut self,
        bit: u8,
        target: Operand8,
        copy: Option<Reg8>,
        set: bool,
    ) -> u32 {
        let val = self.read8(target);
        let result = if set { val | (1 << bit) } else { val & !(1 << bit) };
        self.store_cb(target, copy, result);
        0
    }
}
