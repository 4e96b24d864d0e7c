use crate::core::{IoPorts, Memory};
use crate::cpu::z80::instruction::{AluOp, Exec, Op, Operand8};
use crate::cpu::z80::registers::{Flag, RegPair};

// --- Flag Helpers ---

pub(crate) fn parity(val: u8) -> bool {
    val.count_ones() % 2 == 0
}

/// S, Z, P/V-as-parity and X/Y for a logical result. H and N clear.
pub(crate) fn sz53p(result: u8) -> u8 {
    let mut f = result & (Flag::S as u8 | Flag::X as u8 | Flag::Y as u8);
    if result == 0 { f |= Flag::Z as u8; }
    if parity(result) { f |= Flag::PV as u8; }
    f
}

impl<M: Memory + ?Sized, I: IoPorts + ?Sized> Exec<'_, M, I> {
    fn logic(&mut self, result: u8, is_and: bool) {
        self.regs.a = result;
        let mut f = sz53p(result);
        if is_and { f |= Flag::H as u8; } // AND sets H, others clear it
        self.regs.f = f;
    }

    fn do_add(&mut self, val: u8, carry_in: bool) {
        let a = self.regs.a;
        let c_val = u8::from(carry_in && self.regs.flag(Flag::C));
        let result_u16 = u16::from(a) + u16::from(val) + u16::from(c_val);
        let result = result_u16 as u8;

        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if ((a & 0xF) + (val & 0xF) + c_val) > 0xF { f |= Flag::H as u8; }
        if ((a ^ result) & (val ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        if result_u16 > 0xFF { f |= Flag::C as u8; }

        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.regs.a = result;
        self.regs.f = f;
    }

    /// Subtract with flags. Returns the result without storing it so CP can
    /// share the computation.
    fn do_sub(&mut self, val: u8, carry_in: bool) -> u8 {
        let a = self.regs.a;
        let c_val = u8::from(carry_in && self.regs.flag(Flag::C));
        let result_u16 = u16::from(a).wrapping_sub(u16::from(val)).wrapping_sub(u16::from(c_val));
        let result = result_u16 as u8;

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if u16::from(a & 0xF) < u16::from(val & 0xF) + u16::from(c_val) { f |= Flag::H as u8; }
        if ((a ^ val) & (a ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        if result_u16 > 0xFF { f |= Flag::C as u8; }

        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.regs.f = f;
        result
    }

    fn do_cp(&mut self, val: u8) {
        self.do_sub(val, false);
        // X/Y come from the operand for CP, not the result
        let f = self.regs.f & !(Flag::X as u8 | Flag::Y as u8);
        self.regs.f = f | (val & (Flag::X as u8 | Flag::Y as u8));
    }

    pub(crate) fn perform_alu_op(&mut self, op: AluOp, val: u8) {
        match op {
            AluOp::Add => self.do_add(val, false),
            AluOp::Adc => self.do_add(val, true),
            AluOp::Sub => self.regs.a = self.do_sub(val, false),
            AluOp::Sbc => self.regs.a = self.do_sub(val, true),
            AluOp::And => self.logic(self.regs.a & val, true),
            AluOp::Xor => self.logic(self.regs.a ^ val, false),
            AluOp::Or => self.logic(self.regs.a | val, false),
            AluOp::Cp => self.do_cp(val),
        }
    }

    // --- Instructions ---

    /// ALU A,src: ADD, ADC, SUB, SBC, AND, XOR, OR, CP.
    pub(crate) fn op_alu(&mut self, op: AluOp, src: Operand8) -> u32 {
        let val = self.read8(src);
        self.perform_alu_op(op, val);
        0
    }

    /// INC/DEC r, (HL), (IX+d). C preserved.
    pub(crate) fn op_inc_dec8(&mut self, target: Operand8, is_dec: bool) -> u32 {
        let val = self.read8(target);
        let result = if is_dec { self.calc_dec_flags(val) } else { self.calc_inc_flags(val) };
        self.write8(target, result);
        0
    }

    fn calc_inc_flags(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        let mut f = self.regs.f & Flag::C as u8; // Preserve C
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (val & 0xF) == 0xF { f |= Flag::H as u8; }
        if val == 0x7F { f |= Flag::PV as u8; } // Overflow 7F -> 80
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.regs.f = f;
        result
    }

    fn calc_dec_flags(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        let mut f = (self.regs.f & Flag::C as u8) | Flag::N as u8; // Preserve C, Set N
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (val & 0xF) == 0x0 { f |= Flag::H as u8; } // Borrow from bit 4
        if val == 0x80 { f |= Flag::PV as u8; } // Overflow 80 -> 7F
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.regs.f = f;
        result
    }

    // --- 16-bit ALU ---

    /// ADD HL,rr (also IX/IY).
    /// H = carry from bit 11, C = carry from bit 15, N = 0.
    /// S, Z, PV preserved. X/Y from high byte of result.
    pub(crate) fn op_add16(&mut self, dst: RegPair, src: RegPair) -> u32 {
        let hl = self.regs.get_pair(dst);
        let rr = self.regs.get_pair(src);
        let result = u32::from(hl) + u32::from(rr);

        let mut f = self.regs.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if ((hl & 0x0FFF) + (rr & 0x0FFF)) > 0x0FFF { f |= Flag::H as u8; }
        if result > 0xFFFF { f |= Flag::C as u8; }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.regs.f = f;
        self.regs.set_pair(dst, result as u16);
        0
    }

    /// ADC HL,rr. All flags from the 16-bit result.
    pub(crate) fn op_adc_hl(&mut self, src: RegPair) -> u32 {
        let hl = u32::from(self.regs.get_hl());
        let rr = u32::from(self.regs.get_pair(src));
        let c = u32::from(self.regs.flag(Flag::C));
        let result = hl + rr + c;
        let result16 = result as u16;

        let mut f = ((result16 >> 8) as u8) & (Flag::S as u8 | Flag::X as u8 | Flag::Y as u8);
        if result16 == 0 { f |= Flag::Z as u8; }
        if ((hl & 0x0FFF) + (rr & 0x0FFF) + c) > 0x0FFF { f |= Flag::H as u8; }
        if ((hl ^ result) & (rr ^ result) & 0x8000) != 0 { f |= Flag::PV as u8; }
        if result > 0xFFFF { f |= Flag::C as u8; }
        self.regs.f = f;
        self.regs.set_hl(result16);
        0
    }

    /// SBC HL,rr. All flags from the 16-bit result, N set.
    pub(crate) fn op_sbc_hl(&mut self, src: RegPair) -> u32 {
        let hl = u32::from(self.regs.get_hl());
        let rr = u32::from(self.regs.get_pair(src));
        let c = u32::from(self.regs.flag(Flag::C));
        let result = hl.wrapping_sub(rr).wrapping_sub(c);
        let result16 = result as u16;

        let mut f = ((result16 >> 8) as u8) & (Flag::S as u8 | Flag::X as u8 | Flag::Y as u8);
        f |= Flag::N as u8;
        if result16 == 0 { f |= Flag::Z as u8; }
        if (hl & 0x0FFF) < (rr & 0x0FFF) + c { f |= Flag::H as u8; }
        if ((hl ^ rr) & (hl ^ result) & 0x8000) != 0 { f |= Flag::PV as u8; }
        if hl < rr + c { f |= Flag::C as u8; }
        self.regs.f = f;
        self.regs.set_hl(result16);
        0
    }

    /// INC rr / DEC rr. No flags affected.
    pub(crate) fn op_inc_dec16(&mut self, pair: RegPair, is_dec: bool) -> u32 {
        let val = self.regs.get_pair(pair);
        let result = if is_dec { val.wrapping_sub(1) } else { val.wrapping_add(1) };
        self.regs.set_pair(pair, result);
        0
    }

    // --- Accumulator Rotates ---

    /// RLCA, RRCA, RLA, RRA.
    /// H = 0, N = 0, C = bit shifted out. X/Y from A. S, Z, PV preserved.
    pub(crate) fn op_rotate_a(&mut self, op: Op) -> u32 {
        let a = self.regs.a;
        let old_carry = self.regs.flag(Flag::C);
        let (result, carry) = match op {
            Op::Rlca => (a.rotate_left(1), a & 0x80 != 0),
            Op::Rrca => (a.rotate_right(1), a & 0x01 != 0),
            Op::Rla => ((a << 1) | u8::from(old_carry), a & 0x80 != 0),
            _ => ((a >> 1) | (u8::from(old_carry) << 7), a & 0x01 != 0),
        };
        self.regs.a = result;
        let mut f = self.regs.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if carry { f |= Flag::C as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.regs.f = f;
        0
    }

    // --- Misc ALU ---

    /// DAA: decimal adjust accumulator after BCD add/sub.
    pub(crate) fn op_daa(&mut self) -> u32 {
        let a = self.regs.a;
        let n = self.regs.flag(Flag::N);
        let old_h = self.regs.flag(Flag::H);
        let old_c = self.regs.flag(Flag::C);

        let mut correction = 0u8;
        let mut new_c = old_c;

        if old_h || (a & 0x0F) > 9 {
            correction |= 0x06;
        }
        if old_c || a > 0x99 {
            correction |= 0x60;
            new_c = true;
        }

        let result = if n {
            a.wrapping_sub(correction)
        } else {
            a.wrapping_add(correction)
        };

        let new_h = if n {
            old_h && (a & 0x0F) < 6
        } else {
            (a & 0x0F) > 9
        };

        self.regs.a = result;
        let mut f = sz53p(result);
        if new_c { f |= Flag::C as u8; }
        if n { f |= Flag::N as u8; }
        if new_h { f |= Flag::H as u8; }
        self.regs.f = f;
        0
    }

    /// CPL: complement A. Sets H and N. X/Y from A. S, Z, PV, C preserved.
    pub(crate) fn op_cpl(&mut self) -> u32 {
        self.regs.a = !self.regs.a;
        let mut f = self.regs.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8 | Flag::C as u8);
        f |= Flag::H as u8 | Flag::N as u8;
        f |= self.regs.a & (Flag::X as u8 | Flag::Y as u8);
        self.regs.f = f;
        0
    }

    /// SCF: C = 1, H = 0, N = 0. X/Y from A. S, Z, PV preserved.
    pub(crate) fn op_scf(&mut self) -> u32 {
        let mut f = self.regs.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        f |= Flag::C as u8;
        f |= self.regs.a & (Flag::X as u8 | Flag::Y as u8);
        self.regs.f = f;
        0
    }

    /// CCF: H = old C, C = ~C, N = 0. X/Y from A. S, Z, PV preserved.
    pub(crate) fn op_ccf(&mut self) -> u32 {
        let old_c = self.regs.flag(Flag::C);
        let mut f = self.regs.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if old_c { f |= Flag::H as u8; } else { f |= Flag::C as u8; }
        f |= self.regs.a & (Flag::X as u8 | Flag::Y as u8);
        self.regs.f = f;
        0
    }

    /// NEG: A = 0 - A with SUB flags.
    pub(crate) fn op_neg(&mut self) -> u32 {
        let val = self.regs.a;
        self.regs.a = 0;
        self.regs.a = self.do_sub(val, false);
        0
    }

    /// RLD: rotate the low nibble of A and both nibbles of (HL) left.
    pub(crate) fn op_rld(&mut self) -> u32 {
        let addr = self.regs.get_hl();
        let m = self.mem.read_byte(addr);
        let a = self.regs.a;
        self.mem.write_byte(addr, (m << 4) | (a & 0x0F));
        self.regs.a = (a & 0xF0) | (m >> 4);
        self.regs.f = sz53p(self.regs.a) | (self.regs.f & Flag::C as u8);
        0
    }

    /// RRD: rotate the low nibble of A and both nibbles of (HL) right.
    pub(crate) fn op_rrd(&mut self) -> u32 {
        let addr = self.regs.get_hl();
        let m = self.mem.read_byte(addr);
        let a = self.regs.a;
        self.mem.write_byte(addr, (a << 4) | (m >> 4));
        self.regs.a = (a & 0xF0) | (m & 0x0F);
        self.regs.f = sz53p(self.regs.a) | (self.regs.f & Flag::C as u8);
        0
    }
}
