use crate::core::{IoPorts, Memory};
use crate::cpu::z80::instruction::{BRANCH_TAKEN_T, Condition, Exec};
use crate::cpu::z80::registers::{Flag, RegPair};

/// Extra T-states for a taken CALL cc (internal + two stack writes) and a
/// taken RET cc (two stack reads).
const CALL_TAKEN_T: u32 = 7;
const RET_TAKEN_T: u32 = 6;

impl<M: Memory + ?Sized, I: IoPorts + ?Sized> Exec<'_, M, I> {
    pub(crate) fn eval_condition(&self, cc: Condition) -> bool {
        let f = self.regs.f;
        match cc {
            Condition::NZ => (f & Flag::Z as u8) == 0,
            Condition::Z => (f & Flag::Z as u8) != 0,
            Condition::NC => (f & Flag::C as u8) == 0,
            Condition::C => (f & Flag::C as u8) != 0,
            Condition::PO => (f & Flag::PV as u8) == 0, // parity odd
            Condition::PE => (f & Flag::PV as u8) != 0, // parity even
            Condition::P => (f & Flag::S as u8) == 0,   // positive
            Condition::M => (f & Flag::S as u8) != 0,   // minus
        }
    }

    fn taken(&self, cond: Option<Condition>) -> bool {
        cond.is_none_or(|cc| self.eval_condition(cc))
    }

    /// JP nn / JP cc,nn. Same cost either way.
    pub(crate) fn op_jp(&mut self, cond: Option<Condition>, addr: u16) -> u32 {
        if self.taken(cond) {
            self.regs.pc = addr;
        }
        0
    }

    /// JP (HL) / JP (IX) / JP (IY): PC = register, no memory read.
    pub(crate) fn op_jp_ind(&mut self, pair: RegPair) -> u32 {
        self.regs.pc = self.regs.get_pair(pair);
        0
    }

    /// JR e / JR cc,e. Relative to the address after the instruction.
    /// The unconditional form already declares its 12 T; a taken
    /// conditional pays the 5 T address computation on top of 7.
    pub(crate) fn op_jr(&mut self, cond: Option<Condition>, offset: i8) -> u32 {
        if !self.taken(cond) {
            return 0;
        }
        self.regs.pc = self.regs.pc.wrapping_add(offset as i16 as u16);
        if cond.is_some() { BRANCH_TAKEN_T } else { 0 }
    }

    /// DJNZ e: B--, jump if B != 0. 8 T not taken, 13 T taken.
    pub(crate) fn op_djnz(&mut self, offset: i8) -> u32 {
        self.regs.b = self.regs.b.wrapping_sub(1);
        if self.regs.b == 0 {
            return 0;
        }
        self.regs.pc = self.regs.pc.wrapping_add(offset as i16 as u16);
        BRANCH_TAKEN_T
    }

    /// CALL nn / CALL cc,nn. 17 T, or 10 T for a condition not met.
    pub(crate) fn op_call(&mut self, cond: Option<Condition>, addr: u16) -> u32 {
        if !self.taken(cond) {
            return 0;
        }
        let ret = self.regs.pc;
        self.push_word(ret);
        self.regs.pc = addr;
        if cond.is_some() { CALL_TAKEN_T } else { 0 }
    }

    /// RET / RET cc. 10 T unconditional; 5 T or 11 T conditional.
    pub(crate) fn op_ret(&mut self, cond: Option<Condition>) -> u32 {
        if !self.taken(cond) {
            return 0;
        }
        self.regs.pc = self.pop_word();
        if cond.is_some() { RET_TAKEN_T } else { 0 }
    }

    /// RETN/RETI: pop PC, copy IFF2 to IFF1.
    pub(crate) fn op_retn(&mut self) -> u32 {
        self.regs.iff1 = self.regs.iff2;
        self.regs.pc = self.pop_word();
        0
    }

    /// RST p: push PC, jump to the fixed vector.
    pub(crate) fn op_rst(&mut self, vector: u8) -> u32 {
        let ret = self.regs.pc;
        self.push_word(ret);
        self.regs.pc = u16::from(vector);
        0
    }
}
