use crate::core::{IoPorts, Memory};
use crate::cpu::z80::instruction::{Exec, Op, Operand8};
use crate::cpu::z80::registers::{Flag, RegPair};

impl<M: Memory + ?Sized, I: IoPorts + ?Sized> Exec<'_, M, I> {
    // --- 8-bit loads ---

    /// LD dst,src for every 8-bit form: r,r' / r,n / r,(HL) / (HL),r /
    /// (HL),n / (IX+d) variants / A,(BC) / A,(DE) / A,(nn) and the reverse
    /// stores. No flags affected.
    pub(crate) fn op_ld8(&mut self, dst: Operand8, src: Operand8) -> u32 {
        let val = self.read8(src);
        self.write8(dst, val);
        0
    }

    // --- 16-bit loads ---

    /// LD rr,nn
    pub(crate) fn op_ld16(&mut self, dst: RegPair, value: u16) -> u32 {
        self.regs.set_pair(dst, value);
        0
    }

    /// LD rr,(nn): little-endian load, covers LD HL,(nn) and the ED forms.
    pub(crate) fn op_ld16_load(&mut self, dst: RegPair, addr: u16) -> u32 {
        let val = self.mem.read_word(addr);
        self.regs.set_pair(dst, val);
        0
    }

    /// LD (nn),rr: low byte at nn, high byte at nn+1.
    pub(crate) fn op_ld16_store(&mut self, addr: u16, src: RegPair) -> u32 {
        let val = self.regs.get_pair(src);
        self.mem.write_word(addr, val);
        0
    }

    /// LD SP,HL / LD SP,IX / LD SP,IY
    pub(crate) fn op_ld_sp(&mut self, src: RegPair) -> u32 {
        self.regs.sp = self.regs.get_pair(src);
        0
    }

    // --- ED Load Operations ---

    /// LD I,A / LD R,A / LD A,I / LD A,R.
    /// The A-loading forms set S, Z from the value, H=0, N=0, PV=IFF2,
    /// C preserved, X/Y from the value.
    pub(crate) fn op_ld_special(&mut self, op: Op) -> u32 {
        let val = match op {
            Op::LdIA => {
                self.regs.i = self.regs.a;
                return 0;
            }
            Op::LdRA => {
                self.regs.r = self.regs.a;
                return 0;
            }
            Op::LdAI => self.regs.i,
            _ => self.regs.r,
        };
        self.regs.a = val;
        let mut f = self.regs.f & Flag::C as u8;
        if val == 0 { f |= Flag::Z as u8; }
        if self.regs.iff2 { f |= Flag::PV as u8; }
        f |= val & (Flag::S as u8 | Flag::X as u8 | Flag::Y as u8);
        self.regs.f = f;
        0
    }

    // --- Exchanges ---

    /// EX AF,AF' / EX DE,HL / EXX
    pub(crate) fn op_exchange(&mut self, op: Op) -> u32 {
        match op {
            Op::ExAf => self.regs.exchange_af(),
            Op::ExDeHl => {
                let de = self.regs.get_de();
                self.regs.set_de(self.regs.get_hl());
                self.regs.set_hl(de);
            }
            _ => self.regs.exchange_registers(),
        }
        0
    }
}
