use crate::core::{IoPorts, Memory};
use crate::cpu::z80::alu::sz53p;
use crate::cpu::z80::instruction::Exec;
use crate::cpu::z80::registers::{Flag, Reg8};

// Port numbers are always the low byte of the 16-bit port address the Z80
// puts on the bus: n for IN A,(n)/OUT (n),A, and C for the (C) forms.

impl<M: Memory + ?Sized, I: IoPorts + ?Sized> Exec<'_, M, I> {
    /// IN A,(n). No flags affected.
    pub(crate) fn op_in_a_n(&mut self, port: u8) -> u32 {
        self.regs.a = self.io.read_port(port);
        0
    }

    /// OUT (n),A
    pub(crate) fn op_out_n_a(&mut self, port: u8) -> u32 {
        self.io.write_port(port, self.regs.a);
        0
    }

    /// IN r,(C). Flags: S, Z, PV(parity) from input, H=0, N=0, C preserved.
    /// With no register (ED 70) only the flags are updated.
    pub(crate) fn op_in_r_c(&mut self, reg: Option<Reg8>) -> u32 {
        let val = self.io.read_port(self.regs.c);
        if let Some(reg) = reg {
            self.regs.set_reg8(reg, val);
        }
        self.regs.f = sz53p(val) | (self.regs.f & Flag::C as u8);
        0
    }

    /// OUT (C),r. With no register (ED 71) outputs 0.
    pub(crate) fn op_out_c_r(&mut self, reg: Option<Reg8>) -> u32 {
        let val = reg.map_or(0, |reg| self.regs.get_reg8(reg));
        self.io.write_port(self.regs.c, val);
        0
    }
}
