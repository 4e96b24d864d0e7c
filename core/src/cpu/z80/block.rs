use crate::core::{IoPorts, Memory};
use crate::cpu::z80::instruction::{BLOCK_REPEAT_T, BlockOp, Direction, Exec};
use crate::cpu::z80::registers::Flag;

impl<M: Memory + ?Sized, I: IoPorts + ?Sized> Exec<'_, M, I> {
    /// LDI/LDD/CPI/CPD/INI/IND/OUTI/OUTD and their repeating forms.
    ///
    /// A repeating form that has not finished rewinds PC to its own first
    /// byte and costs 5 T more, so it runs again as a fresh instruction.
    pub(crate) fn op_block(&mut self, op: BlockOp, dir: Direction, repeat: bool, start: u16) -> u32 {
        let again = match op {
            BlockOp::Ld => self.block_ld(dir),
            BlockOp::Cp => self.block_cp(dir),
            BlockOp::In => self.block_in(dir),
            BlockOp::Out => self.block_out(dir),
        };
        if repeat && again {
            self.regs.pc = start;
            BLOCK_REPEAT_T
        } else {
            0
        }
    }

    // --- Block Transfer ---

    /// (DE) <- (HL), HL±, DE±, BC--. Repeat while BC != 0.
    fn block_ld(&mut self, dir: Direction) -> bool {
        let val = self.mem.read_byte(self.regs.get_hl());
        self.mem.write_byte(self.regs.get_de(), val);

        let delta = dir.delta();
        self.regs.set_hl(self.regs.get_hl().wrapping_add(delta));
        self.regs.set_de(self.regs.get_de().wrapping_add(delta));
        self.regs.set_bc(self.regs.get_bc().wrapping_sub(1));

        let n = val.wrapping_add(self.regs.a);
        let mut f = self.regs.f & (Flag::S as u8 | Flag::Z as u8 | Flag::C as u8);
        if self.regs.get_bc() != 0 { f |= Flag::PV as u8; }
        // Undocumented: X = bit 3 of (val+A), Y = bit 1 of (val+A)
        if (n & 0x08) != 0 { f |= Flag::X as u8; }
        if (n & 0x02) != 0 { f |= Flag::Y as u8; }
        self.regs.f = f;

        self.regs.get_bc() != 0
    }

    // --- Block Compare ---

    /// Compare A-(HL), HL±, BC--. Repeat while BC != 0 and no match.
    fn block_cp(&mut self, dir: Direction) -> bool {
        let val = self.mem.read_byte(self.regs.get_hl());
        let result = self.regs.a.wrapping_sub(val);
        let h = (self.regs.a & 0xF) < (val & 0xF);

        self.regs.set_hl(self.regs.get_hl().wrapping_add(dir.delta()));
        self.regs.set_bc(self.regs.get_bc().wrapping_sub(1));

        let mut f = self.regs.f & Flag::C as u8; // preserve C
        f |= Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if h { f |= Flag::H as u8; }
        if self.regs.get_bc() != 0 { f |= Flag::PV as u8; }
        // Undocumented X/Y: n = result - H_flag
        let n = result.wrapping_sub(u8::from(h));
        if (n & 0x08) != 0 { f |= Flag::X as u8; }
        if (n & 0x02) != 0 { f |= Flag::Y as u8; }
        self.regs.f = f;

        self.regs.get_bc() != 0 && result != 0
    }

    // --- Block I/O ---

    /// Flags after a block I/O step: N set, Z/S/X/Y from B, C preserved.
    fn block_io_flags(&mut self) {
        let b = self.regs.b;
        let mut f = self.regs.f & Flag::C as u8;
        f |= Flag::N as u8;
        if b == 0 { f |= Flag::Z as u8; }
        f |= b & (Flag::S as u8 | Flag::X as u8 | Flag::Y as u8);
        self.regs.f = f;
    }

    /// IN port C -> (HL), HL±, B--. Repeat while B != 0.
    fn block_in(&mut self, dir: Direction) -> bool {
        let val = self.io.read_port(self.regs.c);
        self.mem.write_byte(self.regs.get_hl(), val);
        self.regs.b = self.regs.b.wrapping_sub(1);
        self.regs.set_hl(self.regs.get_hl().wrapping_add(dir.delta()));
        self.block_io_flags();
        self.regs.b != 0
    }

    /// B--, (HL) -> OUT port C, HL±. Repeat while B != 0.
    fn block_out(&mut self, dir: Direction) -> bool {
        self.regs.b = self.regs.b.wrapping_sub(1);
        let val = self.mem.read_byte(self.regs.get_hl());
        self.io.write_port(self.regs.c, val);
        self.regs.set_hl(self.regs.get_hl().wrapping_add(dir.delta()));
        self.block_io_flags();
        self.regs.b != 0
    }
}
