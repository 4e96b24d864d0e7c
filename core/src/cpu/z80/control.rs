use crate::core::{IoPorts, Memory};
use crate::cpu::z80::instruction::{Exec, Op};

impl<M: Memory + ?Sized, I: IoPorts + ?Sized> Exec<'_, M, I> {
    /// HALT, DI, EI and IM n.
    ///
    /// HALT leaves PC past itself; the engine then idles at 4 T per step
    /// until an interrupt is accepted. EI blocks interrupt acceptance until
    /// one more instruction has run.
    pub(crate) fn op_control(&mut self, op: Op) -> u32 {
        match op {
            Op::Halt => self.signals.halted = true,
            Op::Di => {
                self.regs.iff1 = false;
                self.regs.iff2 = false;
            }
            Op::Ei => {
                self.regs.iff1 = true;
                self.regs.iff2 = true;
                self.signals.ei_delay = true;
            }
            Op::Im(mode) => self.regs.im = mode,
            _ => {}
        }
        0
    }
}
