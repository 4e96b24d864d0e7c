//! Per-instruction trace through `log`.
//!
//! Each traced instruction becomes one `trace`-level record on the `cpu`
//! target. The trace turns itself off after a configurable number of
//! records so a forgotten switch cannot flood the log.

use crate::config::TraceConfig;
use crate::cpu::z80::instruction::Instruction;
use crate::cpu::z80::registers::Registers;

pub(crate) struct InstructionTrace {
    enabled: bool,
    max_entries: u64,
    emitted: u64,
}

impl InstructionTrace {
    pub(crate) fn new(config: &TraceConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_entries: config.max_entries,
            emitted: 0,
        }
    }

    pub(crate) fn configure(&mut self, enabled: bool, max_entries: u64) {
        self.enabled = enabled;
        self.max_entries = max_entries;
        self.emitted = 0;
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Log `instr` with the registers as they stand after its fetch and
    /// before it executes: PC is already past the opcode byte and R counts
    /// this instruction's fetches. The other registers are untouched.
    pub(crate) fn record(&mut self, instr: &Instruction, regs: &Registers) {
        if !self.enabled {
            return;
        }
        if self.emitted >= self.max_entries {
            self.enabled = false;
            log::info!(
                target: "cpu",
                "instruction trace stopped after {} entries",
                self.emitted
            );
            return;
        }
        self.emitted += 1;

        if log::log_enabled!(target: "cpu", log::Level::Trace) {
            log::trace!(target: "cpu", "{}", entry(instr, regs));
        }
    }
}

/// One trace line. The address column is the instruction's own, since
/// `regs.pc` has moved on by the time it is recorded.
fn entry(instr: &Instruction, regs: &Registers) -> String {
    let bytes: Vec<String> = instr.raw().iter().map(|b| format!("{b:02X}")).collect();
    format!(
        "{:04X}  {:<11}  {:<18} AF={:04X} BC={:04X} DE={:04X} HL={:04X} IX={:04X} IY={:04X} SP={:04X} R={:02X}",
        instr.address,
        bytes.join(" "),
        instr.op.to_string(),
        regs.get_af(),
        regs.get_bc(),
        regs.get_de(),
        regs.get_hl(),
        regs.ix,
        regs.iy,
        regs.sp,
        regs.r
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::z80::cycles::CycleShape;
    use crate::cpu::z80::instruction::Op;

    #[test]
    fn switches_itself_off_at_the_limit() {
        let mut trace = InstructionTrace::new(&TraceConfig { enabled: true, max_entries: 3 });
        let instr = Instruction {
            op: Op::Nop,
            address: 0,
            size: 1,
            cycles: CycleShape::M1,
            bytes: [0; 4],
        };
        let regs = Registers::new();
        for _ in 0..3 {
            trace.record(&instr, &regs);
        }
        assert!(trace.is_enabled());
        assert_eq!(trace.emitted(), 3);
        trace.record(&instr, &regs);
        assert!(!trace.is_enabled());
    }

    #[test]
    fn entry_uses_the_instruction_address() {
        let instr = Instruction {
            op: Op::Nop,
            address: 0x1234,
            size: 1,
            cycles: CycleShape::M1,
            bytes: [0; 4],
        };
        // As the engine hands them over: PC past the opcode, R refreshed.
        let mut regs = Registers::new();
        regs.pc = 0x1235;
        regs.r = 0x01;
        regs.set_af(0xABCD);

        let line = entry(&instr, &regs);
        assert!(line.starts_with("1234  00"), "{line}");
        assert!(line.contains("AF=ABCD"), "{line}");
        assert!(line.ends_with("R=01"), "{line}");
    }
}
