//! Machine-cycle shapes.
//!
//! Each instruction declares the bus transactions it performs, and the
//! T-state total falls out of those: opcode fetch (M1) 4, memory read 3,
//! memory write 3, I/O read or write 4, internal cycles as counted, interrupt
//! acknowledge 7 (M1 with two automatic wait states).

/// One kind of machine cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MachineCycle {
    OpcodeFetch,
    MemoryRead,
    MemoryWrite,
    IoRead,
    IoWrite,
    Internal(u8),
    InterruptAck,
}

impl MachineCycle {
    #[must_use]
    pub const fn t_states(self) -> u32 {
        match self {
            Self::OpcodeFetch => 4,
            Self::MemoryRead | Self::MemoryWrite => 3,
            Self::IoRead | Self::IoWrite => 4,
            Self::Internal(n) => n as u32,
            Self::InterruptAck => 7,
        }
    }
}

/// Counts of each machine-cycle kind making up one instruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleShape {
    pub fetches: u8,
    pub mem_reads: u8,
    pub mem_writes: u8,
    pub io_reads: u8,
    pub io_writes: u8,
    pub internal: u8,
    pub interrupt_ack: bool,
}

impl CycleShape {
    pub const EMPTY: Self = Self {
        fetches: 0,
        mem_reads: 0,
        mem_writes: 0,
        io_reads: 0,
        io_writes: 0,
        internal: 0,
        interrupt_ack: false,
    };

    /// A single opcode fetch: the 4 T of a register-only instruction.
    pub const M1: Self = Self::EMPTY.fetch();

    #[must_use]
    pub const fn fetch(mut self) -> Self {
        self.fetches += 1;
        self
    }

    #[must_use]
    pub const fn read(mut self) -> Self {
        self.mem_reads += 1;
        self
    }

    #[must_use]
    pub const fn reads(mut self, n: u8) -> Self {
        self.mem_reads += n;
        self
    }

    #[must_use]
    pub const fn write(mut self) -> Self {
        self.mem_writes += 1;
        self
    }

    #[must_use]
    pub const fn writes(mut self, n: u8) -> Self {
        self.mem_writes += n;
        self
    }

    #[must_use]
    pub const fn io_in(mut self) -> Self {
        self.io_reads += 1;
        self
    }

    #[must_use]
    pub const fn io_out(mut self) -> Self {
        self.io_writes += 1;
        self
    }

    #[must_use]
    pub const fn internal(mut self, n: u8) -> Self {
        self.internal += n;
        self
    }

    #[must_use]
    pub const fn ack(mut self) -> Self {
        self.interrupt_ack = true;
        self
    }

    /// Total T-states.
    #[must_use]
    pub const fn t_states(&self) -> u32 {
        let mut t = self.fetches as u32 * MachineCycle::OpcodeFetch.t_states();
        t += (self.mem_reads as u32 + self.mem_writes as u32) * MachineCycle::MemoryRead.t_states();
        t += (self.io_reads as u32 + self.io_writes as u32) * MachineCycle::IoRead.t_states();
        t += self.internal as u32;
        if self.interrupt_ack {
            t += MachineCycle::InterruptAck.t_states();
        }
        t
    }

    /// True if the instruction can change anything outside the register file.
    #[must_use]
    pub const fn writes_externally(&self) -> bool {
        self.mem_writes > 0 || self.io_writes > 0
    }

    /// The shape as a sequence of machine cycles, in bus order for the
    /// common case (fetches, reads, internal, writes, I/O).
    #[must_use]
    pub fn cycles(&self) -> Vec<MachineCycle> {
        let mut out = Vec::new();
        if self.interrupt_ack {
            out.push(MachineCycle::InterruptAck);
        }
        out.extend(std::iter::repeat_n(MachineCycle::OpcodeFetch, self.fetches as usize));
        out.extend(std::iter::repeat_n(MachineCycle::MemoryRead, self.mem_reads as usize));
        if self.internal > 0 {
            out.push(MachineCycle::Internal(self.internal));
        }
        out.extend(std::iter::repeat_n(MachineCycle::MemoryWrite, self.mem_writes as usize));
        out.extend(std::iter::repeat_n(MachineCycle::IoRead, self.io_reads as usize));
        out.extend(std::iter::repeat_n(MachineCycle::IoWrite, self.io_writes as usize));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_totals() {
        // LD r,n
        assert_eq!(CycleShape::M1.read().t_states(), 7);
        // JR e (taken)
        assert_eq!(CycleShape::M1.read().internal(5).t_states(), 12);
        // CALL nn
        assert_eq!(CycleShape::M1.reads(2).internal(1).writes(2).t_states(), 17);
        // LDI
        assert_eq!(CycleShape::M1.fetch().read().write().internal(2).t_states(), 16);
        // IN A,(n)
        assert_eq!(CycleShape::M1.read().io_in().t_states(), 11);
        // IM1 interrupt response
        assert_eq!(CycleShape::EMPTY.ack().writes(2).t_states(), 13);
    }

    #[test]
    fn sequence_matches_total() {
        let shape = CycleShape::M1.fetch().read().internal(5).read();
        let total: u32 = shape.cycles().iter().map(|c| c.t_states()).sum();
        assert_eq!(total, shape.t_states());
        assert_eq!(total, 19);
    }

    #[test]
    fn external_writes() {
        assert!(!CycleShape::M1.read().writes_externally());
        assert!(CycleShape::M1.write().writes_externally());
        assert!(CycleShape::M1.read().io_out().writes_externally());
    }
}
