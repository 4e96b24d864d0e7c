use crate::core::InterruptKind;

/// Generic CPU interface
pub trait Cpu: CpuStateTrait {
    /// Back to power-on state
    fn reset(&mut self);

    /// Latch an interrupt request for the next instruction boundary
    fn request_interrupt(&mut self, kind: InterruptKind);

    /// Query if CPU is halted internally (HALT instruction)
    fn is_sleeping(&self) -> bool;

    /// Run for at least `cycles` T-states, returning how many actually ran
    fn execute_cycles(&mut self, cycles: u64) -> u64;

    fn total_cycles(&self) -> u64;
}

// Re-export state types
pub mod state;
pub use state::{CpuStateTrait, Z80State};

// Z80 CPU
pub mod z80;
pub use z80::Z80;
