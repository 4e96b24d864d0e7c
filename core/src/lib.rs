pub mod config;
pub mod core;
pub mod cpu;
pub mod error;

pub mod prelude {
    pub use crate::config::{CpuConfig, IdleConfig, TraceConfig};
    pub use crate::core::machine::Machine;
    pub use crate::core::{ClockMode, InterruptKind, IoPorts, Memory, OpenBus, Peripheral};
    pub use crate::cpu::Cpu;
    pub use crate::cpu::z80::{EngineState, Z80};
    pub use crate::error::ConfigError;
}
