//! Host assembly for the Z80 core: memory map, port bank, program loading
//! and a frame-driven machine.

pub mod memory;
pub mod ports;
pub mod program;
pub mod system;

pub use memory::SystemMemory;
pub use ports::PortBank;
pub use program::{LoadError, ProgramImage};
pub use system::{MachineConfig, Z80System};
