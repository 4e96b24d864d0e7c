pub mod bus;
pub mod clock;
pub mod component;
pub mod machine;

pub use bus::{AccessCounts, DeviceClass, InterruptKind, IoPorts, Memory, OpenBus};
pub use clock::{ClockMode, ClockModel};
pub use component::Peripheral;
pub use machine::Machine;
