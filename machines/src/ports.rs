//! The machine's 256-entry I/O port bank.

use quartz_core::core::IoPorts;

/// Input ports are set by the host (keyboard matrix, status bits); output
/// ports latch the last value the CPU wrote. Reading a port nobody set
/// returns the floating-bus value 0xFF.
pub struct PortBank {
    inputs: [Option<u8>; 256],
    outputs: [u8; 256],
    writes: u64,
}

impl PortBank {
    pub fn new() -> Self {
        Self {
            inputs: [None; 256],
            outputs: [0; 256],
            writes: 0,
        }
    }

    pub fn set_input(&mut self, port: u8, value: u8) {
        self.inputs[usize::from(port)] = Some(value);
    }

    pub fn clear_input(&mut self, port: u8) {
        self.inputs[usize::from(port)] = None;
    }

    /// Last value written to `port`.
    pub fn output(&self, port: u8) -> u8 {
        self.outputs[usize::from(port)]
    }

    /// Total OUT operations seen.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub fn reset(&mut self) {
        self.outputs = [0; 256];
        self.writes = 0;
    }
}

impl Default for PortBank {
    fn default() -> Self {
        Self::new()
    }
}

impl IoPorts for PortBank {
    fn read_port(&mut self, port: u8) -> u8 {
        match self.inputs[usize::from(port)] {
            Some(value) => value,
            None => {
                log::trace!(target: "io", "read from unmapped port {port:02X}");
                0xFF
            }
        }
    }

    fn write_port(&mut self, port: u8, value: u8) {
        self.outputs[usize::from(port)] = value;
        self.writes += 1;
    }
}
