#![allow(dead_code)]

use std::ops::Range;

use quartz_core::core::{DeviceClass, IoPorts, Memory};
use quartz_core::cpu::z80::Z80;

/// Flat 64KB read/write memory with an optional video window.
pub struct TestMemory {
    pub memory: Vec<u8>,
    pub video: Option<Range<u16>>,
}

impl TestMemory {
    pub fn new() -> Self {
        Self {
            memory: vec![0; 0x10000],
            video: None,
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Memory for TestMemory {
    fn read_byte(&mut self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        self.memory[addr as usize] = value;
    }

    fn device_class(&self, addr: u16) -> DeviceClass {
        match &self.video {
            Some(range) if range.contains(&addr) => DeviceClass::VideoMemory,
            _ => DeviceClass::Memory,
        }
    }
}

/// Port space that answers reads from a table and records writes.
pub struct TestPorts {
    pub inputs: [u8; 256],
    pub reads: Vec<u8>,
    pub writes: Vec<(u8, u8)>,
}

impl TestPorts {
    pub fn new() -> Self {
        Self {
            inputs: [0xFF; 256],
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }
}

impl IoPorts for TestPorts {
    fn read_port(&mut self, port: u8) -> u8 {
        self.reads.push(port);
        self.inputs[port as usize]
    }

    fn write_port(&mut self, port: u8, value: u8) {
        self.writes.push((port, value));
    }
}

pub type TestCpu = Z80<TestMemory, TestPorts>;

pub fn new_cpu() -> TestCpu {
    Z80::new(TestMemory::new(), TestPorts::new())
}

/// CPU with `program` loaded at address 0 and PC = 0.
pub fn cpu_with(program: &[u8]) -> TestCpu {
    let mut cpu = new_cpu();
    cpu.memory_mut().load(0, program);
    cpu
}

pub fn run_instruction(cpu: &mut TestCpu) -> u32 {
    cpu.execute_step()
}

pub fn mem(cpu: &TestCpu, addr: u16) -> u8 {
    cpu.memory().memory[addr as usize]
}
