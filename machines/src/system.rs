//! A complete Z80 machine: CPU, system memory, port bank and peripherals,
//! driven one video frame at a time.

use quartz_core::config::CpuConfig;
use quartz_core::core::{InterruptKind, Machine, Peripheral};
use quartz_core::cpu::z80::Z80;
use quartz_core::error::ConfigError;

use crate::memory::SystemMemory;
use crate::ports::PortBank;
use crate::program::{LoadError, ProgramImage};

/// Board layout. The video refresh rate does not depend on the CPU clock.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct MachineConfig {
    pub frame_rate: u32,
    pub video_start: u16,
    pub video_end: u16,
    /// Bytes from 0x0000 that CPU writes cannot modify.
    pub rom_size: usize,
    /// Where program images are loaded and where execution starts.
    pub load_address: u16,
    /// Raise a maskable interrupt at the end of every frame.
    pub vblank_interrupt: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            video_start: 0xC000,
            video_end: 0xE000,
            rom_size: 0,
            load_address: 0x0000,
            vblank_interrupt: true,
        }
    }
}

pub struct Z80System {
    cpu: Z80<SystemMemory, PortBank>,
    peripherals: Vec<Box<dyn Peripheral>>,
    config: MachineConfig,
    chunk_cycles: u64,
    frames: u64,
}

impl Z80System {
    pub fn new(config: MachineConfig, cpu_config: CpuConfig) -> Result<Self, ConfigError> {
        let video = config.video_start..config.video_end.max(config.video_start);
        let memory = SystemMemory::new(config.rom_size, video);
        let chunk_cycles = cpu_config.chunk_cycles;
        let mut cpu = Z80::with_config(memory, PortBank::new(), cpu_config)?;
        cpu.start();
        cpu.regs.pc = config.load_address;
        log::info!(
            target: "machine",
            "Z80 system at {}, {} Hz video, ROM {} bytes",
            cpu.clock_mode(),
            config.frame_rate,
            config.rom_size
        );
        Ok(Self {
            cpu,
            peripherals: Vec::new(),
            config,
            chunk_cycles,
            frames: 0,
        })
    }

    /// Load `image` and point PC at its first byte.
    pub fn load_program(&mut self, image: &ProgramImage) -> Result<(), LoadError> {
        self.cpu.memory_mut().load(image)?;
        self.cpu.regs.pc = image.load_address();
        Ok(())
    }

    pub fn add_peripheral(&mut self, peripheral: Box<dyn Peripheral>) {
        log::debug!(target: "machine", "attached peripheral {}", peripheral.name());
        self.peripherals.push(peripheral);
    }

    pub fn cpu(&self) -> &Z80<SystemMemory, PortBank> {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Z80<SystemMemory, PortBank> {
        &mut self.cpu
    }

    pub fn memory(&self) -> &SystemMemory {
        self.cpu.memory()
    }

    pub fn ports(&self) -> &PortBank {
        self.cpu.io()
    }

    pub fn ports_mut(&mut self) -> &mut PortBank {
        self.cpu.io_mut()
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// T-states in one frame at the current clock mode.
    pub fn cycles_per_frame(&self) -> u64 {
        self.cpu.clock().cycles_per_frame(self.config.frame_rate)
    }
}

impl Machine for Z80System {
    fn run_frame(&mut self) -> u64 {
        let target = self.cycles_per_frame();
        let peripherals = &mut self.peripherals;
        let ran = self.cpu.execute_cycles_chunked(target, self.chunk_cycles, |_, cycles| {
            for peripheral in peripherals.iter_mut() {
                peripheral.update(cycles);
            }
        });

        // Vertical blank happens once per frame whatever the CPU clock.
        if self.config.vblank_interrupt {
            self.cpu.request_interrupt(InterruptKind::Maskable);
        }
        self.frames += 1;
        log::trace!(target: "machine", "frame {}: {ran} T", self.frames);
        ran
    }

    fn frame_rate_hz(&self) -> u32 {
        self.config.frame_rate
    }

    fn total_cycles(&self) -> u64 {
        self.cpu.total_cycles()
    }

    fn reset(&mut self) {
        self.cpu.reset();
        self.cpu.io_mut().reset();
        self.cpu.start();
        self.cpu.regs.pc = self.config.load_address;
        self.frames = 0;
        log::info!(target: "machine", "reset");
    }
}
