//! 64KB system memory with a write-protected ROM region and a video window.

use std::ops::Range;

use quartz_core::core::{DeviceClass, Memory};

use crate::program::{LoadError, ProgramImage};

pub const MEMORY_SIZE: usize = 0x10000;

/// Flat address space. Addresses below `rom_size` are read-only to the CPU;
/// the `video` window is ordinary RAM that the clock model charges extra for
/// in high-speed mode.
pub struct SystemMemory {
    data: Box<[u8]>,
    rom_size: usize,
    video: Range<u16>,
    rom_writes: u64,
}

impl SystemMemory {
    /// An inverted `video` range is treated as an empty window at its start.
    pub fn new(rom_size: usize, video: Range<u16>) -> Self {
        if video.end < video.start {
            log::warn!(
                target: "memory",
                "video window {:04X}..{:04X} is inverted, using an empty window",
                video.start,
                video.end
            );
        }
        let video = video.start..video.end.max(video.start);
        Self {
            data: vec![0; MEMORY_SIZE].into_boxed_slice(),
            rom_size: rom_size.min(MEMORY_SIZE),
            video,
            rom_writes: 0,
        }
    }

    /// Copy `image` into memory at its load address, ROM region included.
    pub fn load(&mut self, image: &ProgramImage) -> Result<(), LoadError> {
        let start = usize::from(image.load_address());
        let end = start + image.len();
        if end > MEMORY_SIZE {
            return Err(LoadError::TooLarge {
                len: image.len(),
                load_address: image.load_address(),
            });
        }
        self.data[start..end].copy_from_slice(image.bytes());
        log::debug!(
            target: "memory",
            "loaded {} bytes at {:04X} (crc32 {:08X})",
            image.len(),
            image.load_address(),
            image.crc32()
        );
        Ok(())
    }

    /// Host-side write that ignores ROM protection (DMA, disk loaders).
    pub fn poke(&mut self, addr: u16, value: u8) {
        self.data[usize::from(addr)] = value;
    }

    pub fn peek(&self, addr: u16) -> u8 {
        self.data[usize::from(addr)]
    }

    /// Contents of the video window, for a renderer.
    pub fn video(&self) -> &[u8] {
        &self.data[usize::from(self.video.start)..usize::from(self.video.end)]
    }

    pub fn video_range(&self) -> Range<u16> {
        self.video.clone()
    }

    pub fn rom_size(&self) -> usize {
        self.rom_size
    }

    /// CPU writes dropped because they targeted ROM.
    pub fn rom_writes(&self) -> u64 {
        self.rom_writes
    }

    /// Clear RAM, keep ROM.
    pub fn clear_ram(&mut self) {
        self.data[self.rom_size..].fill(0);
        self.rom_writes = 0;
    }

    fn is_rom(&self, addr: u16) -> bool {
        usize::from(addr) < self.rom_size
    }
}

impl Memory for SystemMemory {
    fn read_byte(&mut self, addr: u16) -> u8 {
        self.data[usize::from(addr)]
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        if self.is_rom(addr) {
            self.rom_writes += 1;
            log::debug!(target: "memory", "write of {value:02X} to ROM at {addr:04X} ignored");
            return;
        }
        self.data[usize::from(addr)] = value;
    }

    fn device_class(&self, addr: u16) -> DeviceClass {
        if self.video.contains(&addr) {
            DeviceClass::VideoMemory
        } else {
            DeviceClass::Memory
        }
    }
}
