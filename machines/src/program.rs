//! Program images: raw bytes plus the address they load at.

use std::path::Path;

use thiserror::Error;

// ---------------------------------------------------------------------------
// CRC-32
// ---------------------------------------------------------------------------

/// CRC-32 lookup table (reflected polynomial 0xEDB88320), the ZIP/PNG variant.
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

pub fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    crc ^ 0xFFFF_FFFF
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("program image is empty")]
    Empty,

    #[error("{len} bytes at {load_address:04X} do not fit in the 64KB address space")]
    TooLarge { len: usize, load_address: u16 },

    #[error("CRC32 expected 0x{expected:08X}, got 0x{actual:08X}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

// ---------------------------------------------------------------------------
// ProgramImage
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramImage {
    data: Vec<u8>,
    load_address: u16,
}

impl ProgramImage {
    /// Validate that `data` is non-empty and fits above `load_address`.
    pub fn new(data: Vec<u8>, load_address: u16) -> Result<Self, LoadError> {
        if data.is_empty() {
            return Err(LoadError::Empty);
        }
        if usize::from(load_address) + data.len() > crate::memory::MEMORY_SIZE {
            return Err(LoadError::TooLarge { len: data.len(), load_address });
        }
        Ok(Self { data, load_address })
    }

    pub fn from_file(path: &Path, load_address: u16) -> Result<Self, LoadError> {
        let data = std::fs::read(path)?;
        Self::new(data, load_address)
    }

    /// Fail with [`LoadError::ChecksumMismatch`] unless the image has the
    /// given CRC32.
    pub fn verify(&self, expected: u32) -> Result<(), LoadError> {
        let actual = self.crc32();
        if actual != expected {
            return Err(LoadError::ChecksumMismatch { expected, actual });
        }
        Ok(())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn load_address(&self) -> u16 {
        self.load_address
    }

    pub fn crc32(&self) -> u32 {
        crc32(&self.data)
    }
}
