//! CPU clock model.
//!
//! The machine can run the Z80 from one of two crystals. Everything that
//! converts between T-states and wall-clock time goes through here, and so
//! does the approximate wait-state penalty for video memory and I/O ports in
//! the faster mode.

use std::fmt;
use std::str::FromStr;

use crate::core::bus::{AccessCounts, DeviceClass};
use crate::error::ConfigError;

/// Selectable CPU clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ClockMode {
    /// 3.9936 MHz
    #[default]
    Standard,
    /// 7.9872 MHz
    High,
}

impl ClockMode {
    #[must_use]
    pub const fn frequency_hz(self) -> u64 {
        match self {
            Self::Standard => 3_993_600,
            Self::High => 7_987_200,
        }
    }
}

impl fmt::Display for ClockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "4MHz"),
            Self::High => write!(f, "8MHz"),
        }
    }
}

impl FromStr for ClockMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "4" | "4mhz" | "standard" | "normal" => Ok(Self::Standard),
            "8" | "8mhz" | "high" | "fast" => Ok(Self::High),
            _ => Err(ConfigError::UnknownClockMode(s.to_string())),
        }
    }
}

/// T-states of one plain bus access, used to scale the contention penalty.
const MEMORY_ACCESS_T: f64 = 3.0;
const IO_ACCESS_T: f64 = 4.0;

/// Clock state owned by the CPU. Survives reset.
#[derive(Clone, Debug, PartialEq)]
pub struct ClockModel {
    mode: ClockMode,
    speed_multiplier: f64,
}

impl Default for ClockModel {
    fn default() -> Self {
        Self::new(ClockMode::Standard)
    }
}

impl ClockModel {
    #[must_use]
    pub const fn new(mode: ClockMode) -> Self {
        Self {
            mode,
            speed_multiplier: 1.0,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> ClockMode {
        self.mode
    }

    /// Switch modes. Returns `true` if the mode actually changed.
    pub fn set_mode(&mut self, mode: ClockMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        true
    }

    #[must_use]
    pub const fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    /// Debug-only wall-clock speed-up. Emulated cycle counts are unaffected.
    pub fn set_speed_multiplier(&mut self, multiplier: f64) -> Result<(), ConfigError> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ConfigError::InvalidSpeedMultiplier(multiplier));
        }
        self.speed_multiplier = multiplier;
        Ok(())
    }

    /// Nominal cycles per second in the current mode.
    #[must_use]
    pub const fn cycles_per_second(&self) -> u64 {
        self.mode.frequency_hz()
    }

    /// Cycles in one video frame at `frames_per_second` (integer division).
    #[must_use]
    pub fn cycles_per_frame(&self, frames_per_second: u32) -> u64 {
        self.cycles_per_second() / u64::from(frames_per_second.max(1))
    }

    /// Wall-clock microseconds that `cycles` T-states take on real hardware,
    /// divided by the debug speed multiplier.
    #[must_use]
    pub fn cycles_to_micros(&self, cycles: u64) -> f64 {
        cycles as f64 * 1_000_000.0 / self.cycles_per_second() as f64 / self.speed_multiplier
    }

    /// Inverse of [`cycles_to_micros`](Self::cycles_to_micros), rounded down.
    #[must_use]
    pub fn micros_to_cycles(&self, micros: f64) -> u64 {
        (micros * self.speed_multiplier * self.cycles_per_second() as f64 / 1_000_000.0) as u64
    }

    /// How strongly the current mode stretches an access to `class`.
    /// 1.0 means no wait states.
    #[must_use]
    pub fn access_multiplier(&self, class: DeviceClass) -> f64 {
        match (self.mode, class) {
            (ClockMode::Standard, _) | (ClockMode::High, DeviceClass::Memory) => 1.0,
            (ClockMode::High, DeviceClass::VideoMemory) => 1.25,
            (ClockMode::High, DeviceClass::IoPort) => 1.5,
        }
    }

    /// Extra T-states to charge for the accesses an instruction made.
    #[must_use]
    pub fn contention_cycles(&self, counts: AccessCounts) -> u32 {
        let per_video = (self.access_multiplier(DeviceClass::VideoMemory) - 1.0) * MEMORY_ACCESS_T;
        let per_io = (self.access_multiplier(DeviceClass::IoPort) - 1.0) * IO_ACCESS_T;
        per_video.ceil() as u32 * counts.video + per_io.ceil() as u32 * counts.io
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequencies() {
        assert_eq!(ClockMode::Standard.frequency_hz(), 3_993_600);
        assert_eq!(ClockMode::High.frequency_hz(), 7_987_200);
    }

    #[test]
    fn set_mode_is_idempotent() {
        let mut clock = ClockModel::default();
        assert!(!clock.set_mode(ClockMode::Standard));
        assert!(clock.set_mode(ClockMode::High));
        assert!(!clock.set_mode(ClockMode::High));
        assert_eq!(clock.mode(), ClockMode::High);
    }

    #[test]
    fn micros_conversion() {
        let clock = ClockModel::new(ClockMode::Standard);
        // One second of cycles is one million microseconds.
        let us = clock.cycles_to_micros(3_993_600);
        assert!((us - 1_000_000.0).abs() < 1e-6);
        assert_eq!(clock.micros_to_cycles(1_000_000.0), 3_993_600);

        let fast = ClockModel::new(ClockMode::High);
        assert!((fast.cycles_to_micros(3_993_600) - 500_000.0).abs() < 1e-6);
    }

    #[test]
    fn speed_multiplier_scales_wall_clock_only() {
        let mut clock = ClockModel::default();
        clock.set_speed_multiplier(2.0).unwrap();
        assert!((clock.cycles_to_micros(3_993_600) - 500_000.0).abs() < 1e-6);
        assert_eq!(clock.cycles_per_second(), 3_993_600);
        assert!(clock.set_speed_multiplier(0.0).is_err());
        assert!(clock.set_speed_multiplier(f64::NAN).is_err());
    }

    #[test]
    fn contention_only_in_high_mode() {
        let counts = AccessCounts { video: 2, io: 1 };
        let standard = ClockModel::new(ClockMode::Standard);
        assert_eq!(standard.contention_cycles(counts), 0);

        let high = ClockModel::new(ClockMode::High);
        // VRAM: ceil(0.25 * 3) = 1 per access, I/O: ceil(0.5 * 4) = 2 per access
        assert_eq!(high.contention_cycles(counts), 2 + 2);
        assert_eq!(high.access_multiplier(DeviceClass::Memory), 1.0);
    }

    #[test]
    fn parse_modes() {
        assert_eq!("8MHz".parse::<ClockMode>().unwrap(), ClockMode::High);
        assert_eq!("standard".parse::<ClockMode>().unwrap(), ClockMode::Standard);
        assert!("turbo".parse::<ClockMode>().is_err());
    }

    #[test]
    fn frame_cycles() {
        let clock = ClockModel::new(ClockMode::Standard);
        assert_eq!(clock.cycles_per_frame(60), 66_560);
    }
}
