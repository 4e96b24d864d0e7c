//! Host-supplied CPU configuration.
//!
//! The CPU never reads global state: everything tunable arrives through a
//! [`CpuConfig`] passed to [`Z80::with_config`](crate::cpu::z80::Z80::with_config)
//! or applied later through the individual setters.

use crate::core::clock::ClockMode;
use crate::error::ConfigError;

/// Smallest and largest idle-loop body (in instructions) the detector looks for.
pub const IDLE_THRESHOLD_MIN: usize = 2;
pub const IDLE_THRESHOLD_MAX: usize = 10;

/// Lower bound for a non-zero idle sleep.
pub const IDLE_SLEEP_FLOOR_MICROS: u64 = 100;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct IdleConfig {
    pub enabled: bool,
    /// Longest loop body considered, in instructions. Clamped to [2, 10].
    pub threshold: usize,
    /// Host courtesy sleep while fast-forwarding. 0 disables sleeping.
    pub sleep_micros: u64,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 5,
            sleep_micros: 1_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct TraceConfig {
    pub enabled: bool,
    /// Instructions traced before tracing switches itself off.
    pub max_entries: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 10_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct CpuConfig {
    pub clock_mode: ClockMode,
    pub speed_multiplier: f64,
    pub idle: IdleConfig,
    pub trace: TraceConfig,
    /// Granularity of `execute_cycles_chunked` when the host asks for the default.
    pub chunk_cycles: u64,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            clock_mode: ClockMode::Standard,
            speed_multiplier: 1.0,
            idle: IdleConfig::default(),
            trace: TraceConfig::default(),
            chunk_cycles: 10_000,
        }
    }
}

impl IdleConfig {
    /// Clamp the threshold and floor a non-zero sleep.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.threshold = self.threshold.clamp(IDLE_THRESHOLD_MIN, IDLE_THRESHOLD_MAX);
        if self.sleep_micros != 0 {
            self.sleep_micros = self.sleep_micros.max(IDLE_SLEEP_FLOOR_MICROS);
        }
        self
    }
}

impl CpuConfig {
    /// Normalize out-of-range values and reject the ones that cannot be fixed.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if !self.speed_multiplier.is_finite() || self.speed_multiplier <= 0.0 {
            return Err(ConfigError::InvalidSpeedMultiplier(self.speed_multiplier));
        }
        if self.chunk_cycles == 0 {
            return Err(ConfigError::ZeroChunk);
        }
        self.idle = self.idle.normalized();
        Ok(self)
    }
}
