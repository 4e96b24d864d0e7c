//! Errors for the few fallible entry points of the core.
//!
//! Execution itself never fails: bad opcodes, stack wraparound and the like
//! are logged and absorbed. Only configuration coming from the host can be
//! rejected.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown clock mode {0:?} (expected 4mhz or 8mhz)")]
    UnknownClockMode(String),

    #[error("speed multiplier must be finite and positive, got {0}")]
    InvalidSpeedMultiplier(f64),

    #[error("chunk size must be at least one cycle")]
    ZeroChunk,
}
