//! Idle-loop detection and fast-forward.
//!
//! Guest code often spins on a short polling loop (`LD A,(flag) / OR A /
//! JR Z,loop`) while it waits for an interrupt. The detector watches the
//! instruction stream for a block of 2..=threshold instructions that repeats
//! back to back and whose last iteration left the registers unchanged
//! (R excepted). Only then is the loop a fixed point: running it
//! again reproduces the same state, so the engine may charge its cycles
//! without executing it.
//!
//! Loops that write memory or ports, or touch interrupt state, never qualify.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::{IDLE_THRESHOLD_MAX, IDLE_THRESHOLD_MIN, IdleConfig};
use crate::cpu::z80::registers::Registers;

/// Iterations skipped in one burst before the engine drops back to real
/// execution and has to re-detect the loop.
pub const FAST_FORWARD_BURST: u32 = 500;

const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// One executed instruction as the detector sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Step {
    pub(crate) pc: u16,
    pub(crate) opcode: u8,
    pub(crate) cycles: u32,
    pub(crate) fetches: u8,
}

/// A confirmed idle loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdleLoop {
    /// Address of the loop's first instruction.
    pub start_pc: u16,
    /// Instructions per iteration.
    pub length: usize,
    /// T-states per iteration, as measured while detecting it.
    pub cycles: u32,
    /// Opcode fetches per iteration, for the refresh register.
    pub fetches: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdleStats {
    pub loops_detected: u64,
    pub iterations_skipped: u64,
    pub cycles_skipped: u64,
}

pub(crate) struct IdleDetector {
    config: IdleConfig,
    /// Recent instructions with the registers after each.
    history: VecDeque<(Step, Registers)>,
    active: Option<IdleLoop>,
    burst: u32,
    stats: IdleStats,
    last_report: Instant,
}

impl IdleDetector {
    pub(crate) fn new(config: IdleConfig) -> Self {
        let config = config.normalized();
        Self {
            history: VecDeque::with_capacity(config.threshold * 2),
            config,
            active: None,
            burst: 0,
            stats: IdleStats::default(),
            last_report: Instant::now(),
        }
    }

    pub(crate) fn config(&self) -> &IdleConfig {
        &self.config
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.cancel("detection disabled");
        }
        self.config.enabled = enabled;
    }

    pub(crate) fn set_threshold(&mut self, threshold: usize) {
        self.config.threshold = threshold.clamp(IDLE_THRESHOLD_MIN, IDLE_THRESHOLD_MAX);
        self.cancel("threshold changed");
    }

    pub(crate) fn set_sleep_micros(&mut self, micros: u64) {
        self.config = IdleConfig { sleep_micros: micros, ..self.config.clone() }.normalized();
    }

    pub(crate) fn stats(&self) -> IdleStats {
        self.stats
    }

    pub(crate) fn active(&self) -> Option<IdleLoop> {
        self.active
    }

    /// Forget everything learned about the instruction stream.
    pub(crate) fn reset(&mut self) {
        self.history.clear();
        self.active = None;
        self.burst = 0;
    }

    /// Leave fast-forward (if active) and restart detection from scratch.
    pub(crate) fn cancel(&mut self, reason: &str) {
        if let Some(idle) = self.active {
            log::debug!(target: "cpu", "idle loop at {:04X} released: {reason}", idle.start_pc);
        }
        self.reset();
    }

    /// Feed one executed instruction. `safe` says whether the instruction
    /// may be part of a skippable loop; `regs` is the state after it ran.
    pub(crate) fn observe(&mut self, step: Step, safe: bool, regs: &Registers) {
        if !self.config.enabled || self.active.is_some() {
            return;
        }
        if !safe {
            self.history.clear();
            return;
        }

        self.history.push_back((step, regs.clone()));
        while self.history.len() > self.config.threshold * 2 {
            self.history.pop_front();
        }

        let n = self.history.len();
        for len in IDLE_THRESHOLD_MIN..=self.config.threshold {
            if n < len * 2 {
                break;
            }
            let start = self.history[n - len].0;
            if regs.pc != start.pc {
                continue;
            }
            let recent = self.history.range(n - len..).map(|(s, _)| s);
            let previous = self.history.range(n - 2 * len..n - len).map(|(s, _)| s);
            if !recent.clone().eq(previous) {
                continue;
            }
            // Registers at the previous closing of the loop must match the
            // current ones, otherwise the loop is still making progress.
            let (_, before) = &self.history[n - 1 - len];
            if !before.same_state_ignoring_refresh(regs) {
                continue;
            }

            let idle = IdleLoop {
                start_pc: start.pc,
                length: len,
                cycles: recent.clone().map(|s| s.cycles).sum(),
                fetches: recent.map(|s| s.fetches).sum(),
            };
            self.activate(idle);
            return;
        }
    }

    fn activate(&mut self, idle: IdleLoop) {
        log::debug!(
            target: "cpu",
            "idle loop detected at {:04X}: {} instructions, {} T per iteration",
            idle.start_pc,
            idle.length,
            idle.cycles
        );
        self.history.clear();
        self.active = Some(idle);
        self.burst = 0;
        self.stats.loops_detected += 1;
    }

    /// Account for one skipped iteration. Returns how long the host thread
    /// should sleep if this iteration ended a burst.
    pub(crate) fn skip_iteration(&mut self) -> Option<Duration> {
        let idle = self.active?;
        self.stats.iterations_skipped += 1;
        self.stats.cycles_skipped += u64::from(idle.cycles);
        self.burst += 1;
        self.report();

        if self.burst < FAST_FORWARD_BURST {
            return None;
        }
        log::trace!(target: "cpu", "idle burst at {:04X} done, re-verifying", idle.start_pc);
        self.reset();
        (self.config.sleep_micros > 0).then(|| Duration::from_micros(self.config.sleep_micros))
    }

    fn report(&mut self) {
        if self.last_report.elapsed() < REPORT_INTERVAL {
            return;
        }
        self.last_report = Instant::now();
        log::debug!(
            target: "cpu",
            "idle: {} loops detected, {} iterations ({} T) skipped",
            self.stats.loops_detected,
            self.stats.iterations_skipped,
            self.stats.cycles_skipped
        );
    }
}
