use std::fmt;
use std::time::{Duration, Instant};

use quartz_core::core::machine::Machine;
use quartz_core::cpu::z80::IdleStats;
use quartz_machines::Z80System;

/// What a headless run did.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub cycles: u64,
    pub elapsed: Duration,
    /// Emulated time covered by `cycles` at the machine's clock.
    pub emulated: Duration,
    pub halted: bool,
    pub idle: IdleStats,
}

impl RunSummary {
    /// Emulated T-states per wall-clock microsecond.
    pub fn effective_mhz(&self) -> f64 {
        let micros = self.elapsed.as_secs_f64() * 1_000_000.0;
        if micros == 0.0 { 0.0 } else { self.cycles as f64 / micros }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "frames:      {}", self.frames)?;
        writeln!(f, "cycles:      {}", self.cycles)?;
        writeln!(
            f,
            "time:        {:.3}s emulated in {:.3}s ({:.2} MHz effective)",
            self.emulated.as_secs_f64(),
            self.elapsed.as_secs_f64(),
            self.effective_mhz()
        )?;
        writeln!(
            f,
            "idle:        {} loops, {} iterations, {} T skipped",
            self.idle.loops_detected, self.idle.iterations_skipped, self.idle.cycles_skipped
        )?;
        write!(f, "halted:      {}", if self.halted { "yes" } else { "no" })
    }
}

/// Run `frames` frames. With `realtime` each frame is held to the
/// machine's refresh period; otherwise the machine runs flat out.
pub fn run(system: &mut Z80System, frames: u64, realtime: bool) -> RunSummary {
    let period = Duration::from_secs_f64(1.0 / f64::from(system.frame_rate_hz().max(1)));
    let start = Instant::now();
    let first_cycle = system.total_cycles();
    let mut next_frame = start;

    for _ in 0..frames {
        system.run_frame();

        if realtime {
            next_frame += period;
            let now = Instant::now();
            if next_frame > now {
                std::thread::sleep(next_frame - now);
            } else if now - next_frame > period * 4 {
                // Too far behind to catch up; drop the backlog.
                log::debug!(target: "frontend", "frame pacing fell behind, resyncing");
                next_frame = now;
            }
        }
    }

    let cycles = system.total_cycles().wrapping_sub(first_cycle);
    let cpu = system.cpu();
    let emulated_micros = cpu.clock().cycles_to_micros(cycles) * cpu.clock().speed_multiplier();
    RunSummary {
        frames,
        cycles,
        elapsed: start.elapsed(),
        emulated: Duration::from_secs_f64(emulated_micros / 1_000_000.0),
        halted: cpu.is_halted(),
        idle: cpu.idle_stats(),
    }
}
