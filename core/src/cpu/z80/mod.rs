//! Zilog Z80 interpreter.
//!
//! Execution is instruction-granular: each step fetches, decodes and runs
//! one whole instruction and returns the T-states it took. Memory and I/O
//! are injected at construction and owned by the CPU for its lifetime.

mod alu;
mod bit;
mod block;
mod branch;
mod control;
pub mod cycles;
pub mod decode;
pub mod idle;
pub mod instruction;
mod io;
mod load_store;
pub mod registers;
mod stack;
mod trace;

use std::time::Duration;

use crate::config::{CpuConfig, IdleConfig};
use crate::core::bus::{MeteredIo, MeteredMemory};
use crate::core::{AccessCounts, ClockMode, ClockModel, InterruptKind, IoPorts, Memory};
use crate::cpu::Cpu;
use crate::cpu::state::{CpuStateTrait, Z80State};
use crate::error::ConfigError;

pub use cycles::{CycleShape, MachineCycle};
pub use decode::decode;
pub use idle::{FAST_FORWARD_BURST, IdleLoop, IdleStats};
pub use instruction::{
    AluOp, BlockOp, Condition, CpuSignals, Direction, Instruction, Op, Operand8, ShiftOp,
};
pub use registers::{Flag, IndexMode, Reg8, RegPair, Registers};

use idle::{IdleDetector, Step};
use trace::InstructionTrace;

/// T-states charged per step while halted (one opcode fetch of NOP).
pub const HALT_CYCLES: u32 = 4;

pub const NMI_VECTOR: u16 = 0x0066;
pub const IM1_VECTOR: u16 = 0x0038;

/// Steps `execute_cycles` may take beyond the requested cycle count before
/// it gives up. Every real step costs at least 4 T, so hitting this means
/// something returned 0 cycles repeatedly.
const STEP_SAFETY_MARGIN: u64 = 1_000;

/// Engine lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineState {
    #[default]
    Uninitialized,
    Initialized,
    Running,
    Paused,
}

/// A Z80 with its memory `M` and port space `I`.
pub struct Z80<M: Memory, I: IoPorts> {
    pub regs: Registers,
    memory: M,
    io: I,
    signals: CpuSignals,
    pending: Option<InterruptKind>,
    /// Byte the interrupting device puts on the data bus (IM 2 vector low).
    interrupt_data: u8,
    total_cycles: u64,
    state: EngineState,
    clock: ClockModel,
    chunk_cycles: u64,
    idle: IdleDetector,
    trace: InstructionTrace,
}

impl<M: Memory, I: IoPorts> Z80<M, I> {
    /// A CPU with default configuration and power-on registers. The engine
    /// starts uninitialized and becomes initialized on the first step or an
    /// explicit [`initialize`](Self::initialize).
    pub fn new(memory: M, io: I) -> Self {
        let config = CpuConfig::default();
        Self {
            regs: Registers::new(),
            memory,
            io,
            signals: CpuSignals::default(),
            pending: None,
            interrupt_data: 0xFF,
            total_cycles: 0,
            state: EngineState::Uninitialized,
            clock: ClockModel::new(config.clock_mode),
            chunk_cycles: config.chunk_cycles,
            idle: IdleDetector::new(config.idle),
            trace: InstructionTrace::new(&config.trace),
        }
    }

    pub fn with_config(memory: M, io: I, config: CpuConfig) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        let mut cpu = Self::new(memory, io);
        cpu.clock = ClockModel::new(config.clock_mode);
        cpu.clock.set_speed_multiplier(config.speed_multiplier)?;
        cpu.chunk_cycles = config.chunk_cycles;
        cpu.idle = IdleDetector::new(config.idle);
        cpu.trace = InstructionTrace::new(&config.trace);
        Ok(cpu)
    }

    // --- Lifecycle ---

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Power-on: registers reset, nothing pending, cycle count zero.
    pub fn initialize(&mut self) {
        self.power_on();
        self.state = EngineState::Initialized;
        log::debug!(target: "cpu", "initialized at {}", self.clock.mode());
    }

    pub fn start(&mut self) {
        if self.state == EngineState::Uninitialized {
            self.initialize();
        }
        self.state = EngineState::Running;
    }

    pub fn pause(&mut self) {
        if self.state == EngineState::Running {
            self.state = EngineState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == EngineState::Paused {
            self.state = EngineState::Running;
        }
    }

    pub fn stop(&mut self) {
        if self.state != EngineState::Uninitialized {
            self.state = EngineState::Initialized;
        }
    }

    /// Back to power-on state. Clock mode and configuration survive.
    pub fn reset(&mut self) {
        self.power_on();
        if self.state != EngineState::Uninitialized {
            self.state = EngineState::Initialized;
        }
        log::debug!(target: "cpu", "reset");
    }

    fn power_on(&mut self) {
        self.regs.reset();
        self.signals = CpuSignals::default();
        self.pending = None;
        self.total_cycles = 0;
        self.idle.cancel("reset");
    }

    // --- Execution ---

    /// Run one instruction (or interrupt response, or halted idle cycle)
    /// and return the T-states it took.
    pub fn execute_step(&mut self) -> u32 {
        self.step(u64::MAX)
    }

    /// Run until at least `cycles` T-states have elapsed. Returns the
    /// T-states actually run, which overshoots by less than one instruction.
    pub fn execute_cycles(&mut self, cycles: u64) -> u64 {
        let chunk = self.chunk_cycles;
        self.execute_cycles_chunked(cycles, chunk, |_, _| {})
    }

    /// Like [`execute_cycles`](Self::execute_cycles), calling `on_chunk`
    /// with the T-states of each chunk as it completes.
    pub fn execute_cycles_chunked<F>(&mut self, cycles: u64, chunk: u64, mut on_chunk: F) -> u64
    where
        F: FnMut(&mut Self, u64),
    {
        let chunk = chunk.max(1);
        let mut executed = 0u64;
        while executed < cycles {
            let ran = self.run_for((cycles - executed).min(chunk));
            if ran == 0 {
                break;
            }
            executed += ran;
            on_chunk(self, ran);
        }
        executed
    }

    fn run_for(&mut self, target: u64) -> u64 {
        if self.state == EngineState::Paused {
            return 0;
        }
        let cap = target.saturating_add(STEP_SAFETY_MARGIN);
        let mut ran = 0u64;
        let mut steps = 0u64;
        while ran < target {
            if steps >= cap {
                log::warn!(
                    target: "cpu",
                    "execution made no progress after {steps} steps at PC={:04X}, giving up",
                    self.regs.pc
                );
                break;
            }
            ran += u64::from(self.step(target - ran));
            steps += 1;
        }
        ran
    }

    /// One engine step. `budget` bounds how far an idle fast-forward may
    /// jump so a skipped iteration never carries execution past a point
    /// real execution would have stopped at.
    fn step(&mut self, budget: u64) -> u32 {
        match self.state {
            // Registers are already at power-on values from construction.
            EngineState::Uninitialized => self.state = EngineState::Initialized,
            EngineState::Paused => return 0,
            EngineState::Initialized | EngineState::Running => {}
        }

        let cycles = if let Some(cycles) = self.service_interrupt() {
            cycles
        } else if self.signals.halted {
            self.regs.refresh(1);
            HALT_CYCLES
        } else if let Some(cycles) = self.fast_forward(budget) {
            cycles
        } else {
            self.run_instruction()
        };

        self.total_cycles = self.total_cycles.wrapping_add(u64::from(cycles));
        cycles
    }

    fn run_instruction(&mut self) -> u32 {
        self.signals.ei_delay = false;
        let pc = self.regs.pc;

        let mut mem = MeteredMemory::new(&mut self.memory);
        let mut io = MeteredIo::new(&mut self.io);
        let opcode = mem.read_byte(pc);
        self.regs.pc = pc.wrapping_add(1);
        let instr = decode(opcode, &mut mem, pc);
        self.regs.refresh(instr.cycles.fetches);
        self.trace.record(&instr, &self.regs);

        let mut cycles = instr.execute(&mut self.signals, &mut self.regs, &mut mem, &mut io);
        cycles += self.clock.contention_cycles(AccessCounts {
            video: mem.video_accesses,
            io: io.accesses,
        });

        if self.idle.is_enabled() {
            let step = Step {
                pc,
                opcode,
                cycles,
                fetches: instr.cycles.fetches,
            };
            self.idle.observe(step, instr.is_idle_safe(), &self.regs);
        }
        cycles
    }

    fn fast_forward(&mut self, budget: u64) -> Option<u32> {
        let idle = self.idle.active()?;
        if self.regs.pc != idle.start_pc || u64::from(idle.cycles) > budget {
            return None;
        }
        self.regs.refresh(idle.fetches);
        if let Some(pause) = self.idle.skip_iteration() {
            std::thread::sleep(pause);
        }
        Some(idle.cycles)
    }

    // --- Interrupts ---

    /// Latch an interrupt request, serviced at the next instruction boundary.
    pub fn request_interrupt(&mut self, kind: InterruptKind) {
        match (self.pending, kind) {
            (Some(InterruptKind::NonMaskable), InterruptKind::Maskable) => {
                log::trace!(target: "cpu", "maskable request behind pending NMI dropped");
            }
            _ => self.pending = Some(kind),
        }
        self.idle.cancel("interrupt requested");
    }

    pub fn pending_interrupt(&self) -> Option<InterruptKind> {
        self.pending
    }

    /// Value the interrupting device drives onto the data bus; forms the
    /// low byte of the IM 2 vector table address.
    pub fn set_interrupt_data(&mut self, data: u8) {
        self.interrupt_data = data;
    }

    /// DI/EI from the host side: sets both flip-flops.
    pub fn set_interrupt_enabled(&mut self, enabled: bool) {
        self.regs.iff1 = enabled;
        self.regs.iff2 = enabled;
    }

    pub fn interrupt_enabled(&self) -> bool {
        self.regs.iff1
    }

    fn service_interrupt(&mut self) -> Option<u32> {
        let kind = self.pending?;
        let shape = match kind {
            InterruptKind::NonMaskable => {
                self.regs.iff1 = false;
                let ret = self.regs.pc;
                stack::push_word(&mut self.regs, &mut self.memory, ret);
                self.regs.pc = NMI_VECTOR;
                CycleShape::M1.internal(1).writes(2)
            }
            InterruptKind::Maskable => {
                if !self.regs.iff1 || self.signals.ei_delay {
                    return None;
                }
                self.regs.iff1 = false;
                self.regs.iff2 = false;
                let ret = self.regs.pc;
                stack::push_word(&mut self.regs, &mut self.memory, ret);
                if self.regs.im == 2 {
                    let table = u16::from_be_bytes([self.regs.i, self.interrupt_data]);
                    self.regs.pc = self.memory.read_word(table);
                    CycleShape::EMPTY.ack().writes(2).reads(2)
                } else {
                    // IM 0 is modelled as the RST 38h the data bus usually carries.
                    self.regs.pc = IM1_VECTOR;
                    CycleShape::EMPTY.ack().writes(2)
                }
            }
        };
        self.pending = None;
        self.signals.halted = false;
        self.regs.refresh(1);
        self.idle.cancel("interrupt serviced");
        Some(shape.t_states())
    }

    // --- Halt ---

    /// Put the CPU into the halted state as if it had executed HALT.
    pub fn halt(&mut self) {
        self.signals.halted = true;
        self.idle.cancel("halt");
    }

    pub fn is_halted(&self) -> bool {
        self.signals.halted
    }

    // --- Cycles and clock ---

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn clock(&self) -> &ClockModel {
        &self.clock
    }

    pub fn clock_mode(&self) -> ClockMode {
        self.clock.mode()
    }

    /// Switch clock modes. A real change restarts idle-loop measurement
    /// and keeps the cycle count. Setting the current mode again does
    /// nothing.
    pub fn set_clock_mode(&mut self, mode: ClockMode) {
        if !self.clock.set_mode(mode) {
            return;
        }
        self.idle.cancel("clock mode changed");
        log::info!(target: "cpu", "clock mode set to {mode} ({} Hz)", mode.frequency_hz());
    }

    pub fn set_speed_multiplier(&mut self, multiplier: f64) -> Result<(), ConfigError> {
        self.clock.set_speed_multiplier(multiplier)
    }

    // --- Idle detection and tracing ---

    pub fn idle_config(&self) -> &IdleConfig {
        self.idle.config()
    }

    pub fn set_idle_detection(&mut self, enabled: bool) {
        self.idle.set_enabled(enabled);
    }

    /// Longest loop body looked for, clamped to 2..=10 instructions.
    pub fn set_idle_threshold(&mut self, threshold: usize) {
        self.idle.set_threshold(threshold);
    }

    /// Host sleep at the end of each fast-forward burst. Zero disables it;
    /// anything else is floored at 100 µs.
    pub fn set_idle_sleep(&mut self, sleep: Duration) {
        let micros = u64::try_from(sleep.as_micros()).unwrap_or(u64::MAX);
        self.idle.set_sleep_micros(micros);
    }

    pub fn idle_stats(&self) -> IdleStats {
        self.idle.stats()
    }

    /// The loop currently being fast-forwarded, if any.
    pub fn idle_loop(&self) -> Option<IdleLoop> {
        self.idle.active()
    }

    pub fn set_trace(&mut self, enabled: bool, max_entries: u64) {
        self.trace.configure(enabled, max_entries);
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace.is_enabled()
    }

    // --- Collaborators ---

    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Mutable access to memory. Anything the host changes may break a
    /// loop the CPU is fast-forwarding, so idle detection starts over.
    pub fn memory_mut(&mut self) -> &mut M {
        self.idle.cancel("host memory access");
        &mut self.memory
    }

    pub fn io(&self) -> &I {
        &self.io
    }

    /// Mutable access to the port space. Restarts idle detection like
    /// [`memory_mut`](Self::memory_mut).
    pub fn io_mut(&mut self) -> &mut I {
        self.idle.cancel("host port access");
        &mut self.io
    }

    pub fn into_parts(self) -> (M, I) {
        (self.memory, self.io)
    }
}

impl<M: Memory, I: IoPorts> Cpu for Z80<M, I> {
    fn reset(&mut self) {
        Z80::reset(self);
    }

    fn request_interrupt(&mut self, kind: InterruptKind) {
        Z80::request_interrupt(self, kind);
    }

    fn is_sleeping(&self) -> bool {
        self.is_halted()
    }

    fn execute_cycles(&mut self, cycles: u64) -> u64 {
        Z80::execute_cycles(self, cycles)
    }

    fn total_cycles(&self) -> u64 {
        Z80::total_cycles(self)
    }
}

impl<M: Memory, I: IoPorts> CpuStateTrait for Z80<M, I> {
    type Snapshot = Z80State;

    fn snapshot(&self) -> Z80State {
        let r = &self.regs;
        Z80State {
            a: r.a,
            f: r.f,
            b: r.b,
            c: r.c,
            d: r.d,
            e: r.e,
            h: r.h,
            l: r.l,
            a_prime: r.a_prime,
            f_prime: r.f_prime,
            b_prime: r.b_prime,
            c_prime: r.c_prime,
            d_prime: r.d_prime,
            e_prime: r.e_prime,
            h_prime: r.h_prime,
            l_prime: r.l_prime,
            ix: r.ix,
            iy: r.iy,
            sp: r.sp,
            pc: r.pc,
            i: r.i,
            r: r.r,
            iff1: r.iff1,
            iff2: r.iff2,
            im: r.im,
            halted: self.signals.halted,
            total_cycles: self.total_cycles,
        }
    }
}
