/// Machine-agnostic interface for a complete emulated system.
///
/// A machine owns the CPU, its memory and I/O collaborators and any
/// peripherals. The frontend only paces frames; it never reaches into the CPU.
pub trait Machine {
    /// Run one video frame: execute a frame's worth of CPU cycles, feed the
    /// executed count to every peripheral and raise the vertical-blank
    /// interrupt. Returns the cycles actually executed.
    fn run_frame(&mut self) -> u64;

    /// Video refresh rate. Independent of the CPU clock mode.
    fn frame_rate_hz(&self) -> u32;

    /// Total T-states executed since power-on (wraps, never panics).
    fn total_cycles(&self) -> u64;

    /// Reset the machine to its initial power-on state.
    fn reset(&mut self);
}
