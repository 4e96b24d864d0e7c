/// A device that advances in step with the CPU.
///
/// The host calls `update()` with the number of T-states the CPU actually
/// executed (which may overshoot the requested amount by part of an
/// instruction). Disk controllers, sound chips and video refresh all follow
/// this pull model; none of them is driven from inside the CPU core.
pub trait Peripheral {
    /// Advance the device by `cycles` CPU T-states.
    fn update(&mut self, cycles: u64);

    /// Short name used in diagnostics.
    fn name(&self) -> &str;
}
