//! CPU core module interface.

/// Interface to the CPU core that drives the scheduler.
pub trait CpuModule: Send {
    /// Delivers pending external exceptions to the CPU.
    ///
    /// Called at the end of every [`advance`](crate::System::advance), after dispatching due
    /// events.
    fn check_external_exceptions(&mut self);

    /// Reports cycles to the performance monitor.
    fn update_performance_monitor(&mut self, cycles: u32, load_stores: u32, fp_instructions: u32);
}

/// An implementation of [`CpuModule`] that does nothing.
#[derive(Debug, Clone, Copy)]
pub struct NopCpuModule;

impl CpuModule for NopCpuModule {
    fn check_external_exceptions(&mut self) {}

    fn update_performance_monitor(&mut self, _: u32, _: u32, _: u32) {}
}
