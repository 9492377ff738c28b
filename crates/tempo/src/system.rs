//! State of the emulated system.

pub mod lazy;
pub mod scheduler;

use crate::modules::cpu::CpuModule;
use crate::modules::video::VideoModule;
use crate::system::scheduler::{MAX_SLICE_LENGTH, Scheduler};

/// System configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether the overclock factor applies. When disabled the CPU performs exactly one unit of
    /// work per emulated cycle.
    pub overclock_enable: bool,
    /// How much work the CPU performs per emulated cycle.
    pub overclock: f32,
    /// Whether to drain the GPU FIFO before skipping idle time.
    pub sync_on_skip_idle: bool,
    /// Whether execution must stay deterministic (e.g. during netplay or movie playback).
    pub deterministic: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            overclock_enable: false,
            overclock: 1.0,
            sync_on_skip_idle: false,
            deterministic: false,
        }
    }
}

/// System modules.
pub struct Modules {
    pub cpu: Box<dyn CpuModule>,
    pub video: Box<dyn VideoModule>,
}

/// CPU-visible execution state.
#[derive(Debug, Default)]
pub struct Cpu {
    /// Work budget left in the current slice, in downcount units. The CPU core decrements this
    /// while executing and yields to [`System::advance`] once it reaches zero or below.
    pub downcount: i32,
}

/// System state.
pub struct System {
    /// System configuration.
    pub config: Config,
    /// System modules.
    pub modules: Modules,
    /// Scheduler for events.
    pub scheduler: Scheduler,
    /// The CPU state.
    pub cpu: Cpu,
}

impl System {
    pub fn new(modules: Modules, config: Config) -> Self {
        let scheduler = Scheduler::new(&config);
        let mut system = System {
            config,
            modules,
            scheduler,
            cpu: Cpu::default(),
        };

        // the time between system creation and the first call to advance is the boundary between
        // slice -1 and slice 0, so the downcount must already be armed
        system.cpu.downcount = system.scheduler.cycles_to_downcount(MAX_SLICE_LENGTH);
        system
    }

    /// Snapshots [`Config`] into the scheduler.
    ///
    /// A new overclock factor takes effect at the next slice boundary, never mid-slice.
    pub fn refresh_config(&mut self) {
        self.scheduler.refresh_config(&self.config);
    }
}
