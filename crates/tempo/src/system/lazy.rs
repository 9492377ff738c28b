use crate::system::System;

/// Cycles of the CPU clock per tick of the decrementer and time base.
pub const TIMER_RATIO: u64 = 12;

/// State of the time related registers, modeled as linear functions of the global timer instead
/// of being counted down cycle by cycle.
#[derive(Debug, Default)]
pub struct Lazy {
    /// Value the decrementer was last written with.
    pub fake_dec_start_value: u32,
    /// Virtual time of the last decrementer write.
    pub fake_dec_start_ticks: u64,
    /// Value the time base was last written with.
    pub fake_tb_start_value: u64,
    /// Virtual time of the last time base write.
    pub fake_tb_start_ticks: u64,
}

impl System {
    /// Current value of the decrementer register.
    pub fn decrementer(&self) -> u32 {
        let lazy = &self.scheduler.lazy;
        let elapsed = self.ticks().wrapping_sub(lazy.fake_dec_start_ticks) / TIMER_RATIO;
        lazy.fake_dec_start_value.wrapping_sub(elapsed as u32)
    }

    /// Writes the decrementer register.
    pub fn set_decrementer(&mut self, value: u32) {
        let now = self.ticks();
        tracing::trace!("decrementer set - now {now}, value {value}");

        let lazy = &mut self.scheduler.lazy;
        lazy.fake_dec_start_value = value;
        lazy.fake_dec_start_ticks = now;
    }

    /// Current value of the time base register.
    pub fn time_base(&self) -> u64 {
        let lazy = &self.scheduler.lazy;
        let elapsed = self.ticks().wrapping_sub(lazy.fake_tb_start_ticks) / TIMER_RATIO;
        lazy.fake_tb_start_value.wrapping_add(elapsed)
    }

    /// Writes the time base register.
    pub fn set_time_base(&mut self, value: u64) {
        let now = self.ticks();
        tracing::trace!("time base set - now {now}, value {value}");

        let lazy = &mut self.scheduler.lazy;
        lazy.fake_tb_start_value = value;
        lazy.fake_tb_start_ticks = now;
    }
}
