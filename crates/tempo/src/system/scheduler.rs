//! Virtual-time event scheduler.
//!
//! Emulation is driven by a monotonic virtual clock measured in emulated CPU cycles. The CPU
//! core runs uninterrupted for a slice of cycles, decrementing [`Cpu::downcount`] as it works,
//! and yields to [`System::advance`] once the downcount reaches zero. `advance` accounts the
//! executed cycles, fires every due event and arms the downcount for the next slice, which ends
//! at the next event deadline or after [`MAX_SLICE_LENGTH`] cycles, whichever comes first.
//!
//! [`Cpu::downcount`]: crate::system::Cpu

pub mod ingress;
pub mod queue;
pub mod state;

use std::thread::ThreadId;

use rustc_hash::FxHashMap;

use crate::system::lazy::Lazy;
use crate::system::scheduler::ingress::{Ingress, RemoteScheduler};
use crate::system::scheduler::queue::{Event, EventHeap};
use crate::system::{Config, System};

/// Maximum amount of cycles granted to a single CPU slice.
pub const MAX_SLICE_LENGTH: i32 = 20000;

/// Name of the placeholder kind that adopts events from a save state whose own kind is no longer
/// registered.
pub const LOST_EVENT_NAME: &str = "_lost_event";

/// Stable identity of a registered event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKind(u32);

impl EventKind {
    /// Returns the index of this kind in the registry.
    #[inline(always)]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Context passed to an event handler when its event fires.
#[derive(Debug, Clone, Copy)]
pub struct HandlerCtx {
    /// Opaque value attached to the event when it was scheduled.
    pub userdata: u64,
    /// How many cycles past its deadline the event fired. Never negative.
    pub cycles_late: i64,
}

/// An event handler.
pub type Handler = fn(&mut System, HandlerCtx);

fn lost_event(_: &mut System, _: HandlerCtx) {}

/// Which thread a call to [`System::schedule_event`] claims to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromThread {
    /// The call runs on the CPU thread.
    Cpu,
    /// The call runs on a thread other than the CPU thread.
    NonCpu,
    /// Detect the thread from the caller's identity.
    Any,
}

struct RegisteredKind {
    name: String,
    handler: Handler,
}

/// Scheduler for events.
pub struct Scheduler {
    kinds: Vec<RegisteredKind>,
    kinds_by_name: FxHashMap<String, EventKind>,
    ev_lost: EventKind,

    queue: EventHeap,
    event_fifo_id: u64,
    ingress: Ingress,

    global_timer: i64,
    slice_length: i32,
    idled_cycles: i64,
    /// Whether `global_timer` is the exact current virtual time. False while the CPU is
    /// mid-slice, in which case [`System::ticks`] interpolates using the downcount.
    is_global_timer_sane: bool,

    last_oc_factor: f32,
    last_oc_factor_inverted: f32,
    config_oc_factor: f32,
    config_oc_inv_factor: f32,
    config_sync_on_skip_idle: bool,

    cpu_thread: ThreadId,

    /// State of the time related registers that update lazily.
    pub lazy: Lazy,
}

impl Scheduler {
    pub fn new(config: &Config) -> Self {
        let mut scheduler = Self {
            kinds: Vec::new(),
            kinds_by_name: FxHashMap::default(),
            ev_lost: EventKind(0),

            queue: EventHeap::default(),
            event_fifo_id: 0,
            ingress: Ingress::new(),

            global_timer: 0,
            slice_length: MAX_SLICE_LENGTH,
            idled_cycles: 0,
            is_global_timer_sane: true,

            last_oc_factor: 1.0,
            last_oc_factor_inverted: 1.0,
            config_oc_factor: 1.0,
            config_oc_inv_factor: 1.0,
            config_sync_on_skip_idle: false,

            cpu_thread: std::thread::current().id(),

            lazy: Lazy::default(),
        };

        scheduler.refresh_config(config);
        scheduler.last_oc_factor = scheduler.config_oc_factor;
        scheduler.last_oc_factor_inverted = scheduler.config_oc_inv_factor;
        scheduler.ev_lost = scheduler.register_event(LOST_EVENT_NAME, lost_event);

        scheduler
    }

    /// Registers a new event kind under a unique name.
    ///
    /// Names identify kinds across save states, so kinds must only be registered while setting
    /// the system up: a save state recorded by a previous run may reference any registered name.
    ///
    /// # Panics
    /// Panics if `name` is already registered.
    pub fn register_event(&mut self, name: &str, handler: Handler) -> EventKind {
        assert!(
            !self.kinds_by_name.contains_key(name),
            "event kind {name:?} is already registered - kinds must only be registered during \
             system setup to keep save states loadable",
        );

        let kind = EventKind(self.kinds.len() as u32);
        self.kinds.push(RegisteredKind {
            name: name.to_owned(),
            handler,
        });
        self.kinds_by_name.insert(name.to_owned(), kind);

        kind
    }

    /// Drops every registered event kind.
    ///
    /// # Panics
    /// Panics if any event is still pending.
    pub fn unregister_all_events(&mut self) {
        assert!(
            self.queue.is_empty(),
            "cannot unregister event kinds with events pending"
        );
        self.kinds.clear();
        self.kinds_by_name.clear();
    }

    /// Looks an event kind up by its registered name.
    pub fn kind_by_name(&self, name: &str) -> Option<EventKind> {
        self.kinds_by_name.get(name).copied()
    }

    /// The name an event kind was registered under.
    pub fn kind_name(&self, kind: EventKind) -> &str {
        &self.kinds[kind.0 as usize].name
    }

    fn handler(&self, kind: EventKind) -> Handler {
        self.kinds[kind.0 as usize].handler
    }

    /// Snapshots the given configuration. New overclock values take effect at the next slice
    /// boundary.
    pub fn refresh_config(&mut self, config: &Config) {
        self.config_oc_factor = if config.overclock_enable {
            config.overclock
        } else {
            1.0
        };
        self.config_oc_inv_factor = 1.0 / self.config_oc_factor;
        self.config_sync_on_skip_idle = config.sync_on_skip_idle;
        self.ingress.set_deterministic(config.deterministic);
    }

    /// Converts downcount units into emulated cycles.
    #[inline(always)]
    pub fn downcount_to_cycles(&self, downcount: i32) -> i32 {
        (downcount as f32 * self.last_oc_factor_inverted) as i32
    }

    /// Converts emulated cycles into downcount units.
    ///
    /// Overclocking works by scaling the work the CPU performs per cycle, not by changing the
    /// emulated clock rate: the CPU receives `overclock * slice_length` downcount units per
    /// slice, while event deadlines keep counting unscaled cycles.
    #[inline(always)]
    pub fn cycles_to_downcount(&self, cycles: i32) -> i32 {
        (cycles as f32 * self.last_oc_factor) as i32
    }

    /// Drains events staged by other threads into the event queue, assigning each a fresh FIFO
    /// order.
    pub fn move_events(&mut self) {
        while let Some(mut event) = self.ingress.try_pop() {
            event.fifo_order = self.event_fifo_id;
            self.event_fifo_id += 1;
            self.queue.push(event);
        }
    }

    /// Removes every pending event of the given kind from the event queue.
    ///
    /// Events staged by other threads are not affected; use [`System::remove_all_events`] to
    /// catch those too. Does nothing if no event of the kind is pending.
    pub fn remove_event(&mut self, kind: EventKind) {
        self.queue.retain(|event| event.kind != kind);
    }

    /// Drops every pending event.
    pub fn clear_pending_events(&mut self) {
        self.queue.clear();
    }

    /// Total amount of cycles skipped by [`System::idle`].
    pub fn idle_ticks(&self) -> u64 {
        self.idled_cycles as u64
    }

    /// Rescales every pending deadline after a change of the emulated CPU clock.
    ///
    /// Must be called from the CPU thread between slices. The transform is monotone, so the
    /// relative order of events is unchanged and the heap stays valid.
    pub fn adjust_event_queue_times(&mut self, new_clock: u32, old_clock: u32) {
        let global_timer = self.global_timer;
        for event in self.queue.iter_mut() {
            let ticks = (event.time - global_timer) * new_clock as i64 / old_clock as i64;
            event.time = global_timer + ticks;
        }
    }

    /// Returns a handle other threads can use to schedule events.
    pub fn remote(&self) -> RemoteScheduler {
        self.ingress.remote()
    }

    /// Whether the current thread is the CPU thread.
    pub fn is_cpu_thread(&self) -> bool {
        std::thread::current().id() == self.cpu_thread
    }

    /// Declares the current thread to be the CPU thread.
    pub fn declare_as_cpu_thread(&mut self) {
        self.cpu_thread = std::thread::current().id();
    }

    /// Logs every pending event in deadline order.
    pub fn log_pending_events(&self) {
        for event in self.queue.snapshot_sorted() {
            tracing::info!(
                "pending event - now {}, deadline {}, kind {}",
                self.global_timer,
                event.time,
                self.kind_name(event.kind),
            );
        }
    }

    /// Returns a human readable list of the pending events in deadline order.
    pub fn scheduled_events_summary(&self) -> String {
        let mut text = String::from("Scheduled events\n");
        text.reserve(1000);

        for event in self.queue.snapshot_sorted() {
            text += &format!(
                "{} : {} {:016x}\n",
                self.kind_name(event.kind),
                event.time,
                event.userdata
            );
        }

        text
    }

    fn pop_due(&mut self) -> Option<Event> {
        if self.queue.peek()?.time <= self.global_timer {
            self.queue.pop()
        } else {
            None
        }
    }
}

impl System {
    /// Current virtual time, in emulated cycles.
    ///
    /// Mid-slice the global timer lags behind, so the value is interpolated from the cycles the
    /// CPU has already burned off its downcount.
    pub fn ticks(&self) -> u64 {
        let mut ticks = self.scheduler.global_timer as u64;
        if !self.scheduler.is_global_timer_sane {
            let downcount = self.scheduler.downcount_to_cycles(self.cpu.downcount);
            ticks = ticks.wrapping_add((self.scheduler.slice_length - downcount) as u64);
        }
        ticks
    }

    /// Schedules an event to fire `cycles_into_future` cycles from now.
    ///
    /// A zero or negative value means "as soon as possible": the event fires during the next
    /// [`System::advance`]. On the CPU thread "now" is [`System::ticks`]; from other threads it
    /// is the virtual time of the last slice boundary.
    ///
    /// # Panics
    /// Panics if `kind` is not registered, or if `from` claims a thread the caller is not
    /// actually on.
    pub fn schedule_event(
        &mut self,
        cycles_into_future: i64,
        kind: EventKind,
        userdata: u64,
        from: FromThread,
    ) {
        assert!(
            (kind.0 as usize) < self.scheduler.kinds.len(),
            "scheduled an event of an unregistered kind"
        );

        let from_cpu_thread = match from {
            FromThread::Any => self.scheduler.is_cpu_thread(),
            _ => {
                let from_cpu_thread = from == FromThread::Cpu;
                assert_eq!(
                    from_cpu_thread,
                    self.scheduler.is_cpu_thread(),
                    "a {:?} event was scheduled from the wrong thread",
                    self.scheduler.kind_name(kind),
                );
                from_cpu_thread
            }
        };

        if from_cpu_thread {
            let deadline = self.ticks() as i64 + cycles_into_future;

            // if the event must fire before this slice ends, force an early yield
            if !self.scheduler.is_global_timer_sane {
                self.force_exception_check(cycles_into_future);
            }

            let fifo_order = self.scheduler.event_fifo_id;
            self.scheduler.event_fifo_id += 1;
            self.scheduler.queue.push(Event {
                time: deadline,
                fifo_order,
                userdata,
                kind,
            });
        } else {
            if self.scheduler.ingress.deterministic() {
                tracing::error!(
                    "event kind {:?} was scheduled off-thread while determinism is required - \
                     this is likely to cause a desync",
                    self.scheduler.kind_name(kind),
                );
            }

            self.scheduler.ingress.push(cycles_into_future, kind, userdata);
        }
    }

    /// Removes every pending event of the given kind, including ones staged by other threads.
    pub fn remove_all_events(&mut self, kind: EventKind) {
        self.scheduler.move_events();
        self.scheduler.remove_event(kind);
    }

    /// Shortens the current slice so the CPU yields within `cycles` cycles of now.
    pub fn force_exception_check(&mut self, cycles: i64) {
        let cycles = cycles.max(0);
        let downcount_cycles = self.scheduler.downcount_to_cycles(self.cpu.downcount) as i64;
        if downcount_cycles > cycles {
            // the downcount is always (much) smaller than i32::MAX, so the cast is fine. cycles
            // already executed in this slice stay accounted by shrinking the slice length
            self.scheduler.slice_length -= (downcount_cycles - cycles) as i32;
            self.cpu.downcount = self.scheduler.cycles_to_downcount(cycles as i32);
        }
    }

    /// Ends the current CPU slice: accounts the executed cycles, fires every due event and arms
    /// the downcount for the next slice.
    pub fn advance(&mut self) {
        self.scheduler.move_events();

        let cycles_executed =
            self.scheduler.slice_length - self.scheduler.downcount_to_cycles(self.cpu.downcount);
        self.scheduler.global_timer += cycles_executed as i64;
        self.scheduler.ingress.publish_boundary(self.scheduler.global_timer);
        self.scheduler.last_oc_factor = self.scheduler.config_oc_factor;
        self.scheduler.last_oc_factor_inverted = self.scheduler.config_oc_inv_factor;
        self.scheduler.slice_length = MAX_SLICE_LENGTH;

        self.scheduler.is_global_timer_sane = true;

        while let Some(event) = self.scheduler.pop_due() {
            let handler = self.scheduler.handler(event.kind);
            let cycles_late = self.scheduler.global_timer - event.time;
            handler(
                self,
                HandlerCtx {
                    userdata: event.userdata,
                    cycles_late,
                },
            );
        }

        self.scheduler.is_global_timer_sane = false;

        // still events left, scheduled in the future
        if let Some(next) = self.scheduler.queue.peek() {
            self.scheduler.slice_length =
                (next.time - self.scheduler.global_timer).min(MAX_SLICE_LENGTH as i64) as i32;
        }

        self.cpu.downcount = self
            .scheduler
            .cycles_to_downcount(self.scheduler.slice_length);

        // external exceptions are delivered only after dispatching: hardware relies on an
        // exception raised by an event arriving in the same slice as the event itself
        self.modules.cpu.check_external_exceptions();
    }

    /// Skips the rest of the current slice, fast-forwarding virtual time to the next event.
    pub fn idle(&mut self) {
        if self.scheduler.config_sync_on_skip_idle {
            // advancing past pending FIFO work desynchronizes the video interface, so drain it
            // before skipping ahead
            self.modules.video.flush_fifo();
        }

        self.modules
            .cpu
            .update_performance_monitor(self.cpu.downcount as u32, 0, 0);
        self.scheduler.idled_cycles +=
            self.scheduler.downcount_to_cycles(self.cpu.downcount) as i64;
        self.cpu.downcount = 0;
    }

    /// Tears the scheduler down, dropping every pending event and registered kind.
    pub fn shutdown(&mut self) {
        let lock = self.scheduler.ingress.write_lock();
        let _guard = lock.lock().unwrap();

        self.scheduler.move_events();
        self.scheduler.clear_pending_events();
        self.scheduler.unregister_all_events();
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use super::*;
    use crate::modules::cpu::NopCpuModule;
    use crate::modules::video::NopVideoModule;
    use crate::system::Modules;

    thread_local! {
        static FIRED: RefCell<Vec<(&'static str, u64, i64)>> = const { RefCell::new(Vec::new()) };
    }

    fn fired() -> Vec<(&'static str, u64, i64)> {
        FIRED.with(|fired| std::mem::take(&mut *fired.borrow_mut()))
    }

    fn ping(_: &mut System, ctx: HandlerCtx) {
        FIRED.with(|fired| fired.borrow_mut().push(("ping", ctx.userdata, ctx.cycles_late)));
    }

    fn pong(_: &mut System, ctx: HandlerCtx) {
        FIRED.with(|fired| fired.borrow_mut().push(("pong", ctx.userdata, ctx.cycles_late)));
    }

    fn chain(sys: &mut System, ctx: HandlerCtx) {
        FIRED.with(|fired| fired.borrow_mut().push(("chain", ctx.userdata, ctx.cycles_late)));
        if ctx.userdata > 0 {
            let kind = sys.scheduler.kind_by_name("chain").unwrap();
            sys.schedule_event(0, kind, ctx.userdata - 1, FromThread::Cpu);
        }
    }

    fn system() -> System {
        let _ = fired();
        System::new(
            Modules {
                cpu: Box::new(NopCpuModule),
                video: Box::new(NopVideoModule),
            },
            Config::default(),
        )
    }

    /// Burns `cycles` cycles off the downcount, as the CPU core would while executing.
    fn execute(sys: &mut System, cycles: i32) {
        sys.cpu.downcount -= sys.scheduler.cycles_to_downcount(cycles);
    }

    #[test]
    fn event_fires_at_its_deadline() {
        let mut sys = system();
        let kind = sys.scheduler.register_event("ping", ping);

        sys.schedule_event(1000, kind, 0xDEAD, FromThread::Cpu);
        execute(&mut sys, 1000);
        sys.advance();

        assert_eq!(fired(), [("ping", 0xDEAD, 0)]);
        assert_eq!(sys.ticks(), 1000);
        assert!(sys.scheduler.queue.is_empty());
        assert_eq!(sys.scheduler.slice_length, MAX_SLICE_LENGTH);
        assert_eq!(sys.cpu.downcount, MAX_SLICE_LENGTH);
    }

    #[test]
    fn equal_deadlines_fire_in_schedule_order() {
        let mut sys = system();
        let ping_kind = sys.scheduler.register_event("ping", ping);
        let pong_kind = sys.scheduler.register_event("pong", pong);

        sys.schedule_event(500, ping_kind, 1, FromThread::Cpu);
        sys.schedule_event(500, pong_kind, 2, FromThread::Cpu);
        execute(&mut sys, 500);
        sys.advance();

        assert_eq!(fired(), [("ping", 1, 0), ("pong", 2, 0)]);
    }

    #[test]
    fn non_positive_deadlines_fire_on_the_next_advance() {
        let mut sys = system();
        let kind = sys.scheduler.register_event("ping", ping);

        sys.schedule_event(0, kind, 1, FromThread::Cpu);
        sys.schedule_event(-100, kind, 2, FromThread::Cpu);
        sys.advance();

        let fired = fired();
        assert_eq!(fired.len(), 2);
        assert!(fired.iter().all(|(_, _, late)| *late >= 0));
    }

    #[test]
    fn mid_slice_schedule_shortens_the_slice() {
        let mut sys = system();
        let kind = sys.scheduler.register_event("ping", ping);

        // finish slice 0 so the CPU is mid-slice with a full downcount
        sys.cpu.downcount = 0;
        sys.advance();
        assert_eq!(sys.ticks(), 20000);
        assert!(!sys.scheduler.is_global_timer_sane);

        execute(&mut sys, 10000);
        assert_eq!(sys.ticks(), 30000);

        sys.schedule_event(100, kind, 0, FromThread::Cpu);
        assert_eq!(sys.cpu.downcount, 100);
        assert_eq!(sys.scheduler.slice_length, 10100);

        execute(&mut sys, 100);
        sys.advance();

        assert_eq!(fired(), [("ping", 0, 0)]);
        assert_eq!(sys.ticks(), 30100);
    }

    #[test]
    fn off_thread_events_fire_with_a_drain_time_fifo_order() {
        let mut sys = system();
        let ping_kind = sys.scheduler.register_event("ping", ping);
        let pong_kind = sys.scheduler.register_event("pong", pong);

        // the on-thread event enters the queue first and takes FIFO order 0
        sys.schedule_event(2000, ping_kind, 7, FromThread::Cpu);

        let remote = sys.scheduler.remote();
        std::thread::spawn(move || {
            remote.schedule(2000, pong_kind, 42);
        })
        .join()
        .unwrap();

        execute(&mut sys, 3000);
        sys.advance();

        assert_eq!(fired(), [("ping", 7, 1000), ("pong", 42, 1000)]);
        assert_eq!(sys.scheduler.event_fifo_id, 2);
    }

    #[test]
    fn off_thread_deadlines_ignore_mid_slice_time() {
        let mut sys = system();
        let kind = sys.scheduler.register_event("ping", ping);

        // mid-slice at ticks() == 25000, while the last boundary is at 20000
        sys.cpu.downcount = 0;
        sys.advance();
        execute(&mut sys, 5000);
        assert_eq!(sys.ticks(), 25000);

        let remote = sys.scheduler.remote();
        std::thread::spawn(move || {
            remote.schedule(100, kind, 0);
        })
        .join()
        .unwrap();

        sys.scheduler.move_events();
        assert_eq!(sys.scheduler.queue.peek().unwrap().time, 20100);
    }

    #[test]
    fn handlers_can_schedule_immediate_events() {
        let mut sys = system();
        let kind = sys.scheduler.register_event("chain", chain);

        sys.schedule_event(100, kind, 2, FromThread::Cpu);
        execute(&mut sys, 100);
        sys.advance();

        // the whole chain resolves within a single advance
        assert_eq!(fired(), [("chain", 2, 0), ("chain", 1, 0), ("chain", 0, 0)]);
    }

    #[test]
    fn idle_fast_forwards_to_the_next_event() {
        let mut sys = system();
        let kind = sys.scheduler.register_event("ping", ping);

        sys.schedule_event(50000, kind, 0, FromThread::Cpu);

        let mut advances = 0;
        loop {
            sys.idle();
            assert_eq!(sys.cpu.downcount, 0);
            sys.advance();
            advances += 1;

            let fired = fired();
            if !fired.is_empty() {
                assert_eq!(fired, [("ping", 0, 0)]);
                break;
            }
            assert!(advances < 10, "event never fired");
        }

        assert_eq!(sys.ticks(), 50000);
        assert_eq!(sys.scheduler.idle_ticks(), 50000);
        assert_eq!(advances, 3);
    }

    #[test]
    fn overclock_scales_the_downcount_but_not_virtual_time() {
        let run = |overclock_enable: bool| {
            let mut sys = system();
            let kind = sys.scheduler.register_event("ping", ping);

            sys.config.overclock_enable = overclock_enable;
            sys.config.overclock = 2.0;
            sys.refresh_config();

            sys.schedule_event(30000, kind, 0, FromThread::Cpu);
            sys.advance();

            if overclock_enable {
                // twice the work per cycle, so twice the downcount for the same slice
                assert_eq!(sys.cpu.downcount, 2 * MAX_SLICE_LENGTH);
            } else {
                assert_eq!(sys.cpu.downcount, MAX_SLICE_LENGTH);
            }

            while fired().is_empty() {
                sys.cpu.downcount = 0;
                sys.advance();
            }

            sys.ticks()
        };

        // events fire at the same virtual time regardless of the overclock factor
        assert_eq!(run(false), 30000);
        assert_eq!(run(true), 30000);
    }

    #[test]
    fn remove_all_events_catches_staged_events_too() {
        let mut sys = system();
        let ping_kind = sys.scheduler.register_event("ping", ping);
        let pong_kind = sys.scheduler.register_event("pong", pong);

        sys.schedule_event(100, ping_kind, 0, FromThread::Cpu);
        sys.schedule_event(200, ping_kind, 1, FromThread::Cpu);
        sys.schedule_event(300, pong_kind, 2, FromThread::Cpu);

        let remote = sys.scheduler.remote();
        std::thread::spawn(move || {
            remote.schedule(400, ping_kind, 3);
        })
        .join()
        .unwrap();

        sys.remove_all_events(ping_kind);

        assert_eq!(sys.scheduler.queue.len(), 1);
        assert!(sys.scheduler.queue.iter().all(|e| e.kind == pong_kind));

        execute(&mut sys, 1000);
        sys.advance();
        assert_eq!(fired(), [("pong", 2, 700)]);
    }

    #[test]
    fn removing_an_absent_kind_does_nothing() {
        let mut sys = system();
        let ping_kind = sys.scheduler.register_event("ping", ping);
        let pong_kind = sys.scheduler.register_event("pong", pong);

        sys.schedule_event(100, ping_kind, 0, FromThread::Cpu);
        sys.scheduler.remove_event(pong_kind);

        assert_eq!(sys.scheduler.queue.len(), 1);
    }

    #[test]
    fn adjusting_the_clock_preserves_event_order() {
        let mut sys = system();
        let ping_kind = sys.scheduler.register_event("ping", ping);
        let pong_kind = sys.scheduler.register_event("pong", pong);

        sys.schedule_event(300, ping_kind, 0, FromThread::Cpu);
        sys.schedule_event(300, pong_kind, 1, FromThread::Cpu);
        sys.schedule_event(100, pong_kind, 2, FromThread::Cpu);
        sys.schedule_event(900, ping_kind, 3, FromThread::Cpu);

        let before: Vec<_> = sys
            .scheduler
            .queue
            .snapshot_sorted()
            .iter()
            .map(|e| e.userdata)
            .collect();

        sys.scheduler.adjust_event_queue_times(729_000_000, 486_000_000);

        let after = sys.scheduler.queue.snapshot_sorted();
        assert_eq!(
            after.iter().map(|e| e.userdata).collect::<Vec<_>>(),
            before
        );
        assert_eq!(
            after.iter().map(|e| e.time).collect::<Vec<_>>(),
            [150, 450, 450, 1350]
        );
    }

    #[test]
    fn ticks_are_monotone_on_the_cpu_thread() {
        let mut sys = system();
        let kind = sys.scheduler.register_event("ping", ping);

        let mut observed = vec![sys.ticks()];
        sys.schedule_event(12345, kind, 0, FromThread::Cpu);
        observed.push(sys.ticks());

        for _ in 0..5 {
            execute(&mut sys, 3000);
            observed.push(sys.ticks());
            sys.advance();
            observed.push(sys.ticks());
        }

        assert!(observed.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn summary_lists_events_in_deadline_order() {
        let mut sys = system();
        let ping_kind = sys.scheduler.register_event("ping", ping);
        let pong_kind = sys.scheduler.register_event("pong", pong);

        sys.schedule_event(500, pong_kind, 0xBEEF, FromThread::Cpu);
        sys.schedule_event(100, ping_kind, 0xF00D, FromThread::Cpu);

        let summary = sys.scheduler.scheduled_events_summary();
        let lines: Vec<_> = summary.lines().collect();
        assert_eq!(lines[0], "Scheduled events");
        assert!(lines[1].starts_with("ping : 100"));
        assert!(lines[2].starts_with("pong : 500"));
    }

    #[test]
    fn shutdown_drops_pending_events_and_kinds() {
        let mut sys = system();
        let kind = sys.scheduler.register_event("ping", ping);

        sys.schedule_event(100, kind, 0, FromThread::Cpu);
        let remote = sys.scheduler.remote();
        std::thread::spawn(move || {
            remote.schedule(200, kind, 1);
        })
        .join()
        .unwrap();

        sys.shutdown();

        assert!(sys.scheduler.queue.is_empty());
        assert!(sys.scheduler.kind_by_name(LOST_EVENT_NAME).is_none());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registering_a_duplicate_name_panics() {
        let mut sys = system();
        sys.scheduler.register_event("ping", ping);
        sys.scheduler.register_event("ping", pong);
    }

    #[test]
    #[should_panic(expected = "events pending")]
    fn unregistering_with_pending_events_panics() {
        let mut sys = system();
        let kind = sys.scheduler.register_event("ping", ping);
        sys.schedule_event(100, kind, 0, FromThread::Cpu);
        sys.scheduler.unregister_all_events();
    }

    #[test]
    #[should_panic(expected = "wrong thread")]
    fn claiming_the_wrong_thread_panics() {
        let mut sys = system();
        let kind = sys.scheduler.register_event("ping", ping);
        sys.schedule_event(100, kind, 0, FromThread::NonCpu);
    }
}
