//! Staging of events scheduled off the CPU thread.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use crate::system::scheduler::EventKind;
use crate::system::scheduler::queue::Event;

struct Shared {
    /// Virtual time at the last slice boundary. Producers compute deadlines from this, so other
    /// threads never observe mid-slice time.
    boundary_timer: AtomicI64,
    /// Whether the emulator wants deterministic execution.
    deterministic: AtomicBool,
}

/// A cloneable handle for scheduling events from threads that do not own the
/// [`System`](crate::System).
#[derive(Clone)]
pub struct RemoteScheduler {
    sender: flume::Sender<Event>,
    write_lock: Arc<Mutex<()>>,
    shared: Arc<Shared>,
}

impl RemoteScheduler {
    /// Schedules an event to fire `cycles_into_future` cycles after the last slice boundary.
    ///
    /// The event stays staged until the CPU thread drains it, which assigns its FIFO order.
    pub fn schedule(&self, cycles_into_future: i64, kind: EventKind, userdata: u64) {
        if self.shared.deterministic.load(Ordering::Relaxed) {
            tracing::error!(
                "event kind {} was scheduled off-thread while determinism is required - this is \
                 likely to cause a desync",
                kind.index(),
            );
        }

        self.push(cycles_into_future, kind, userdata);
    }

    pub(super) fn push(&self, cycles_into_future: i64, kind: EventKind, userdata: u64) {
        let _guard = self.write_lock.lock().unwrap();
        let time = self.shared.boundary_timer.load(Ordering::Relaxed) + cycles_into_future;
        self.sender
            .send(Event {
                time,
                fifo_order: 0,
                userdata,
                kind,
            })
            .ok();
    }
}

/// Staging queue for events scheduled off the CPU thread.
///
/// Producers serialize between themselves through the write lock; the consumer side drains
/// without taking it, and acquires it only where producers must stay excluded for the duration
/// of a larger critical section (shutdown and save states).
pub struct Ingress {
    remote: RemoteScheduler,
    receiver: flume::Receiver<Event>,
}

impl Ingress {
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        let remote = RemoteScheduler {
            sender,
            write_lock: Arc::new(Mutex::new(())),
            shared: Arc::new(Shared {
                boundary_timer: AtomicI64::new(0),
                deterministic: AtomicBool::new(false),
            }),
        };

        Self { remote, receiver }
    }

    /// Returns a handle for scheduling events from other threads.
    pub fn remote(&self) -> RemoteScheduler {
        self.remote.clone()
    }

    /// Stages an event to fire `cycles_into_future` cycles after the last slice boundary.
    pub fn push(&self, cycles_into_future: i64, kind: EventKind, userdata: u64) {
        self.remote.push(cycles_into_future, kind, userdata);
    }

    /// Pops the oldest staged event. Does not exclude producers.
    pub fn try_pop(&self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Returns the lock which excludes producers while held.
    pub fn write_lock(&self) -> Arc<Mutex<()>> {
        self.remote.write_lock.clone()
    }

    /// Publishes the slice boundary virtual time to producers.
    pub fn publish_boundary(&self, timer: i64) {
        self.remote
            .shared
            .boundary_timer
            .store(timer, Ordering::Relaxed);
    }

    pub fn set_deterministic(&self, deterministic: bool) {
        self.remote
            .shared
            .deterministic
            .store(deterministic, Ordering::Relaxed);
    }

    pub fn deterministic(&self) -> bool {
        self.remote.shared.deterministic.load(Ordering::Relaxed)
    }
}
