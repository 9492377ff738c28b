use crate::system::scheduler::EventKind;

/// A scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Deadline on the global timer axis, in emulated cycles.
    pub time: i64,
    /// Tiebreaker between events with equal deadlines: lower fires first.
    pub fifo_order: u64,
    /// Opaque value handed back to the handler when the event fires.
    pub userdata: u64,
    /// The registered kind this event fires as.
    pub kind: EventKind,
}

impl Event {
    #[inline(always)]
    fn key(&self) -> (i64, u64) {
        (self.time, self.fifo_order)
    }
}

/// A min-heap of events ordered by `(time, fifo_order)`.
#[derive(Debug, Default)]
pub struct EventHeap {
    events: Vec<Event>,
}

impl EventHeap {
    /// Builds a heap from events in arbitrary order.
    pub fn from_unordered(events: Vec<Event>) -> Self {
        let mut heap = Self { events };
        heap.rebuild();
        heap
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The event with the smallest `(time, fifo_order)`, if any.
    #[inline(always)]
    pub fn peek(&self) -> Option<&Event> {
        self.events.first()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
        self.sift_up(self.events.len() - 1);
    }

    pub fn pop(&mut self) -> Option<Event> {
        if self.events.is_empty() {
            return None;
        }

        let min = self.events.swap_remove(0);
        if !self.events.is_empty() {
            self.sift_down(0);
        }

        Some(min)
    }

    /// Keeps only the events for which `keep` returns true.
    ///
    /// Removing arbitrary events breaks the heap property, so the heap is rebuilt afterwards if
    /// anything was removed.
    pub fn retain(&mut self, keep: impl FnMut(&Event) -> bool) {
        let len = self.events.len();
        self.events.retain(keep);
        if self.events.len() != len {
            self.rebuild();
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Restores the heap property over the whole array.
    pub fn rebuild(&mut self) {
        for index in (0..self.events.len() / 2).rev() {
            self.sift_down(index);
        }
    }

    /// Iterates over the pending events in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Iterates over the pending events in arbitrary order, mutably.
    ///
    /// Callers must keep the relative order of events unchanged, or call
    /// [`rebuild`](EventHeap::rebuild) once done.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Event> {
        self.events.iter_mut()
    }

    /// Returns a copy of the pending events, sorted by `(time, fifo_order)`.
    pub fn snapshot_sorted(&self) -> Vec<Event> {
        let mut clone = self.events.clone();
        clone.sort_unstable_by_key(Event::key);
        clone
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.events[index].key() < self.events[parent].key() {
                self.events.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        loop {
            let left = 2 * index + 1;
            let right = 2 * index + 2;
            if left >= self.events.len() {
                break;
            }

            let mut smallest = left;
            if right < self.events.len() && self.events[right].key() < self.events[left].key() {
                smallest = right;
            }

            if self.events[smallest].key() < self.events[index].key() {
                self.events.swap(index, smallest);
                index = smallest;
            } else {
                break;
            }
        }
    }
}
