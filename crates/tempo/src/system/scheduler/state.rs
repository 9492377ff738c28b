//! Save states of the scheduler.

use easyerr::{Error, ResultExt};

use crate::Primitive;
use crate::stream::{BinReader, BinRingBuffer, BinaryStream};
use crate::system::System;
use crate::system::scheduler::queue::{Event, EventHeap};

/// Marker written after the scheduler scalars.
const DATA_MARKER: &str = "CoreTimingData";
/// Marker written after the pending events.
const EVENTS_MARKER: &str = "CoreTimingEvents";

#[derive(Debug, Error)]
pub enum LoadStateError {
    #[error("save state data ended unexpectedly")]
    UnexpectedEnd,
    #[error("save state marker {expected:?} is missing or corrupt")]
    BadMarker { expected: &'static str },
    #[error(transparent)]
    BadKindName { source: std::string::FromUtf8Error },
}

fn read_be<P>(reader: &mut BinReader<'_>) -> Result<P, LoadStateError>
where
    P: Primitive,
{
    reader.read_be().ok_or(LoadStateError::UnexpectedEnd)
}

fn check_marker(reader: &mut BinReader<'_>, marker: &'static str) -> Result<(), LoadStateError> {
    let bytes = reader
        .read_bytes(marker.len())
        .ok_or(LoadStateError::UnexpectedEnd)?;

    if bytes != marker.as_bytes() {
        return Err(LoadStateError::BadMarker { expected: marker });
    }

    Ok(())
}

impl System {
    /// Serializes the scheduler into `buffer`.
    ///
    /// Producers are excluded and staged events are drained first, so the snapshot holds the
    /// complete pending set.
    pub fn save_state(&mut self, buffer: &mut BinRingBuffer) {
        let lock = self.scheduler.ingress.write_lock();
        let _guard = lock.lock().unwrap();

        let scheduler = &mut self.scheduler;
        buffer.push_be(scheduler.slice_length);
        buffer.push_be(scheduler.global_timer);
        buffer.push_be(scheduler.idled_cycles);
        buffer.push_be(scheduler.lazy.fake_dec_start_value);
        buffer.push_be(scheduler.lazy.fake_dec_start_ticks);
        buffer.push_be(scheduler.lazy.fake_tb_start_value);
        buffer.push_be(scheduler.lazy.fake_tb_start_ticks);
        buffer.push_be(scheduler.last_oc_factor);
        buffer.push_be(scheduler.event_fifo_id);
        buffer.push_bytes(DATA_MARKER.as_bytes());

        scheduler.move_events();
        buffer.push_be(scheduler.queue.len() as u32);
        for event in scheduler.queue.iter() {
            buffer.push_be(event.time);
            buffer.push_be(event.fifo_order);

            // userdata is an integer precisely so that it survives this
            buffer.push_be(event.userdata);

            // the kind itself cannot be serialized: kinds are not necessarily registered in the
            // same order, or at all, on every run. the registered name is the portable identity.
            let name = scheduler.kind_name(event.kind);
            buffer.push_be(name.len() as u32);
            buffer.push_bytes(name.as_bytes());
        }
        buffer.push_bytes(EVENTS_MARKER.as_bytes());
    }

    /// Restores the scheduler from `stream`.
    ///
    /// Events whose kind name is no longer registered are rebound to the lost event placeholder,
    /// keeping their deadline and userdata so the dispatch order of everything else is
    /// unaffected.
    pub fn load_state(&mut self, stream: &mut dyn BinaryStream) -> Result<(), LoadStateError> {
        let lock = self.scheduler.ingress.write_lock();
        let _guard = lock.lock().unwrap();

        let mut reader = BinReader::new(stream);
        let scheduler = &mut self.scheduler;

        scheduler.slice_length = read_be(&mut reader)?;
        scheduler.global_timer = read_be(&mut reader)?;
        scheduler.idled_cycles = read_be(&mut reader)?;
        scheduler.lazy.fake_dec_start_value = read_be(&mut reader)?;
        scheduler.lazy.fake_dec_start_ticks = read_be(&mut reader)?;
        scheduler.lazy.fake_tb_start_value = read_be(&mut reader)?;
        scheduler.lazy.fake_tb_start_ticks = read_be(&mut reader)?;
        scheduler.last_oc_factor = read_be(&mut reader)?;
        scheduler.last_oc_factor_inverted = 1.0 / scheduler.last_oc_factor;
        scheduler.event_fifo_id = read_be(&mut reader)?;
        check_marker(&mut reader, DATA_MARKER)?;

        let count: u32 = read_be(&mut reader)?;
        let mut events = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let time = read_be(&mut reader)?;
            let fifo_order = read_be(&mut reader)?;
            let userdata = read_be(&mut reader)?;

            let name_len: u32 = read_be(&mut reader)?;
            let name_bytes = reader
                .read_bytes(name_len as usize)
                .ok_or(LoadStateError::UnexpectedEnd)?;
            let name = String::from_utf8(name_bytes).context(LoadStateCtx::BadKindName)?;

            let kind = match scheduler.kind_by_name(&name) {
                Some(kind) => kind,
                None => {
                    tracing::warn!(
                        "lost event from save state because its kind {name:?} is not registered"
                    );
                    scheduler.ev_lost
                }
            };

            events.push(Event {
                time,
                fifo_order,
                userdata,
                kind,
            });
        }
        check_marker(&mut reader, EVENTS_MARKER)?;
        reader.finish();

        // the on-disk order reflects the heap layout of whoever saved, which depends on its
        // insertion history. it is meaningless here, so rebuild from scratch.
        scheduler.queue = EventHeap::from_unordered(events);
        scheduler.ingress.publish_boundary(scheduler.global_timer);

        Ok(())
    }
}
