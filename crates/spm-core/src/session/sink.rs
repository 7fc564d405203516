//! Event delivery
//!
//! Sinks are called on the reader thread, in byte-arrival order. A sink that
//! hands events to another execution context (a UI loop, an async runtime)
//! must do so without blocking, which is what [`ChannelSink`] and
//! [`EventHub`] do with unbounded tokio channels. Those channels have no
//! capacity limit: a consumer that stops draining its receiver makes the
//! queue grow for as long as the device keeps sending.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::framer::FramingError;
use crate::record::{LineRecord, RawByte};

/// One delivered item, in the order the bytes were read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A non-terminator byte for live echo
    Partial(RawByte),
    /// A completed line
    Record(LineRecord),
    /// An overlong line was dropped; partial bytes echoed since the last
    /// record belong to it and will never complete
    Overflow(FramingError),
}

/// Receiver of session output
pub trait EventSink: Send + 'static {
    /// Called once per non-terminator byte
    fn on_partial(&mut self, byte: RawByte);

    /// Called once per completed line, decoded or not
    fn on_record(&mut self, record: LineRecord);

    /// Called when an overlong line is dropped and the session keeps running
    fn on_framing_error(&mut self, _error: &FramingError) {}
}

/// Closure pair sink
pub struct Callbacks<R, P> {
    on_record: R,
    on_partial: P,
}

impl<R, P> Callbacks<R, P>
where
    R: FnMut(LineRecord) + Send + 'static,
    P: FnMut(RawByte) + Send + 'static,
{
    /// Wrap the record and partial-byte closures
    pub fn new(on_record: R, on_partial: P) -> Self {
        Self {
            on_record,
            on_partial,
        }
    }
}

impl<R, P> EventSink for Callbacks<R, P>
where
    R: FnMut(LineRecord) + Send + 'static,
    P: FnMut(RawByte) + Send + 'static,
{
    fn on_partial(&mut self, byte: RawByte) {
        (self.on_partial)(byte)
    }

    fn on_record(&mut self, record: LineRecord) {
        (self.on_record)(record)
    }
}

/// Forwards events over a single tokio channel
///
/// All event kinds share one channel so a consumer can never see a partial
/// byte of the next line before the record or overflow that precedes it.
///
/// The channel is unbounded so the reader thread never waits on a slow
/// consumer. Memory use is bounded only by how fast the receiver drains it.
pub struct ChannelSink {
    tx: UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver consumers read from
    pub fn channel() -> (Self, UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Wrap an existing sender
    pub fn new(tx: UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Session event dropped, receiver closed");
        }
    }
}

impl EventSink for ChannelSink {
    fn on_partial(&mut self, byte: RawByte) {
        self.send(SessionEvent::Partial(byte));
    }

    fn on_record(&mut self, record: LineRecord) {
        self.send(SessionEvent::Record(record));
    }

    fn on_framing_error(&mut self, error: &FramingError) {
        self.send(SessionEvent::Overflow(error.clone()));
    }
}

/// Fan-out registry of subscribers
///
/// Clones share the same subscriber list, so one clone can be handed to the
/// session while others keep registering consumers. Every subscriber gets its
/// own copy of each event; subscribers whose receiver was dropped are pruned.
/// Each subscriber channel is unbounded, like [`ChannelSink`].
#[derive(Clone, Default)]
pub struct EventHub {
    subscribers: Arc<Mutex<Vec<UnboundedSender<SessionEvent>>>>,
}

impl EventHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new consumer
    pub fn subscribe(&self) -> UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        rx
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        match self.subscribers.lock() {
            Ok(subs) => subs.iter().filter(|tx| !tx.is_closed()).count(),
            Err(poisoned) => poisoned.into_inner().iter().filter(|tx| !tx.is_closed()).count(),
        }
    }

    fn publish(&self, event: SessionEvent) {
        let mut subs = match self.subscribers.lock() {
            Ok(subs) => subs,
            Err(poisoned) => poisoned.into_inner(),
        };
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl EventSink for EventHub {
    fn on_partial(&mut self, byte: RawByte) {
        self.publish(SessionEvent::Partial(byte));
    }

    fn on_record(&mut self, record: LineRecord) {
        self.publish(SessionEvent::Record(record));
    }

    fn on_framing_error(&mut self, error: &FramingError) {
        self.publish(SessionEvent::Overflow(error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_callbacks_dispatch() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let bytes = Arc::new(Mutex::new(Vec::new()));
        let (r, b) = (records.clone(), bytes.clone());

        let mut sink = Callbacks::new(
            move |rec: LineRecord| r.lock().unwrap().push(rec.content),
            move |byte: RawByte| b.lock().unwrap().push(byte.value),
        );
        sink.on_partial(RawByte::new(b'x', Utc::now()));
        sink.on_record(LineRecord::new(Utc::now(), b"x\n".to_vec()));

        assert_eq!(*bytes.lock().unwrap(), vec![b'x']);
        assert_eq!(*records.lock().unwrap(), vec![b"x\n".to_vec()]);
    }

    #[test]
    fn test_hub_prunes_closed_subscribers() {
        let mut hub = EventHub::new();
        let mut keep = hub.subscribe();
        let dropped = hub.subscribe();
        drop(dropped);

        hub.on_partial(RawByte::new(b'a', Utc::now()));

        assert_eq!(hub.subscriber_count(), 1);
        assert!(matches!(keep.try_recv(), Ok(SessionEvent::Partial(b)) if b.value == b'a'));
    }

    #[test]
    fn test_hub_forwards_overflow() {
        let mut hub = EventHub::new();
        let mut rx = hub.subscribe();
        let error = FramingError::LineTooLong {
            limit: 8,
            discarded: 8,
        };

        hub.on_framing_error(&error);

        assert_eq!(rx.try_recv().ok(), Some(SessionEvent::Overflow(error)));
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (mut sink, rx) = ChannelSink::channel();
        drop(rx);
        sink.on_record(LineRecord::new(Utc::now(), b"late\n".to_vec()));
    }
}
