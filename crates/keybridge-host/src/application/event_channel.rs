//! Event channel between the serial reader and the presentation context.
//!
//! A strict FIFO: events come out in exactly the order they went in, none
//! are dropped, and the producer is never blocked.  The queue is unbounded
//! because line arrival is rate-limited by the serial link itself.
//!
//! [`EventSender`] is not `Clone`: there is exactly one
//! producer (the reader thread) and one consumer (the presentation loop).

use keybridge_core::Event;
use thiserror::Error;
use tokio::sync::mpsc;

/// Returned by [`EventSender::send`] when the consumer is gone.
///
/// Carries the event that could not be delivered.
#[derive(Debug, Error)]
#[error("event channel closed")]
pub struct ChannelClosed(pub Event);

/// Producing half, owned by the serial reader thread.
#[derive(Debug)]
pub struct EventSender(mpsc::UnboundedSender<Event>);

/// Consuming half, owned by the presentation context.
#[derive(Debug)]
pub struct EventReceiver(mpsc::UnboundedReceiver<Event>);

/// Creates a connected sender/receiver pair.
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender(tx), EventReceiver(rx))
}

impl EventSender {
    /// Appends `event` to the queue.  Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelClosed`] if the receiver has been dropped.
    pub fn send(&self, event: Event) -> Result<(), ChannelClosed> {
        self.0.send(event).map_err(|e| ChannelClosed(e.0))
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

impl EventReceiver {
    /// Waits for the next event.  Returns `None` once the sender is dropped
    /// and the queue is empty.
    pub async fn recv(&mut self) -> Option<Event> {
        self.0.recv().await
    }

    /// Takes the next event if one is queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.0.try_recv().ok()
    }

    /// Takes every event currently queued, oldest first.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
