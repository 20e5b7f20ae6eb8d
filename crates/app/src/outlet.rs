//! Bounded, drop-on-full output channels.
//!
//! Producers are hardware callback threads, which must never wait. A push
//! onto a full outlet discards the new value and logs a warning; the
//! values already buffered are kept.

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Outcome of [`Outlet::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The buffer was full; the value was discarded.
    Dropped,
    /// The outlet is closed or its consumer went away.
    Closed,
}

/// Single-consumer output channel with a fixed capacity.
#[derive(Debug)]
pub struct Outlet<T> {
    name: &'static str,
    capacity: usize,
    sender: Mutex<Option<mpsc::Sender<T>>>,
    receiver: Mutex<Option<mpsc::Receiver<T>>>,
}

impl<T> Outlet<T> {
    /// Create an outlet holding at most `capacity` undelivered values.
    ///
    /// `name` only labels log lines.
    #[must_use]
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            name,
            capacity: capacity.max(1),
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push without waiting.
    pub fn push(&self, value: T) -> Delivery {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            tracing::debug!(outlet = self.name, "outlet closed, value discarded");
            return Delivery::Closed;
        };
        match sender.try_send(value) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    outlet = self.name,
                    capacity = self.capacity,
                    "outlet full, value dropped"
                );
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(outlet = self.name, "outlet consumer gone, value discarded");
                Delivery::Closed
            }
        }
    }

    /// Hand out the consuming end. Only the first call gets it.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<T>> {
        self.receiver.lock().take()
    }

    /// Close the outlet. Buffered values stay readable; the consumer sees
    /// the end of the stream once they are drained.
    ///
    /// Returns `false` when the outlet was already closed.
    pub fn close(&self) -> bool {
        self.sender.lock().take().is_some()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_retain_exactly_capacity_values_when_flooded() {
        let outlet = Outlet::new("alarm", 10);
        let mut rx = outlet.take_receiver().unwrap();

        let outcomes: Vec<_> = (0..25).map(|i| outlet.push(i)).collect();

        assert_eq!(outcomes.iter().filter(|d| **d == Delivery::Queued).count(), 10);
        assert_eq!(outcomes.iter().filter(|d| **d == Delivery::Dropped).count(), 15);
        let mut received = Vec::new();
        while let Ok(value) = rx.try_recv() {
            received.push(value);
        }
        assert_eq!(received, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn should_hand_out_receiver_once() {
        let outlet: Outlet<u8> = Outlet::new("event", 1);
        assert!(outlet.take_receiver().is_some());
        assert!(outlet.take_receiver().is_none());
    }

    #[tokio::test]
    async fn should_end_stream_after_buffered_values_when_closed() {
        let outlet = Outlet::new("signal", 4);
        let mut rx = outlet.take_receiver().unwrap();
        outlet.push("a");
        outlet.push("b");

        assert!(outlet.close());

        assert_eq!(rx.recv().await, Some("a"));
        assert_eq!(rx.recv().await, Some("b"));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn should_tolerate_closing_twice() {
        let outlet: Outlet<u8> = Outlet::new("status", 2);
        assert!(outlet.close());
        assert!(!outlet.close());
        assert!(outlet.is_closed());
        assert_eq!(outlet.push(1), Delivery::Closed);
    }

    #[test]
    fn should_report_closed_when_consumer_dropped() {
        let outlet = Outlet::new("temperature", 2);
        drop(outlet.take_receiver());
        assert_eq!(outlet.push(1), Delivery::Closed);
    }
}
