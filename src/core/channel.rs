//! # Bounded Channel
//!
//! A fixed-capacity FIFO queue shared between threads. It is the only handoff
//! mechanism between the main thread and the background workers: mesh build
//! requests go in one channel, finished meshes come back through another, and the
//! collapse worker follows the same pattern.
//!
//! ## Semantics
//! - `put` blocks while the channel is full; this is the only backpressure
//! - `await_item` blocks while the channel is empty and returns the oldest item
//! - `size` is advisory and may be stale by the time the caller reads it
//! - `clear` drops everything currently queued without touching blocked producers
//!   (they simply find free slots afterwards)
//!
//! The channel owns both of its endpoints, so it can never be disconnected while a
//! caller holds a reference to it. Wrap it in an `Arc` to share it between threads.
//!
//! A producer must never `put` into a channel that only it drains, or it can block
//! on itself forever.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};

/// Fixed-capacity blocking queue. See the module documentation.
#[derive(Debug)]
pub struct Channel<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    capacity: usize,
}

impl<T> Channel<T> {
    /// Creates an empty channel able to hold `capacity` items.
    ///
    /// A capacity of zero is raised to one; a zero-sized bounded channel would turn
    /// every `put` into a rendezvous, which none of the call sites expect.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Channel {
            sender,
            receiver,
            capacity,
        }
    }

    /// Appends `item`, blocking the calling thread while the channel is full.
    pub fn put(&self, item: T) {
        // Both endpoints live in `self`, so the send cannot observe a disconnect.
        let _ = self.sender.send(item);
    }

    /// Appends `item` if there is room, otherwise hands it back untouched.
    pub fn try_put(&self, item: T) -> Result<(), T> {
        match self.sender.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(item)) | Err(TrySendError::Disconnected(item)) => Err(item),
        }
    }

    /// Removes and returns the oldest item, blocking while the channel is empty.
    ///
    /// Returns `None` only if the channel has been torn down underneath the caller,
    /// which cannot happen while `self` is alive; workers treat it as a stop signal.
    pub fn await_item(&self) -> Option<T> {
        self.receiver.recv().ok()
    }

    /// Removes and returns the oldest item without blocking.
    pub fn try_take(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Removes every item that is available right now, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Current number of queued items. Advisory under concurrent access.
    pub fn size(&self) -> usize {
        self.receiver.len()
    }

    /// Maximum number of items the channel holds before `put` blocks.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops everything currently queued and returns how many items were removed.
    pub fn clear(&self) -> usize {
        self.receiver.try_iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn items_come_out_in_fifo_order() {
        let channel = Channel::new(4);
        channel.put(1);
        channel.put(2);
        channel.put(3);

        assert_eq!(channel.size(), 3);
        assert_eq!(channel.await_item(), Some(1));
        assert_eq!(channel.await_item(), Some(2));
        assert_eq!(channel.try_take(), Some(3));
        assert_eq!(channel.try_take(), None);
    }

    #[test]
    fn try_put_hands_back_the_item_when_full() {
        let channel = Channel::new(1);
        assert!(channel.try_put("a").is_ok());
        assert_eq!(channel.try_put("b"), Err("b"));
        assert_eq!(channel.capacity(), 1);
    }

    #[test]
    fn clear_reports_removed_items_and_frees_capacity() {
        let channel = Channel::new(2);
        channel.put(10);
        channel.put(20);

        assert_eq!(channel.clear(), 2);
        assert_eq!(channel.size(), 0);
        assert!(channel.try_put(30).is_ok());
    }

    #[test]
    fn put_blocks_until_a_consumer_makes_room() {
        let channel = Arc::new(Channel::new(1));
        channel.put(0);

        let producer = {
            let channel = channel.clone();
            thread::spawn(move || {
                for i in 1..=16 {
                    channel.put(i);
                }
            })
        };

        let received: Vec<i32> = (0..=16).filter_map(|_| channel.await_item()).collect();
        producer.join().unwrap();

        assert_eq!(received, (0..=16).collect::<Vec<_>>());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let channel = Channel::new(0);
        assert!(channel.try_put(()).is_ok());
        assert_eq!(channel.capacity(), 1);
    }
}
