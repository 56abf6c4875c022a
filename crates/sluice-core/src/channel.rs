//! Bounded channel — fixed-capacity FIFO shared by every producer and
//! consumer.
//!
//! Inserts never wait: a full channel rejects the chunk and hands it back.
//! Removal waits until a chunk is available. Capacity is checked and the
//! chunk enqueued under one lock, so occupancy can never exceed capacity
//! regardless of how many producers race.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::chunk::Chunk;

/// Returned by [`BoundedChannel::try_send`] when the chunk was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum TrySendError {
    #[error("channel full (capacity {capacity})")]
    Full { chunk: Chunk, capacity: usize },
}

impl TrySendError {
    /// Recover the rejected chunk.
    pub fn into_inner(self) -> Chunk {
        match self {
            TrySendError::Full { chunk, .. } => chunk,
        }
    }
}

#[derive(Debug)]
pub struct BoundedChannel {
    queue: Mutex<VecDeque<Chunk>>,
    capacity: usize,
    peak: AtomicUsize,
    available: Notify,
}

impl BoundedChannel {
    /// A capacity of 0 is legal: every insert is rejected.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            peak: AtomicUsize::new(0),
            available: Notify::new(),
        }
    }

    /// Non-blocking insert. Fails immediately when `capacity` chunks are queued.
    pub fn try_send(&self, chunk: Chunk) -> Result<(), TrySendError> {
        {
            let mut queue = self.queue.lock();
            if queue.len() >= self.capacity {
                return Err(TrySendError::Full {
                    chunk,
                    capacity: self.capacity,
                });
            }
            queue.push_back(chunk);
            self.peak.fetch_max(queue.len(), Ordering::Relaxed);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Non-blocking removal.
    pub fn try_recv(&self) -> Option<Chunk> {
        self.queue.lock().pop_front()
    }

    /// Wait for the oldest queued chunk.
    ///
    /// Cancel-safe: dropping the future never loses a chunk, so callers race
    /// it against a shutdown signal with `tokio::select!`.
    pub async fn recv(&self) -> Chunk {
        loop {
            if let Some(chunk) = self.try_recv() {
                return chunk;
            }
            // A notify_one issued between the check above and this await is
            // kept as a permit, so no wakeup is missed.
            self.available.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Highest occupancy observed since construction.
    pub fn peak_len(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    /// Current occupancy as a percentage (0-100). A zero-capacity channel
    /// is always reported as full.
    pub fn utilization(&self) -> u32 {
        if self.capacity == 0 {
            return 100;
        }
        ((self.len() * 100) / self.capacity).min(100) as u32
    }
}
