//! Chunk — the immutable unit of data flowing from producers to consumers.

use std::time::Instant;

use bytes::Bytes;
use rand::rngs::OsRng;
use rand::RngCore;

/// One generated unit of streamed data.
///
/// Fields are private: a chunk is never mutated after construction. It is
/// moved into the channel by its producer and owned by whichever consumer
/// removes it.
#[derive(Debug, Clone)]
pub struct Chunk {
    sequence_id: u64,
    stream_id: u32,
    payload: Bytes,
    created_at: Instant,
}

impl Chunk {
    /// Build a chunk stamped with the current instant.
    pub fn new(sequence_id: u64, stream_id: u32, payload: Bytes) -> Self {
        Self {
            sequence_id,
            stream_id,
            payload,
            created_at: Instant::now(),
        }
    }

    /// Per-stream generation attempt number, starting at 0.
    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

/// Fill a payload of `len` bytes from the OS entropy source.
///
/// If the entropy source fails the payload is empty and the caller still
/// gets a usable chunk; the failure is logged, never propagated.
pub fn random_payload(len: usize) -> Bytes {
    let mut buf = vec![0u8; len];
    match OsRng.try_fill_bytes(&mut buf) {
        Ok(()) => Bytes::from(buf),
        Err(e) => {
            tracing::warn!(error = %e, len, "entropy source failed, using empty payload");
            Bytes::new()
        }
    }
}
