//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Arena-backed pool of fixed-size pieces.

use crate::buffer::BufferLease;
use crate::fatal::fatal;
use bytes::BytesMut;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// A pool of equally sized byte pieces carved out of one allocation.
///
/// The pool never blocks: [`acquire_one`](Self::acquire_one) returns `None`
/// when every piece is leased and leaves the backoff policy to the caller.
/// [`acquire`](Self::acquire) is the cooperative variant that yields to the
/// runtime between attempts.
///
/// Cloning a `BufferPool` yields another handle to the same pool.
///
/// # Examples
///
/// ```rust
/// use fabricrpc::buffer::BufferPool;
///
/// let pool = BufferPool::new(4, 1024);
/// assert_eq!(pool.capacity(), 4);
/// assert_eq!(pool.piece_size(), 1024);
///
/// let lease = pool.acquire_one().unwrap();
/// assert_eq!(lease.len(), 1024);
/// assert_eq!(pool.available(), 3);
/// ```
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    id: u64,
    piece_size: usize,
    n_pieces: usize,
    base: usize,
    state: Mutex<PoolState>,
    exhausted: AtomicU64,
}

struct PoolState {
    free: VecDeque<FreePiece>,
    leased: Vec<bool>,
}

struct FreePiece {
    index: usize,
    bytes: BytesMut,
}

impl BufferPool {
    /// Allocates `n_pieces * piece_size` zeroed bytes and slices them into pieces.
    ///
    /// # Panics
    ///
    /// Panics if either argument is zero or the total size overflows `usize`.
    pub fn new(n_pieces: usize, piece_size: usize) -> Self {
        assert!(n_pieces > 0, "buffer pool needs at least one piece");
        assert!(piece_size > 0, "buffer pool pieces must not be empty");
        let Some(total) = n_pieces.checked_mul(piece_size) else {
            panic!("buffer pool of {n_pieces} x {piece_size} bytes overflows usize");
        };

        let mut region = BytesMut::zeroed(total);
        let base = region.as_ptr() as usize;
        let mut free = VecDeque::with_capacity(n_pieces);
        for index in 0..n_pieces {
            free.push_back(FreePiece {
                index,
                bytes: region.split_to(piece_size),
            });
        }

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        debug!(pool = id, n_pieces, piece_size, "Buffer pool allocated");

        Self {
            inner: Arc::new(PoolInner {
                id,
                piece_size,
                n_pieces,
                base,
                state: Mutex::new(PoolState {
                    free,
                    leased: vec![false; n_pieces],
                }),
                exhausted: AtomicU64::new(0),
            }),
        }
    }

    /// Process-unique identifier of this pool.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Size in bytes of every piece.
    #[must_use]
    pub fn piece_size(&self) -> usize {
        self.inner.piece_size
    }

    /// Total number of pieces, leased or free.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.n_pieces
    }

    /// Number of pieces currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.inner.state.lock().free.len()
    }

    /// Number of acquisition attempts that found the pool empty.
    #[must_use]
    pub fn exhaustion_count(&self) -> u64 {
        self.inner.exhausted.load(Ordering::Relaxed)
    }

    /// Leases the least recently released piece, or returns `None` immediately
    /// when every piece is leased.
    pub fn acquire_one(&self) -> Option<BufferLease> {
        let mut state = self.inner.state.lock();
        match state.free.pop_front() {
            Some(piece) => {
                state.leased[piece.index] = true;
                drop(state);
                trace!(pool = self.inner.id, index = piece.index, "Piece leased");
                Some(BufferLease::new(self.clone(), piece.index, piece.bytes))
            }
            None => {
                drop(state);
                self.inner.exhausted.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Leases two pieces at once, or none.
    ///
    /// Taking both pieces under one lock keeps two callers that each need a
    /// pair from holding one piece apiece while waiting for the other.
    pub fn acquire_pair(&self) -> Option<(BufferLease, BufferLease)> {
        let mut state = self.inner.state.lock();
        if state.free.len() < 2 {
            drop(state);
            self.inner.exhausted.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        let (Some(first), Some(second)) = (state.free.pop_front(), state.free.pop_front()) else {
            return None;
        };
        state.leased[first.index] = true;
        state.leased[second.index] = true;
        drop(state);
        trace!(
            pool = self.inner.id,
            first = first.index,
            second = second.index,
            "Piece pair leased"
        );
        Some((
            BufferLease::new(self.clone(), first.index, first.bytes),
            BufferLease::new(self.clone(), second.index, second.bytes),
        ))
    }

    /// Leases a piece, yielding to the runtime until one is free.
    pub async fn acquire(&self) -> BufferLease {
        loop {
            if let Some(lease) = self.acquire_one() {
                return lease;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Returns a leased piece to this pool.
    ///
    /// The piece is zeroed before it becomes available again. Releasing a
    /// lease issued by a different pool is a protocol violation.
    pub fn release_one(&self, mut lease: BufferLease) {
        let index = lease.index();
        let Some(bytes) = lease.take_bytes() else {
            fatal!("piece {} of pool {} was already released", index, self.inner.id);
        };
        let origin = lease.origin().clone();
        drop(lease);
        self.reclaim(&origin, index, bytes);
    }

    pub(crate) fn reclaim(&self, origin: &BufferPool, index: usize, mut bytes: BytesMut) {
        let inner = &self.inner;
        if !Arc::ptr_eq(inner, &origin.inner) {
            fatal!(
                "piece {} of pool {} released into pool {}",
                index,
                origin.inner.id,
                inner.id
            );
        }
        let expected = inner.base + index * inner.piece_size;
        if index >= inner.n_pieces
            || bytes.as_ptr() as usize != expected
            || bytes.len() != inner.piece_size
        {
            fatal!(
                "piece {} ({} bytes at {:#x}) does not match pool {} geometry",
                index,
                bytes.len(),
                bytes.as_ptr() as usize,
                inner.id
            );
        }

        bytes.fill(0);

        let mut state = inner.state.lock();
        if !state.leased[index] {
            drop(state);
            fatal!("piece {} of pool {} released twice", index, inner.id);
        }
        state.leased[index] = false;
        state.free.push_back(FreePiece { index, bytes });
        drop(state);
        trace!(pool = inner.id, index, "Piece released");
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("id", &self.inner.id)
            .field("piece_size", &self.inner.piece_size)
            .field("capacity", &self.inner.n_pieces)
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_acquire_until_exhausted() {
        let pool = BufferPool::new(3, 16);
        let leases: Vec<_> = (0..3).map(|_| pool.acquire_one().unwrap()).collect();
        assert!(pool.acquire_one().is_none());
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.exhaustion_count(), 1);
        drop(leases);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn test_free_list_is_fifo() {
        let pool = BufferPool::new(3, 8);
        let a = pool.acquire_one().unwrap();
        let b = pool.acquire_one().unwrap();
        pool.release_one(b);
        pool.release_one(a);

        // Piece 2 was never leased, then 1 and 0 were released in that order.
        assert_eq!(pool.acquire_one().unwrap().index(), 2);
        let next = pool.acquire_one().unwrap();
        assert_eq!(next.index(), 1);
    }

    #[test]
    fn test_release_zeroes_piece() {
        let pool = BufferPool::new(1, 32);
        let mut lease = pool.acquire_one().unwrap();
        lease.fill(0xAB);
        pool.release_one(lease);

        let lease = pool.acquire_one().unwrap();
        assert!(lease.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_pieces_share_one_region() {
        let pool = BufferPool::new(4, 64);
        let leases: Vec<_> = (0..4).map(|_| pool.acquire_one().unwrap()).collect();
        let base = leases[0].as_ptr() as usize;
        for lease in &leases {
            assert_eq!(lease.as_ptr() as usize, base + lease.offset());
        }
    }

    #[test]
    fn test_acquire_pair() {
        let pool = BufferPool::new(3, 8);
        let (a, b) = pool.acquire_pair().unwrap();
        assert_ne!(a.index(), b.index());
        assert!(pool.acquire_pair().is_none());
        // A failed pair acquisition leaves the remaining piece free.
        assert_eq!(pool.available(), 1);
    }

    #[test]
    #[should_panic(expected = "protocol violation")]
    fn test_release_into_foreign_pool() {
        let pool = BufferPool::new(2, 16);
        let other = BufferPool::new(2, 16);
        let lease = other.acquire_one().unwrap();
        pool.release_one(lease);
    }

    #[test]
    #[should_panic(expected = "protocol violation")]
    fn test_release_into_pool_with_other_geometry() {
        let pool = BufferPool::new(2, 16);
        let other = BufferPool::new(2, 32);
        let lease = other.acquire_one().unwrap();
        pool.release_one(lease);
    }

    #[tokio::test]
    async fn test_async_acquire_waits_for_release() {
        let pool = BufferPool::new(1, 8);
        let held = pool.acquire_one().unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.index() })
        };

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!waiter.is_finished());
        pool.release_one(held);

        assert_eq!(waiter.await.unwrap(), 0);
    }
}
