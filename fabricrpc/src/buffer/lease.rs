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

//! Exclusive ownership of one pool piece.

use crate::buffer::BufferPool;
use bytes::BytesMut;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Exclusive lease of one piece of a [`BufferPool`].
///
/// A lease is identified by its pool and the piece index; the byte range it
/// covers is `offset()..offset() + len()` within the pool's region. The lease
/// dereferences to the piece's bytes and cannot be resized.
///
/// Dropping a lease returns the piece to the pool it came from. Returning it
/// explicitly through [`BufferPool::release_one`] has the same effect and also
/// checks that the lease belongs to that pool.
pub struct BufferLease {
    pool: BufferPool,
    index: usize,
    bytes: Option<BytesMut>,
}

impl BufferLease {
    pub(crate) fn new(pool: BufferPool, index: usize, bytes: BytesMut) -> Self {
        Self {
            pool,
            index,
            bytes: Some(bytes),
        }
    }

    /// Index of the leased piece within its pool.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte offset of the leased piece from the start of the pool's region.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.index * self.pool.piece_size()
    }

    /// Identifier of the pool that issued this lease.
    #[must_use]
    pub fn pool_id(&self) -> u64 {
        self.pool.id()
    }

    /// Returns the piece to the pool that issued it.
    pub fn release(self) {
        let pool = self.pool.clone();
        pool.release_one(self);
    }

    pub(crate) fn origin(&self) -> &BufferPool {
        &self.pool
    }

    pub(crate) fn take_bytes(&mut self) -> Option<BytesMut> {
        self.bytes.take()
    }
}

impl Deref for BufferLease {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes.as_deref().unwrap_or_default()
    }
}

impl DerefMut for BufferLease {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.bytes.as_deref_mut().unwrap_or_default()
    }
}

impl Drop for BufferLease {
    fn drop(&mut self) {
        if let Some(bytes) = self.bytes.take() {
            self.pool.reclaim(&self.pool, self.index, bytes);
        }
    }
}

impl fmt::Debug for BufferLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferLease")
            .field("pool", &self.pool.id())
            .field("index", &self.index)
            .field("offset", &self.offset())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_geometry() {
        let pool = BufferPool::new(4, 32);
        let first = pool.acquire_one().unwrap();
        let second = pool.acquire_one().unwrap();

        assert_eq!(first.index(), 0);
        assert_eq!(first.offset(), 0);
        assert_eq!(second.index(), 1);
        assert_eq!(second.offset(), 32);
        assert_eq!(first.len(), 32);
        assert_eq!(first.pool_id(), pool.id());
    }

    #[test]
    fn test_drop_returns_piece() {
        let pool = BufferPool::new(1, 8);
        {
            let _lease = pool.acquire_one().unwrap();
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_release_by_value() {
        let pool = BufferPool::new(1, 8);
        let lease = pool.acquire_one().unwrap();
        lease.release();
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_debug_format() {
        let pool = BufferPool::new(2, 16);
        let _first = pool.acquire_one().unwrap();
        let second = pool.acquire_one().unwrap();
        let debug = format!("{second:?}");
        assert!(debug.contains("index: 1"));
        assert!(debug.contains("offset: 16"));
    }
}
