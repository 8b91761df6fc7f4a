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

//! Fixed-size buffer pool backing every in-flight operation.
//!
//! A [`BufferPool`] owns one contiguous region allocated up front and sliced
//! into `n_pieces` pieces of `piece_size` bytes. Pieces are handed out as
//! [`BufferLease`]s, each of which is owned by exactly one in-flight operation
//! until it is released. A piece is zeroed before it becomes available again,
//! so no lessee ever observes bytes written by a previous one.
//!
//! # Examples
//!
//! ```rust
//! use fabricrpc::buffer::BufferPool;
//!
//! let pool = BufferPool::new(2, 64);
//!
//! let mut first = pool.acquire_one().expect("pool has a free piece");
//! first[..5].copy_from_slice(b"hello");
//! let second = pool.acquire_one().expect("pool has a free piece");
//!
//! // Exhausted pools never block; callers decide how to back off.
//! assert!(pool.acquire_one().is_none());
//!
//! pool.release_one(first);
//! pool.release_one(second);
//! assert_eq!(pool.available(), 2);
//! ```

mod lease;
mod pool;

pub use lease::BufferLease;
pub use pool::BufferPool;
