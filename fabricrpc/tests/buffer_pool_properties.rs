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

//! Property tests for buffer pool leasing.
//!
//! Under any interleaving of acquisitions and releases:
//! - no piece is leased twice at the same time
//! - free and leased pieces always add up to the capacity
//! - a piece is zeroed before it is leased again

use fabricrpc::buffer::{BufferLease, BufferPool};
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum Action {
    Acquire,
    AcquirePair,
    Release(usize),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => Just(Action::Acquire),
        1 => Just(Action::AcquirePair),
        3 => any::<usize>().prop_map(Action::Release),
    ]
}

fn check_lease(lease: &mut BufferLease, live: &mut HashSet<usize>, piece_size: usize) {
    assert_eq!(lease.len(), piece_size);
    assert_eq!(lease.offset(), lease.index() * piece_size);
    assert!(lease.iter().all(|byte| *byte == 0), "piece {} was not zeroed", lease.index());
    assert!(live.insert(lease.index()), "piece {} leased twice", lease.index());
    lease.fill(0xA5);
}

proptest! {
    #[test]
    fn test_leases_are_exclusive(
        n_pieces in 1usize..8,
        piece_size in 1usize..64,
        actions in prop::collection::vec(action(), 0..64),
    ) {
        let pool = BufferPool::new(n_pieces, piece_size);
        let mut leases: Vec<BufferLease> = Vec::new();
        let mut live = HashSet::new();

        for action in actions {
            match action {
                Action::Acquire => match pool.acquire_one() {
                    Some(mut lease) => {
                        check_lease(&mut lease, &mut live, piece_size);
                        leases.push(lease);
                    }
                    None => prop_assert_eq!(leases.len(), n_pieces),
                },
                Action::AcquirePair => match pool.acquire_pair() {
                    Some((mut first, mut second)) => {
                        check_lease(&mut first, &mut live, piece_size);
                        check_lease(&mut second, &mut live, piece_size);
                        leases.push(first);
                        leases.push(second);
                    }
                    None => prop_assert!(n_pieces - leases.len() < 2),
                },
                Action::Release(pick) if !leases.is_empty() => {
                    let lease = leases.swap_remove(pick % leases.len());
                    live.remove(&lease.index());
                    pool.release_one(lease);
                }
                Action::Release(_) => {}
            }
            prop_assert_eq!(pool.available() + leases.len(), pool.capacity());
            prop_assert_eq!(live.len(), leases.len());
        }

        drop(leases);
        prop_assert_eq!(pool.available(), n_pieces);
    }
}

#[test]
#[should_panic(expected = "released into pool")]
fn test_release_into_foreign_pool() {
    let first = BufferPool::new(1, 8);
    let second = BufferPool::new(1, 8);
    let lease = first.acquire_one().unwrap();
    second.release_one(lease);
}
