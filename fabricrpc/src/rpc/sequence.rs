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

//! Request sequence numbers.

use std::sync::atomic::{AtomicI64, Ordering};

/// Hands out strictly increasing, positive request sequence numbers.
///
/// Sequence numbers are unique per transport; the response to a request
/// carries the negated value.
///
/// # Examples
///
/// ```rust
/// use fabricrpc::rpc::SequenceGenerator;
///
/// let sequence = SequenceGenerator::new();
/// assert_eq!(sequence.next(), 1);
/// assert_eq!(sequence.next(), 2);
/// ```
#[derive(Debug)]
pub struct SequenceGenerator {
    next: AtomicI64,
}

impl SequenceGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicI64::new(1),
        }
    }

    /// Returns the next sequence number.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_sequence_concurrent_unique() {
        let sequence = Arc::new(SequenceGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sequence = Arc::clone(&sequence);
                std::thread::spawn(move || (0..1000).map(|_| sequence.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for seq in handle.join().unwrap() {
                assert!(seq > 0);
                assert!(seen.insert(seq));
            }
        }
        assert_eq!(seen.len(), 4000);
    }
}
