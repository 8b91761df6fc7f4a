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

//! The completion/progress loop.
//!
//! Completions are not pushed by backends; they are pulled by repeatedly
//! calling [`Endpoint::progress`]. The loop here does that until a predicate
//! holds, yielding to sibling tasks after every productive round and backing
//! off for a short, fixed interval after an empty one.

use crate::backend::{Backend, BackendError};
use crate::endpoint::Endpoint;
use std::time::Duration;

/// Drives `endpoint` until `until` returns `true`.
///
/// The predicate is checked before every round. A backend error ends the
/// loop and is returned as is.
///
/// # Examples
///
/// ```rust
/// use fabricrpc::backend::{LinkState, MemoryBackend};
/// use fabricrpc::endpoint::{Endpoint, PathRole};
/// use fabricrpc::progress::drive_until;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), fabricrpc::backend::BackendError> {
/// let (server, client) = MemoryBackend::pair();
/// let server = Endpoint::new(PathRole::Control, server);
/// let client = Endpoint::new(PathRole::Control, client);
///
/// server.listen()?;
/// client.connect()?;
/// drive_until(&server, Duration::from_micros(10), || server.link() == LinkState::Up).await?;
/// drive_until(&client, Duration::from_micros(10), || client.link() == LinkState::Up).await?;
/// # Ok(())
/// # }
/// ```
pub async fn drive_until<B, F>(
    endpoint: &Endpoint<B>,
    backoff: Duration,
    mut until: F,
) -> Result<(), BackendError>
where
    B: Backend,
    F: FnMut() -> bool,
{
    while !until() {
        if endpoint.progress()? {
            tokio::task::yield_now().await;
        } else {
            idle(backoff).await;
        }
    }
    Ok(())
}

/// Waits out one empty polling round.
///
/// A zero backoff yields to the scheduler instead of sleeping.
pub async fn idle(backoff: Duration) {
    if backoff.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::buffer::BufferPool;
    use crate::endpoint::PathRole;

    #[tokio::test]
    async fn test_drive_until_resolves_receive() {
        let (a, b) = MemoryBackend::pair();
        let server = Endpoint::new(PathRole::Control, a);
        let client = Endpoint::new(PathRole::Control, b);
        server.listen().unwrap();
        client.connect().unwrap();
        drive_until(&server, Duration::ZERO, || server.link().to_string() == "Up")
            .await
            .unwrap();
        drive_until(&client, Duration::ZERO, || client.link().to_string() == "Up")
            .await
            .unwrap();
        for endpoint in [&server, &client] {
            endpoint.prepare().unwrap();
            endpoint.run().unwrap();
        }

        let pool = BufferPool::new(2, 16);
        let recv = server.post_recv(pool.acquire_one().unwrap()).unwrap();
        let mut lease = pool.acquire_one().unwrap();
        lease[..2].copy_from_slice(b"hi");
        let send = client.post_send(lease, 2).unwrap();

        drive_until(&client, Duration::from_micros(10), || client.pending() == 0)
            .await
            .unwrap();
        drive_until(&server, Duration::from_micros(10), || server.pending() == 0)
            .await
            .unwrap();

        assert_eq!(send.await.transferred, 2);
        assert_eq!(recv.await.bytes(), b"hi");
    }

    #[tokio::test]
    async fn test_satisfied_predicate_returns_immediately() {
        let (a, _b) = MemoryBackend::pair();
        let endpoint = Endpoint::new(PathRole::Data, a);
        drive_until(&endpoint, Duration::from_secs(60), || true)
            .await
            .unwrap();
    }
}
