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

//! Connection establishment and teardown over a set of endpoints.
//!
//! A [`ConnectionHandle`] references every endpoint that makes up one
//! connection (the control path and any data paths) and moves them through
//! the lifecycle together. Each phase is a predicate poll: progress every
//! endpoint until all of them satisfy the phase's condition, then apply the
//! next transition to all of them.
//!
//! ```text
//! listen / connect  ->  link up on all   -> prepare all
//!                   ->  data paths ready -> run all
//! stop + disconnect ->  link down on all -> shutdown all   (active side)
//! peer closed       ->  stopping on all  -> shutdown all   (passive side)
//! ```
//!
//! Partial establishment is not rolled back: a backend error in any phase is
//! returned to the caller with the endpoints left where they were.

use crate::backend::{Backend, BackendError, LinkState};
use crate::endpoint::{Endpoint, Side, Status};
use crate::fatal::fatal;
use crate::progress::idle;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sleep between polling rounds in which no endpoint made progress.
pub const DEFAULT_ESTABLISH_BACKOFF: Duration = Duration::from_micros(10);

/// Drives a set of endpoints through establishment and teardown.
///
/// # Examples
///
/// ```rust
/// use fabricrpc::backend::MemoryBackend;
/// use fabricrpc::connection::ConnectionHandle;
/// use fabricrpc::endpoint::{Endpoint, PathRole, Side};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), fabricrpc::backend::BackendError> {
/// let (server_backend, client_backend) = MemoryBackend::pair();
///
/// let mut server = ConnectionHandle::new(Side::Server);
/// server.associate(Arc::new(Endpoint::new(PathRole::Control, server_backend)));
/// let mut client = ConnectionHandle::new(Side::Client);
/// client.associate(Arc::new(Endpoint::new(PathRole::Control, client_backend)));
///
/// let (accepted, connected) = tokio::join!(server.listen_and_accept(), client.connect());
/// accepted?;
/// connected?;
///
/// let (closed, disconnected) = tokio::join!(server.wait_for_disconnect(), client.disconnect());
/// closed?;
/// disconnected?;
/// assert!(server.endpoints().iter().all(|e| e.exited()));
/// # Ok(())
/// # }
/// ```
pub struct ConnectionHandle<B: Backend> {
    side: Side,
    endpoints: Vec<Arc<Endpoint<B>>>,
    backoff: Duration,
}

impl<B: Backend> ConnectionHandle<B> {
    /// Creates a handle with no endpoints.
    #[must_use]
    pub fn new(side: Side) -> Self {
        Self {
            side,
            endpoints: Vec::new(),
            backoff: DEFAULT_ESTABLISH_BACKOFF,
        }
    }

    /// Sets the sleep between empty polling rounds.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Side this handle establishes.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Adds an endpoint to the set driven by this handle.
    pub fn associate(&mut self, endpoint: Arc<Endpoint<B>>) -> &mut Self {
        if self.endpoints.iter().any(|known| Arc::ptr_eq(known, &endpoint)) {
            warn!(endpoint = endpoint.id(), "Endpoint already associated, ignoring");
            return self;
        }
        debug!(
            side = %self.side,
            endpoint = endpoint.id(),
            role = %endpoint.role(),
            "Endpoint associated"
        );
        self.endpoints.push(endpoint);
        self
    }

    /// Endpoints driven by this handle, in association order.
    #[must_use]
    pub fn endpoints(&self) -> &[Arc<Endpoint<B>>] {
        &self.endpoints
    }

    /// Progresses every endpoint until all of them satisfy `satisfied`.
    pub async fn progress_all_until<F>(&self, mut satisfied: F) -> Result<(), BackendError>
    where
        F: FnMut(&Endpoint<B>) -> bool,
    {
        loop {
            if self.endpoints.iter().all(|endpoint| satisfied(endpoint.as_ref())) {
                return Ok(());
            }
            let mut progressed = false;
            for endpoint in &self.endpoints {
                progressed |= endpoint.progress()?;
            }
            if progressed {
                tokio::task::yield_now().await;
            } else {
                idle(self.backoff).await;
            }
        }
    }

    /// Passive side: waits for the peer on every endpoint, then brings them
    /// all to `Running`.
    pub async fn listen_and_accept(&self) -> Result<(), BackendError> {
        self.expect_side(Side::Server, "listen_and_accept");
        for endpoint in &self.endpoints {
            endpoint.listen()?;
        }
        self.progress_all_until(|endpoint| endpoint.link() == LinkState::Up)
            .await?;
        self.start().await
    }

    /// Active side: connects every endpoint, then brings them all to `Running`.
    pub async fn connect(&self) -> Result<(), BackendError> {
        self.expect_side(Side::Client, "connect");
        for endpoint in &self.endpoints {
            endpoint.connect()?;
        }
        self.progress_all_until(|endpoint| endpoint.link() == LinkState::Up)
            .await?;
        self.start().await
    }

    async fn start(&self) -> Result<(), BackendError> {
        for endpoint in &self.endpoints {
            endpoint.prepare()?;
        }
        self.progress_all_until(Endpoint::data_path_ready).await?;
        for endpoint in &self.endpoints {
            endpoint.run()?;
        }
        info!(
            side = %self.side,
            endpoints = self.endpoints.len(),
            "Connection established"
        );
        Ok(())
    }

    /// Passive side teardown: waits until the peer has closed every endpoint,
    /// then shuts them all down.
    pub async fn wait_for_disconnect(&self) -> Result<(), BackendError> {
        self.progress_all_until(|endpoint| endpoint.status() >= Status::Stopping)
            .await?;
        self.finish()
    }

    /// Active side teardown: stops and disconnects every endpoint, waits for
    /// the links to go down, then shuts them all down.
    pub async fn disconnect(&self) -> Result<(), BackendError> {
        for endpoint in &self.endpoints {
            endpoint.stop()?;
            endpoint.disconnect()?;
        }
        self.progress_all_until(|endpoint| endpoint.link() != LinkState::Up)
            .await?;
        self.finish()
    }

    fn finish(&self) -> Result<(), BackendError> {
        for endpoint in &self.endpoints {
            if endpoint.stopping() {
                endpoint.shutdown()?;
            }
        }
        info!(side = %self.side, "Connection torn down");
        Ok(())
    }

    fn expect_side(&self, expected: Side, operation: &str) {
        if self.side != expected {
            fatal!(
                "{} is a {} operation but this handle is the {} side",
                operation,
                expected,
                self.side
            );
        }
    }
}

impl<B: Backend> fmt::Debug for ConnectionHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("side", &self.side)
            .field("endpoints", &self.endpoints)
            .field("backoff", &self.backoff)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::endpoint::PathRole;

    fn handles(paths: &[PathRole]) -> (ConnectionHandle<MemoryBackend>, ConnectionHandle<MemoryBackend>) {
        let mut server = ConnectionHandle::new(Side::Server);
        let mut client = ConnectionHandle::new(Side::Client);
        for &role in paths {
            let (a, b) = MemoryBackend::pair();
            server.associate(Arc::new(Endpoint::new(role, a)));
            client.associate(Arc::new(Endpoint::new(role, b)));
        }
        (server, client)
    }

    #[test]
    fn test_associate_ignores_repeated_endpoint() {
        let (a, _b) = MemoryBackend::pair();
        let endpoint = Arc::new(Endpoint::new(PathRole::Control, a));
        let mut handle = ConnectionHandle::new(Side::Client);
        handle.associate(Arc::clone(&endpoint)).associate(endpoint);
        assert_eq!(handle.endpoints().len(), 1);
    }

    #[tokio::test]
    async fn test_establish_and_teardown_control_and_data_paths() {
        let (server, client) = handles(&[PathRole::Control, PathRole::Data]);

        let (accepted, connected) = tokio::join!(server.listen_and_accept(), client.connect());
        accepted.unwrap();
        connected.unwrap();
        assert!(server.endpoints().iter().all(|e| e.running()));
        assert!(client.endpoints().iter().all(|e| e.running()));

        let (closed, disconnected) =
            tokio::join!(server.wait_for_disconnect(), client.disconnect());
        closed.unwrap();
        disconnected.unwrap();
        assert!(server.endpoints().iter().all(|e| e.exited()));
        assert!(client.endpoints().iter().all(|e| e.exited()));
    }

    #[tokio::test]
    async fn test_teardown_resolves_pending_receives() {
        let (server, client) = handles(&[PathRole::Control]);
        let (accepted, connected) = tokio::join!(server.listen_and_accept(), client.connect());
        accepted.unwrap();
        connected.unwrap();

        let pool = crate::buffer::BufferPool::new(1, 16);
        let recv = server.endpoints()[0]
            .post_recv(pool.acquire_one().unwrap())
            .unwrap();

        let (closed, disconnected) =
            tokio::join!(server.wait_for_disconnect(), client.disconnect());
        closed.unwrap();
        disconnected.unwrap();
        assert!(recv.await.is_closed());
    }

    #[tokio::test]
    #[should_panic(expected = "listen_and_accept is a Server operation")]
    async fn test_side_mismatch_is_fatal() {
        let (_, client) = handles(&[PathRole::Control]);
        let _ = client.listen_and_accept().await;
    }

    #[test]
    fn test_default_backoff() {
        let handle = ConnectionHandle::<MemoryBackend>::new(Side::Client);
        assert_eq!(handle.backoff, DEFAULT_ESTABLISH_BACKOFF);
        let handle = handle.with_backoff(Duration::from_micros(50));
        assert_eq!(handle.backoff, Duration::from_micros(50));
    }
}
