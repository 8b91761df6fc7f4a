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

//! The backend-independent endpoint state machine.

use crate::backend::{Backend, BackendError, BackendKind, LinkState};
use crate::buffer::BufferLease;
use crate::endpoint::context::{Completion, OpContext, OpFuture, OpRegistry};
use crate::endpoint::status::StatusCell;
use crate::endpoint::{Op, PathRole, Status};
use crate::fatal::fatal;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

static NEXT_ENDPOINT_ID: AtomicU64 = AtomicU64::new(1);

/// One side of one logical connection, driven over a [`Backend`].
///
/// The endpoint walks `Idle -> Ready -> Running -> Stopping -> Exited`.
/// Every transition checks its precondition before touching the backend; an
/// out-of-order transition is a protocol violation and aborts.
///
/// Operations are posted with [`post_send`](Self::post_send) and
/// [`post_recv`](Self::post_recv) and resolve when [`progress`](Self::progress)
/// observes their completion. Stopping the endpoint resolves every queued
/// operation with zero bytes, so nothing stays pending across teardown.
///
/// The endpoint lock is held only for the duration of one call and never
/// across an await point.
///
/// # Examples
///
/// ```rust
/// use fabricrpc::backend::MemoryBackend;
/// use fabricrpc::endpoint::{Endpoint, PathRole, Status};
///
/// # fn example() -> Result<(), fabricrpc::backend::BackendError> {
/// let (backend, _peer) = MemoryBackend::pair();
/// let endpoint = Endpoint::new(PathRole::Control, backend);
/// assert_eq!(endpoint.status(), Status::Idle);
///
/// endpoint.prepare()?;
/// endpoint.run()?;
/// endpoint.stop()?;
/// endpoint.stop()?; // idempotent
/// endpoint.shutdown()?;
/// assert!(endpoint.exited());
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct Endpoint<B: Backend> {
    id: u64,
    role: PathRole,
    kind: BackendKind,
    status: StatusCell,
    inner: Mutex<Inner<B>>,
}

struct Inner<B> {
    backend: B,
    ops: OpRegistry,
}

impl<B: Backend> Endpoint<B> {
    /// Creates an `Idle` endpoint owning `backend`.
    pub fn new(role: PathRole, backend: B) -> Self {
        let id = NEXT_ENDPOINT_ID.fetch_add(1, Ordering::Relaxed);
        let kind = backend.kind();
        debug!(endpoint = id, role = %role, backend = %kind, "Endpoint created");
        Self {
            id,
            role,
            kind,
            status: StatusCell::new(),
            inner: Mutex::new(Inner {
                backend,
                ops: OpRegistry::new(),
            }),
        }
    }

    /// Process-unique identifier used in logs.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Path this endpoint serves.
    #[must_use]
    pub fn role(&self) -> PathRole {
        self.role
    }

    /// Backend substrate.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status.load()
    }

    /// Returns `true` before [`prepare`](Self::prepare).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fabricrpc::backend::MemoryBackend;
    /// use fabricrpc::endpoint::{Endpoint, PathRole};
    ///
    /// let (backend, _peer) = MemoryBackend::pair();
    /// let endpoint = Endpoint::new(PathRole::Control, backend);
    /// assert!(endpoint.idle());
    /// endpoint.prepare().unwrap();
    /// assert!(endpoint.ready() && !endpoint.idle());
    /// ```
    #[must_use]
    pub fn idle(&self) -> bool {
        self.status() == Status::Idle
    }

    /// Returns `true` between [`prepare`](Self::prepare) and [`run`](Self::run).
    #[must_use]
    pub fn ready(&self) -> bool {
        self.status() == Status::Ready
    }

    /// Returns `true` while operations may be posted.
    #[must_use]
    pub fn running(&self) -> bool {
        self.status() == Status::Running
    }

    /// Returns `true` once stopped, locally or by the peer, until shut down.
    #[must_use]
    pub fn stopping(&self) -> bool {
        self.status() == Status::Stopping
    }

    /// Returns `true` after [`shutdown`](Self::shutdown).
    #[must_use]
    pub fn exited(&self) -> bool {
        self.status() == Status::Exited
    }

    /// Number of operations still pending.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.lock().ops.len()
    }

    /// `Idle -> Ready`: sets up backend resources.
    pub fn prepare(&self) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        self.expect_status(Status::Idle, Status::Ready);
        inner.backend.prepare()?;
        self.set_status(Status::Ready);
        Ok(())
    }

    /// `Ready -> Running`: operations may be posted afterwards.
    pub fn run(&self) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        self.expect_status(Status::Ready, Status::Running);
        inner.backend.run()?;
        self.set_status(Status::Running);
        Ok(())
    }

    /// `Running -> Stopping`: resolves every queued operation with zero bytes.
    ///
    /// Calling `stop` again once the endpoint is stopping or exited does
    /// nothing. Calling it before the endpoint ran is a protocol violation.
    pub fn stop(&self) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        match self.status() {
            Status::Running => self.stop_locked(&mut inner),
            Status::Stopping | Status::Exited => {
                debug!(endpoint = self.id, status = %self.status(), "Endpoint already stopped");
                Ok(())
            }
            status => fatal!(
                "endpoint {} cannot stop from {}, it never ran",
                self.id,
                status
            ),
        }
    }

    fn stop_locked(&self, inner: &mut Inner<B>) -> Result<(), BackendError> {
        self.set_status(Status::Stopping);
        let stopped = inner.backend.stop();
        let resolved = inner.ops.resolve_all(0);
        if resolved > 0 {
            debug!(endpoint = self.id, resolved, "Queued operations resolved on stop");
        }
        stopped
    }

    /// `Stopping -> Exited`: releases backend resources.
    pub fn shutdown(&self) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        self.expect_status(Status::Stopping, Status::Exited);
        let result = inner.backend.shutdown();
        inner.ops.resolve_all(0);
        self.set_status(Status::Exited);
        result
    }

    /// Posts a send of the first `len` bytes of `lease`.
    ///
    /// On a stopped endpoint the returned future resolves immediately with
    /// zero bytes and hands the lease back.
    pub fn post_send(&self, lease: BufferLease, len: usize) -> Result<OpFuture, BackendError> {
        self.post(Op::Send, lease, len)
    }

    /// Posts a receive into `lease`.
    ///
    /// Receives resolve in the order they were posted.
    pub fn post_recv(&self, lease: BufferLease) -> Result<OpFuture, BackendError> {
        let len = lease.len();
        self.post(Op::Recv, lease, len)
    }

    fn post(&self, op: Op, lease: BufferLease, len: usize) -> Result<OpFuture, BackendError> {
        let mut inner = self.inner.lock();
        match self.status() {
            Status::Running => {}
            Status::Stopping | Status::Exited => {
                return Ok(OpFuture::resolved(Completion {
                    transferred: 0,
                    lease: Some(lease),
                }));
            }
            status => fatal!("endpoint {} cannot post a {} while {}", self.id, op, status),
        }

        let (ctx, future) = OpContext::new(op, lease, len);
        let token = inner.ops.insert(ctx);
        let posted = match op {
            Op::Send => inner.backend.post_send(token),
            Op::Recv => inner.backend.post_recv(token),
        };
        if let Err(error) = posted {
            // Synchronous failure path: the operation never reached the
            // backend, so nothing else will resolve it.
            inner.ops.cancel(token);
            return Err(error);
        }
        Ok(future)
    }

    /// Drains available backend events and reports whether any were consumed.
    ///
    /// A zero-length receive, or any other sign that the peer closed the
    /// connection, moves a running endpoint to `Stopping`. Repeated closure
    /// signals are absorbed.
    pub fn progress(&self) -> Result<bool, BackendError> {
        let mut inner = self.inner.lock();
        if self.status() == Status::Exited {
            return Ok(false);
        }
        let Inner { backend, ops } = &mut *inner;
        let progressed = backend.progress(ops)?;
        if inner.ops.peer_closed() && self.status() == Status::Running {
            info!(endpoint = self.id, role = %self.role, "Peer closed the connection");
            self.stop_locked(&mut inner)?;
        }
        Ok(progressed)
    }

    /// Starts waiting for a peer.
    pub fn listen(&self) -> Result<(), BackendError> {
        self.inner.lock().backend.listen()
    }

    /// Starts connecting to the peer.
    pub fn connect(&self) -> Result<(), BackendError> {
        self.inner.lock().backend.connect()
    }

    /// Closes the link to the peer.
    pub fn disconnect(&self) -> Result<(), BackendError> {
        self.inner.lock().backend.disconnect()
    }

    /// Current link state of the backend.
    #[must_use]
    pub fn link(&self) -> LinkState {
        self.inner.lock().backend.link()
    }

    /// Whether the backend's data-path channels are usable.
    #[must_use]
    pub fn data_path_ready(&self) -> bool {
        self.inner.lock().backend.data_path_ready()
    }

    fn expect_status(&self, expected: Status, target: Status) {
        let current = self.status();
        if current != expected {
            fatal!(
                "endpoint {} cannot move from {} to {}",
                self.id,
                current,
                target
            );
        }
    }

    fn set_status(&self, status: Status) {
        let previous = self.status();
        self.status.store(status);
        info!(
            endpoint = self.id,
            role = %self.role,
            "Endpoint status change: {} -> {}",
            previous,
            status
        );
    }
}

impl<B: Backend> fmt::Debug for Endpoint<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("kind", &self.kind)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
