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

//! The RPC transport: calls, the serve loop and teardown.

use crate::backend::Backend;
use crate::buffer::{BufferLease, BufferPool};
use crate::config::TransportConfig;
use crate::connection::ConnectionHandle;
use crate::endpoint::{Endpoint, OpFuture, PathRole, Side};
use crate::error::FabricError;
use crate::fatal::fatal;
use crate::observability::{HexDump, TransportMetrics};
use crate::rpc::{
    FrameHeader, HEADER_LEN, HandlerSet, OutstandingRpcs, ResponseFuture, Rpc, RpcError, RpcSet,
    SequenceGenerator,
};
use crate::serialization::{PostcardSerializer, Serializer};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, trace, warn};

/// State shared by a transport, its response tasks, workers and guard.
pub(crate) struct Shared<B: Backend, S: Serializer> {
    pub(crate) config: TransportConfig,
    pub(crate) connection: ConnectionHandle<B>,
    pub(crate) control: Arc<Endpoint<B>>,
    pub(crate) pool: BufferPool,
    pub(crate) outstanding: OutstandingRpcs,
    pub(crate) sequence: SequenceGenerator,
    pub(crate) serializer: Arc<S>,
    pub(crate) active_workers: Arc<AtomicUsize>,
    pub(crate) metrics: TransportMetrics,
    responders: Mutex<JoinSet<()>>,
}

impl<B: Backend, S: Serializer> Shared<B, S> {
    pub(crate) fn drain_outstanding(&self) -> usize {
        let drained = self.outstanding.drain();
        if drained > 0 {
            self.metrics.record_calls_drained(drained);
            debug!(drained, "Outstanding calls resolved as closed");
        }
        drained
    }

    /// Stops and disconnects every endpoint so the peer observes closure,
    /// then resolves outstanding calls as closed.
    pub(crate) fn sever(&self) {
        for endpoint in self.connection.endpoints() {
            if let Err(error) = endpoint.stop() {
                warn!(endpoint = endpoint.id(), %error, "Stopping endpoint failed");
            }
            if let Err(error) = endpoint.disconnect() {
                warn!(endpoint = endpoint.id(), %error, "Disconnecting endpoint failed");
            }
        }
        self.drain_outstanding();
    }

    /// Collects finished response tasks and returns the first one that
    /// panicked.
    pub(crate) fn reap_responders(&self) -> Option<JoinError> {
        let mut responders = self.responders.lock();
        while let Some(joined) = responders.try_join_next() {
            match joined {
                Ok(()) => {}
                Err(join_error) if join_error.is_panic() => return Some(join_error),
                Err(join_error) => trace!(error = %join_error, "Response task cancelled"),
            }
        }
        None
    }

    async fn acquire_one(&self) -> BufferLease {
        loop {
            if let Some(lease) = self.pool.acquire_one() {
                return lease;
            }
            self.metrics.record_pool_exhausted();
            tokio::task::yield_now().await;
        }
    }

    async fn acquire_pair(&self) -> (BufferLease, BufferLease) {
        loop {
            if let Some(pair) = self.pool.acquire_pair() {
                return pair;
            }
            self.metrics.record_pool_exhausted();
            tokio::task::yield_now().await;
        }
    }

    /// Writes a full frame into `frame` and returns its length.
    fn encode<T>(&self, header: FrameHeader, value: &T, frame: &mut [u8]) -> Result<usize, RpcError>
    where
        T: serde::Serialize + ?Sized,
    {
        header.encode(frame)?;
        match self.serializer.serialize_into(value, &mut frame[HEADER_LEN..]) {
            Ok(written) => Ok(HEADER_LEN + written),
            Err(e) if e.is_buffer_too_small() => Err(RpcError::MessageTooLarge {
                size: HEADER_LEN + self.serializer.serialize(value)?.len(),
                capacity: frame.len(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn release(&self, lease: Option<BufferLease>) {
        if let Some(lease) = lease {
            self.pool.release_one(lease);
        }
    }
}

impl<B: Backend, S: Serializer> Drop for Shared<B, S> {
    fn drop(&mut self) {
        if !self.outstanding.is_empty() {
            warn!(
                outstanding = self.outstanding.len(),
                "Transport dropped with calls outstanding"
            );
            self.drain_outstanding();
        }
    }
}

/// Counts a serve worker as active for as long as it lives.
struct WorkerSlot(Arc<AtomicUsize>);

impl WorkerSlot {
    fn enter(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(active))
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Correlated RPC over one established connection.
///
/// `R` is the set of RPCs this side may [`call`](Self::call); calling
/// anything else is a protocol violation. `S` encodes payloads and must match
/// the peer's.
///
/// A transport does not drive its endpoints by itself: calls and the serve
/// loop only make progress while a [`TransportGuard`](crate::rpc::TransportGuard)
/// is attached.
///
/// # Examples
///
/// ```rust
/// use fabricrpc::backend::MemoryBackend;
/// use fabricrpc::config::TransportConfig;
/// use fabricrpc::endpoint::Side;
/// use fabricrpc::rpc::{RpcHandler, RpcTransport, TransportGuard};
/// use fabricrpc::Rpc;
///
/// #[derive(Rpc)]
/// #[rpc(name = "add_one", request = u32, response = u32)]
/// struct AddOne;
///
/// impl RpcHandler for AddOne {
///     fn handle(&self, request: u32) -> u32 {
///         request + 1
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (server_backend, client_backend) = MemoryBackend::pair();
/// let (server, client) = tokio::try_join!(
///     RpcTransport::<_, ()>::establish(TransportConfig::new(Side::Server), server_backend),
///     RpcTransport::<_, (AddOne,)>::establish(TransportConfig::new(Side::Client), client_backend),
/// )?;
///
/// let server_side = async {
///     let guard = TransportGuard::attach(&server);
///     server.serve((AddOne,)).await?;
///     guard.detach().await?;
///     server.close().await
/// };
/// let client_side = async {
///     let guard = TransportGuard::attach(&client);
///     let answer = client.call::<AddOne>(&41).await?.await?;
///     assert_eq!(answer, 42);
///     guard.detach().await?;
///     client.close().await
/// };
/// let (served, called) = tokio::join!(server_side, client_side);
/// served?;
/// called?;
/// # Ok(())
/// # }
/// ```
pub struct RpcTransport<B: Backend, R: RpcSet, S: Serializer = PostcardSerializer> {
    shared: Arc<Shared<B, S>>,
    _calls: PhantomData<fn() -> R>,
}

impl<B: Backend, R: RpcSet, S: Serializer + Default> RpcTransport<B, R, S> {
    /// Establishes a transport over a single control endpoint.
    ///
    /// The server side listens and accepts, the client side connects. Either
    /// way this returns once the endpoint is running.
    pub async fn establish(config: TransportConfig, backend: B) -> Result<Self, FabricError> {
        Self::establish_with(config, backend, Vec::new(), S::default()).await
    }
}

impl<B: Backend, R: RpcSet, S: Serializer> RpcTransport<B, R, S> {
    /// Establishes a transport over a control endpoint plus data paths.
    ///
    /// Data path endpoints are brought up and torn down with the control
    /// endpoint; RPC frames travel only on the control path.
    pub async fn establish_with(
        config: TransportConfig,
        control: B,
        data: Vec<B>,
        serializer: S,
    ) -> Result<Self, FabricError> {
        config.validate()?;

        let control = Arc::new(Endpoint::new(PathRole::Control, control));
        let mut connection = ConnectionHandle::new(config.side).with_backoff(config.establish_backoff);
        connection.associate(Arc::clone(&control));
        for backend in data {
            connection.associate(Arc::new(Endpoint::new(PathRole::Data, backend)));
        }

        if config.side.is_passive() {
            connection.listen_and_accept().await?;
        } else {
            connection.connect().await?;
        }

        let pool = BufferPool::new(config.pool_pieces(), config.max_rpc_msg_size);
        info!(
            side = %config.side,
            backend = %control.kind(),
            serializer = serializer.name(),
            pieces = pool.capacity(),
            piece_size = pool.piece_size(),
            callable = ?R::names(),
            "RPC transport established"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                connection,
                control,
                pool,
                outstanding: OutstandingRpcs::new(),
                sequence: SequenceGenerator::new(),
                serializer: Arc::new(serializer),
                active_workers: Arc::new(AtomicUsize::new(0)),
                metrics: TransportMetrics::new(),
                responders: Mutex::new(JoinSet::new()),
            }),
            _calls: PhantomData,
        })
    }

    /// Issues a call and returns once the request has been sent.
    ///
    /// The returned future resolves when the response arrives, or with
    /// [`RpcError::ConnectionClosed`] if the connection closes first.
    ///
    /// Waits, yielding, while the buffer pool has fewer than two free pieces.
    pub async fn call<Q>(&self, request: &Q::Request) -> Result<ResponseFuture<Q::Response>, RpcError>
    where
        Q: Rpc,
    {
        if !R::contains(Q::ID) {
            fatal!("rpc {} ({}) is not callable on this transport", Q::NAME, Q::ID);
        }
        let shared = &self.shared;
        let seq = shared.sequence.next();
        let header = FrameHeader {
            seq,
            rpc_id: Q::ID,
        };

        let (mut send, recv) = shared.acquire_pair().await;
        let len = shared.encode(header, request, &mut send)?;

        let response = shared
            .outstanding
            .register::<Q::Response, S>(seq, Q::ID, Arc::clone(&shared.serializer));
        shared.metrics.record_call_issued();

        let received = match shared.control.post_recv(recv) {
            Ok(received) => received,
            Err(error) => {
                self.abandon(seq);
                return Err(error.into());
            }
        };
        shared
            .responders
            .lock()
            .spawn(receive_response::<B, R, S>(Arc::clone(shared), received));

        debug!(seq, rpc = Q::NAME, len, "Sending request");
        trace!(seq, "Request frame\n{}", HexDump::new(&send[..len]));
        let sent = match shared.control.post_send(send, len) {
            Ok(sent) => sent.await,
            Err(error) => {
                self.abandon(seq);
                return Err(error.into());
            }
        };
        if sent.is_closed() {
            shared.release(sent.lease);
            self.abandon(seq);
            return Err(RpcError::ConnectionClosed);
        }
        shared.metrics.record_bytes_sent(len as u64);
        shared.release(sent.lease);
        Ok(response)
    }

    fn abandon(&self, seq: i64) {
        if self.shared.outstanding.cancel(seq) {
            self.shared.metrics.record_calls_drained(1);
        }
    }

    /// Answers requests with `handlers` until the connection closes.
    ///
    /// Runs `n_workers` workers, each keeping one receive posted. A worker
    /// exits on a zero-length receive; this returns once all of them have
    /// exited. If a worker fails, for instance because a response does not
    /// fit a buffer piece, the connection is severed: the other workers exit,
    /// the peer observes the closure and its pending calls resolve as
    /// closed. The first error is returned.
    pub async fn serve<H: HandlerSet>(&self, handlers: H) -> Result<(), RpcError> {
        let ids = handlers.handled_ids();
        let mut unique = HashSet::with_capacity(ids.len());
        if let Some(duplicate) = ids.iter().find(|id| !unique.insert(**id)) {
            fatal!("rpc id {} is handled twice", duplicate);
        }

        let shared = &self.shared;
        let handlers = Arc::new(handlers);
        let n_workers = shared.config.n_workers;
        let mut workers = JoinSet::new();
        for worker in 0..n_workers {
            let slot = WorkerSlot::enter(&shared.active_workers);
            workers.spawn(serve_worker(
                Arc::clone(shared),
                Arc::clone(&handlers),
                worker,
                slot,
            ));
        }
        info!(workers = n_workers, handlers = ids.len(), "Serving requests");

        let mut result = Ok(());
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    error!(%error, "Serve worker failed");
                    if result.is_ok() {
                        shared.sever();
                        result = Err(error);
                    }
                }
                Err(join_error) if join_error.is_panic() => {
                    shared.sever();
                    std::panic::resume_unwind(join_error.into_panic())
                }
                Err(join_error) => {
                    debug!(error = %join_error, "Serve worker cancelled");
                }
            }
        }
        info!(served = shared.metrics.requests_served(), "Serving finished");
        result
    }

    /// Tears the connection down.
    ///
    /// The client side stops and disconnects its endpoints; the server side
    /// waits for the client to do so. Calls still outstanding afterwards
    /// resolve with [`RpcError::ConnectionClosed`].
    pub async fn close(self) -> Result<(), FabricError> {
        let shared = &self.shared;
        match shared.config.side {
            Side::Server => shared.connection.wait_for_disconnect().await?,
            Side::Client => shared.connection.disconnect().await?,
        }
        shared.drain_outstanding();
        info!(
            side = %shared.config.side,
            calls = shared.metrics.calls_issued(),
            served = shared.metrics.requests_served(),
            "RPC transport closed"
        );
        Ok(())
    }

    /// Configuration the transport was established with.
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.shared.config
    }

    /// Whether this transport listened (server) or connected (client).
    #[must_use]
    pub fn side(&self) -> Side {
        self.shared.config.side
    }

    /// The endpoint RPC frames travel on.
    #[must_use]
    pub fn control(&self) -> &Arc<Endpoint<B>> {
        &self.shared.control
    }

    /// Every endpoint of the connection, control path first.
    #[must_use]
    pub fn endpoints(&self) -> &[Arc<Endpoint<B>>] {
        self.shared.connection.endpoints()
    }

    /// Pool every request, response and receive buffer is leased from.
    ///
    /// Holds `2 × n_workers` pieces of `max_rpc_msg_size` bytes.
    #[must_use]
    pub fn pool(&self) -> &BufferPool {
        &self.shared.pool
    }

    /// Counters for calls, served requests and traffic on this transport.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fabricrpc::backend::MemoryBackend;
    /// # use fabricrpc::config::TransportConfig;
    /// # use fabricrpc::endpoint::Side;
    /// # use fabricrpc::rpc::RpcTransport;
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), fabricrpc::FabricError> {
    /// # let (a, b) = MemoryBackend::pair();
    /// # let (server, client) = tokio::try_join!(
    /// #     RpcTransport::<_, ()>::establish(TransportConfig::new(Side::Server), a),
    /// #     RpcTransport::<_, ()>::establish(TransportConfig::new(Side::Client), b),
    /// # )?;
    /// assert_eq!(client.metrics().calls_issued(), 0);
    /// assert_eq!(server.metrics().requests_served(), 0);
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn metrics(&self) -> &TransportMetrics {
        &self.shared.metrics
    }

    /// Number of calls awaiting a response.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.len()
    }

    /// Number of serve workers still running.
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.shared.active_workers.load(Ordering::Acquire)
    }

    /// Returns `true` once the peer has closed or the transport was stopped.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        !self.shared.control.running()
    }

    pub(crate) fn shared(&self) -> Arc<Shared<B, S>> {
        Arc::clone(&self.shared)
    }
}

impl<B: Backend, R: RpcSet, S: Serializer> Clone for RpcTransport<B, R, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            _calls: PhantomData,
        }
    }
}

impl<B: Backend, R: RpcSet, S: Serializer> fmt::Debug for RpcTransport<B, R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcTransport")
            .field("side", &self.shared.config.side)
            .field("control", &self.shared.control)
            .field("pool", &self.shared.pool)
            .field("outstanding", &self.shared.outstanding)
            .field("serializer", &self.shared.serializer.name())
            .finish()
    }
}

/// Waits for whichever response lands in one pre-posted receive.
async fn receive_response<B, R, S>(shared: Arc<Shared<B, S>>, received: OpFuture)
where
    B: Backend,
    R: RpcSet,
    S: Serializer,
{
    let completion = received.await;
    if completion.is_closed() {
        shared.release(completion.lease);
        shared.drain_outstanding();
        return;
    }
    shared
        .metrics
        .record_bytes_received(completion.transferred as u64);

    let frame = completion.bytes();
    trace!("Response frame\n{}", HexDump::new(frame));
    let Some((header, payload)) = FrameHeader::decode(frame) else {
        fatal!("response of {} bytes is shorter than a frame header", frame.len());
    };
    let Some(seq) = header.seq.checked_neg().filter(|seq| *seq > 0) else {
        fatal!("caller received sequence {}, which is not a response", header.seq);
    };
    if !R::contains(header.rpc_id) {
        fatal!("response {} carries unknown rpc id {}", seq, header.rpc_id);
    }
    let Some(pending) = shared.outstanding.take(seq) else {
        fatal!("response {} matches no outstanding call", seq);
    };
    if pending.rpc_id() != header.rpc_id {
        fatal!(
            "response {} carries rpc id {} but the call was for {}",
            seq,
            header.rpc_id,
            pending.rpc_id()
        );
    }

    debug!(seq, rpc_id = %header.rpc_id, "Response received");
    shared.metrics.record_response_received(pending.elapsed());
    pending.resolve(payload);
    shared.release(completion.lease);
}

async fn serve_worker<B, S, H>(
    shared: Arc<Shared<B, S>>,
    handlers: Arc<H>,
    worker: usize,
    _slot: WorkerSlot,
) -> Result<(), RpcError>
where
    B: Backend,
    S: Serializer,
    H: HandlerSet,
{
    debug!(worker, "Serve worker started");
    while shared.control.running() {
        let lease = shared.acquire_one().await;
        let request = shared.control.post_recv(lease)?.await;
        if request.is_closed() {
            shared.release(request.lease);
            debug!(worker, "Receive closed, serve worker exiting");
            break;
        }
        shared
            .metrics
            .record_bytes_received(request.transferred as u64);

        let frame = request.bytes();
        trace!(worker, "Request frame\n{}", HexDump::new(frame));
        let Some((header, payload)) = FrameHeader::decode(frame) else {
            fatal!("request of {} bytes is shorter than a frame header", frame.len());
        };
        if header.is_response() {
            fatal!("server received sequence {}, which is a response", header.seq);
        }

        let mut reply = shared.acquire_one().await;
        let written = match handlers.dispatch(
            header.rpc_id,
            payload,
            shared.serializer.as_ref(),
            &mut reply[HEADER_LEN..],
        ) {
            Some(result) => result?,
            None => fatal!("no handler for rpc id {} (request {})", header.rpc_id, header.seq),
        };
        FrameHeader {
            seq: -header.seq,
            rpc_id: header.rpc_id,
        }
        .encode(&mut reply)?;
        shared.release(request.lease);

        let len = HEADER_LEN + written;
        debug!(worker, seq = header.seq, rpc_id = %header.rpc_id, len, "Sending response");
        let sent = shared.control.post_send(reply, len)?.await;
        if sent.is_closed() {
            shared.release(sent.lease);
            debug!(worker, "Send closed, serve worker exiting");
            break;
        }
        shared.metrics.record_bytes_sent(len as u64);
        shared.metrics.record_request_served();
        shared.release(sent.lease);
    }
    debug!(worker, "Serve worker stopped");
    Ok(())
}
