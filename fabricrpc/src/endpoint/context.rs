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

//! Operation contexts and the typed registry that correlates them with
//! backend completion events.
//!
//! Every posted send or receive becomes an [`OpContext`] stored in the
//! endpoint's [`OpRegistry`]. Backends never hold the context itself; they are
//! handed an [`OpToken`], a generational index into the registry, and report
//! completions against it. A token whose slot has been resolved and reused no
//! longer matches its slot's generation and is ignored.
//!
//! Receives are additionally queued in submission order. Stream-oriented
//! backends deliver messages in order, so a receive completion always belongs
//! to the oldest outstanding receive.

use crate::buffer::BufferLease;
use crate::endpoint::Op;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::trace;

/// Generational handle to an operation in an [`OpRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpToken {
    index: u32,
    generation: u32,
}

impl OpToken {
    /// Slot index within the registry.
    #[must_use]
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this token was issued.
    #[must_use]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for OpToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Result of a resolved operation.
///
/// `transferred == 0` means the operation did not complete: the endpoint was
/// stopped or the peer closed the connection. The leased buffer travels back
/// with the result so the caller can read received bytes and release it.
#[derive(Debug)]
pub struct Completion {
    /// Bytes moved by the operation.
    pub transferred: usize,
    /// The buffer the operation was posted with.
    pub lease: Option<BufferLease>,
}

impl Completion {
    /// Returns `true` when the operation moved no bytes.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.transferred == 0
    }

    /// The filled part of a receive buffer, or the sent part of a send buffer.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match &self.lease {
            Some(lease) => &lease[..self.transferred.min(lease.len())],
            None => &[],
        }
    }
}

/// Future resolving to the [`Completion`] of one posted operation.
#[must_use = "dropping an OpFuture discards the completion and its buffer"]
#[derive(Debug)]
pub struct OpFuture {
    rx: oneshot::Receiver<Completion>,
}

impl OpFuture {
    pub(crate) fn resolved(completion: Completion) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(completion);
        Self { rx }
    }
}

impl Future for OpFuture {
    type Output = Completion;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Completion> {
        Pin::new(&mut self.rx).poll(cx).map(|result| {
            result.unwrap_or(Completion {
                transferred: 0,
                lease: None,
            })
        })
    }
}

/// One pending operation.
pub struct OpContext {
    op: Op,
    lease: BufferLease,
    len: usize,
    transferred: usize,
    result: oneshot::Sender<Completion>,
}

impl OpContext {
    pub(crate) fn new(op: Op, lease: BufferLease, len: usize) -> (Self, OpFuture) {
        let (tx, rx) = oneshot::channel();
        let len = len.min(lease.len());
        let ctx = Self {
            op,
            lease,
            len,
            transferred: 0,
            result: tx,
        };
        (ctx, OpFuture { rx })
    }

    /// Kind of operation.
    #[must_use]
    pub fn op(&self) -> Op {
        self.op
    }

    /// Target transfer length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for a zero-length operation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes accumulated so far by partial transfers.
    #[must_use]
    pub fn transferred(&self) -> usize {
        self.transferred
    }

    fn resolve(self, transferred: usize) {
        // The receiver may already be gone; the lease is then dropped here
        // and returns to its pool.
        let _ = self.result.send(Completion {
            transferred,
            lease: Some(self.lease),
        });
    }
}

impl fmt::Debug for OpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpContext")
            .field("op", &self.op)
            .field("piece", &self.lease.index())
            .field("len", &self.len)
            .field("transferred", &self.transferred)
            .finish()
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    ctx: Option<OpContext>,
}

/// Typed table of the pending operations of one endpoint.
///
/// The registry is the only place an [`OpContext`] is resolved, and resolving
/// removes it, so every operation is resolved exactly once whether that
/// happens through a backend completion or through teardown.
#[derive(Debug, Default)]
pub struct OpRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    recv_fifo: VecDeque<OpToken>,
    live: usize,
    peer_closed: bool,
}

impl OpRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no operation is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of pending receives.
    #[must_use]
    pub fn pending_recvs(&self) -> usize {
        self.recv_fifo.len()
    }

    pub(crate) fn insert(&mut self, ctx: OpContext) -> OpToken {
        let op = ctx.op;
        let token = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.ctx = Some(ctx);
                OpToken {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    ctx: Some(ctx),
                });
                OpToken {
                    index,
                    generation: 0,
                }
            }
        };
        if op == Op::Recv {
            self.recv_fifo.push_back(token);
        }
        self.live += 1;
        trace!(token = %token, op = %op, "Operation registered");
        token
    }

    /// Looks up a pending operation.
    #[must_use]
    pub fn get(&self, token: OpToken) -> Option<&OpContext> {
        self.slots
            .get(token.index as usize)
            .filter(|slot| slot.generation == token.generation)
            .and_then(|slot| slot.ctx.as_ref())
    }

    fn get_mut(&mut self, token: OpToken) -> Option<&mut OpContext> {
        self.slots
            .get_mut(token.index as usize)
            .filter(|slot| slot.generation == token.generation)
            .and_then(|slot| slot.ctx.as_mut())
    }

    fn remove(&mut self, token: OpToken) -> Option<OpContext> {
        let slot = self.slots.get_mut(token.index as usize)?;
        if slot.generation != token.generation {
            return None;
        }
        let ctx = slot.ctx.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(token.index);
        self.live -= 1;
        Some(ctx)
    }

    /// Bytes of a pending send that have not been transferred yet.
    ///
    /// Returns `None` if the token is stale or does not name a send.
    #[must_use]
    pub fn pending_send(&self, token: OpToken) -> Option<&[u8]> {
        let ctx = self.get(token).filter(|ctx| ctx.op == Op::Send)?;
        Some(&ctx.lease[ctx.transferred..ctx.len])
    }

    /// Records `n` more bytes written for a partially transferred send and
    /// returns `true` once the whole message is out.
    pub fn advance_send(&mut self, token: OpToken, n: usize) -> bool {
        match self.get_mut(token) {
            Some(ctx) if ctx.op == Op::Send => {
                ctx.transferred = (ctx.transferred + n).min(ctx.len);
                ctx.transferred == ctx.len
            }
            _ => false,
        }
    }

    /// Resolves a send with the bytes it transferred.
    ///
    /// Returns `false` if the token is stale, which happens when teardown
    /// resolved the operation first.
    pub fn complete_send(&mut self, token: OpToken, transferred: usize) -> bool {
        if self.get(token).is_none_or(|ctx| ctx.op != Op::Send) {
            return false;
        }
        match self.remove(token) {
            Some(ctx) => {
                trace!(token = %token, transferred, "Send completed");
                ctx.resolve(transferred);
                true
            }
            None => false,
        }
    }

    /// Buffer of the oldest pending receive, for the backend to fill.
    pub fn front_recv_mut(&mut self) -> Option<&mut [u8]> {
        let token = *self.recv_fifo.front()?;
        self.get_mut(token).map(|ctx| &mut ctx.lease[..ctx.len])
    }

    /// Resolves the oldest pending receive with `transferred` bytes.
    ///
    /// A zero-length completion means the peer closed the connection and is
    /// also recorded as such. Returns the resolved token.
    pub fn complete_recv(&mut self, transferred: usize) -> Option<OpToken> {
        let token = self.recv_fifo.pop_front()?;
        let ctx = self.remove(token)?;
        if transferred == 0 {
            self.peer_closed = true;
        }
        trace!(token = %token, transferred, "Receive completed");
        let len = ctx.len;
        ctx.resolve(transferred.min(len));
        Some(token)
    }

    /// Records that the peer closed the connection while no receive was pending.
    pub fn signal_peer_closed(&mut self) {
        self.peer_closed = true;
    }

    /// Returns `true` once the peer is known to have closed the connection.
    #[must_use]
    pub fn peer_closed(&self) -> bool {
        self.peer_closed
    }

    /// Resolves one operation with zero bytes, whatever its kind.
    pub(crate) fn cancel(&mut self, token: OpToken) -> bool {
        self.recv_fifo.retain(|queued| *queued != token);
        match self.remove(token) {
            Some(ctx) => {
                ctx.resolve(0);
                true
            }
            None => false,
        }
    }

    /// Resolves every pending operation with `transferred` bytes.
    ///
    /// Returns the number of operations resolved.
    pub fn resolve_all(&mut self, transferred: usize) -> usize {
        self.recv_fifo.clear();
        let mut resolved = 0;
        for index in 0..self.slots.len() {
            let slot = &self.slots[index];
            let token = OpToken {
                index: index as u32,
                generation: slot.generation,
            };
            if let Some(ctx) = self.remove(token) {
                ctx.resolve(transferred);
                resolved += 1;
            }
        }
        resolved
    }
}

impl Drop for OpRegistry {
    fn drop(&mut self) {
        self.resolve_all(0);
    }
}
