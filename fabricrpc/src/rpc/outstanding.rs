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

//! Table of calls awaiting a response.

use crate::fatal::fatal;
use crate::rpc::{RpcError, RpcId};
use crate::serialization::Serializer;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

type Completer = Box<dyn FnOnce(Result<&[u8], RpcError>) + Send>;

struct Entry {
    rpc_id: RpcId,
    started: Instant,
    complete: Completer,
}

/// Outstanding calls keyed by request sequence.
///
/// An entry is created when a call is issued and removed exactly once: by
/// the response that carries its negated sequence, by [`drain`](Self::drain)
/// when the connection closes, or by [`cancel`](Self::cancel) when the
/// request never left.
///
/// # Examples
///
/// ```rust
/// use fabricrpc::rpc::{OutstandingRpcs, RpcId};
/// use fabricrpc::serialization::{PostcardSerializer, Serializer};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let serializer = Arc::new(PostcardSerializer::default());
/// let outstanding = OutstandingRpcs::new();
/// let response = outstanding.register::<String, _>(1, RpcId::from_raw(7), Arc::clone(&serializer));
///
/// let payload = serializer.serialize("hi, World")?;
/// outstanding.take(1).unwrap().resolve(&payload);
/// assert_eq!(response.await?, "hi, World");
/// assert!(outstanding.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct OutstandingRpcs {
    entries: Mutex<HashMap<i64, Entry>>,
}

impl OutstandingRpcs {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Records a call and returns the future its response resolves.
    ///
    /// The response payload is decoded with `serializer` by whoever resolves
    /// the entry. Registering a sequence that is already outstanding is a
    /// protocol violation.
    pub fn register<T, S>(&self, seq: i64, rpc_id: RpcId, serializer: Arc<S>) -> ResponseFuture<T>
    where
        T: DeserializeOwned + Send + 'static,
        S: Serializer,
    {
        let (tx, rx) = oneshot::channel();
        let complete: Completer = Box::new(move |result: Result<&[u8], RpcError>| {
            let value = result.and_then(|payload| Ok(serializer.deserialize::<T>(payload)?));
            let _ = tx.send(value);
        });
        let entry = Entry {
            rpc_id,
            started: Instant::now(),
            complete,
        };
        if self.entries.lock().insert(seq, entry).is_some() {
            fatal!("sequence {} registered twice", seq);
        }
        ResponseFuture {
            rx,
            _marker: PhantomData,
        }
    }

    /// Removes the entry for `seq` so it can be resolved.
    #[must_use]
    pub fn take(&self, seq: i64) -> Option<Pending> {
        self.entries
            .lock()
            .remove(&seq)
            .map(|entry| Pending { seq, entry })
    }

    /// Removes the entry for `seq` without resolving it.
    ///
    /// The caller's future, if still held, resolves to
    /// [`RpcError::ConnectionClosed`].
    pub fn cancel(&self, seq: i64) -> bool {
        self.entries.lock().remove(&seq).is_some()
    }

    /// Resolves every entry with [`RpcError::ConnectionClosed`].
    ///
    /// Returns the number of entries resolved.
    pub fn drain(&self) -> usize {
        let entries: Vec<Entry> = self.entries.lock().drain().map(|(_, entry)| entry).collect();
        let count = entries.len();
        for entry in entries {
            (entry.complete)(Err(RpcError::ConnectionClosed));
        }
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for OutstandingRpcs {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OutstandingRpcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seqs: Vec<i64> = self.entries.lock().keys().copied().collect();
        seqs.sort_unstable();
        f.debug_struct("OutstandingRpcs").field("seqs", &seqs).finish()
    }
}

/// An entry taken out of [`OutstandingRpcs`], to be resolved exactly once.
pub struct Pending {
    seq: i64,
    entry: Entry,
}

impl Pending {
    #[must_use]
    pub fn seq(&self) -> i64 {
        self.seq
    }

    /// Identifier of the RPC the call was issued for.
    #[must_use]
    pub fn rpc_id(&self) -> RpcId {
        self.entry.rpc_id
    }

    /// Time since the call was registered.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.entry.started.elapsed()
    }

    /// Decodes `payload` and hands the response to the caller.
    pub fn resolve(self, payload: &[u8]) {
        (self.entry.complete)(Ok(payload));
    }

    /// Fails the call with `error`.
    pub fn fail(self, error: RpcError) {
        (self.entry.complete)(Err(error));
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("seq", &self.seq)
            .field("rpc_id", &self.entry.rpc_id)
            .finish()
    }
}

/// Future resolving to the response of one call.
///
/// Resolves to [`RpcError::ConnectionClosed`] if the transport drops the
/// call without a response.
#[must_use = "the response of a call is lost if its future is dropped"]
pub struct ResponseFuture<T> {
    rx: oneshot::Receiver<Result<T, RpcError>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Future for ResponseFuture<T> {
    type Output = Result<T, RpcError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(RpcError::ConnectionClosed)))
    }
}

impl<T> fmt::Debug for ResponseFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFuture").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::PostcardSerializer;

    fn serializer() -> Arc<PostcardSerializer> {
        Arc::new(PostcardSerializer::default())
    }

    #[tokio::test]
    async fn test_take_resolves_once() {
        let outstanding = OutstandingRpcs::new();
        let response = outstanding.register::<u32, _>(5, RpcId::from_raw(1), serializer());
        assert_eq!(outstanding.len(), 1);

        let pending = outstanding.take(5).unwrap();
        assert_eq!(pending.seq(), 5);
        assert_eq!(pending.rpc_id(), RpcId::from_raw(1));
        assert!(outstanding.take(5).is_none());

        pending.resolve(&serializer().serialize(&42u32).unwrap());
        assert_eq!(response.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_drain_closes_every_call() {
        let outstanding = OutstandingRpcs::new();
        let first = outstanding.register::<u32, _>(1, RpcId::from_raw(1), serializer());
        let second = outstanding.register::<u32, _>(2, RpcId::from_raw(1), serializer());

        assert_eq!(outstanding.drain(), 2);
        assert!(outstanding.is_empty());
        assert!(first.await.unwrap_err().is_closed());
        assert!(second.await.unwrap_err().is_closed());
        assert_eq!(outstanding.drain(), 0);
    }

    #[tokio::test]
    async fn test_cancel_drops_sender() {
        let outstanding = OutstandingRpcs::new();
        let response = outstanding.register::<u32, _>(3, RpcId::from_raw(1), serializer());
        assert!(outstanding.cancel(3));
        assert!(!outstanding.cancel(3));
        assert!(matches!(response.await, Err(RpcError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_undecodable_payload() {
        let outstanding = OutstandingRpcs::new();
        let response = outstanding.register::<String, _>(4, RpcId::from_raw(1), serializer());
        outstanding.take(4).unwrap().resolve(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(response.await, Err(RpcError::Deserialization(_))));
    }

    #[test]
    fn test_resolving_after_caller_dropped() {
        let outstanding = OutstandingRpcs::new();
        drop(outstanding.register::<u32, _>(6, RpcId::from_raw(1), serializer()));
        outstanding.take(6).unwrap().fail(RpcError::ConnectionClosed);
    }

    #[test]
    #[should_panic(expected = "sequence 9 registered twice")]
    fn test_duplicate_sequence_is_fatal() {
        let outstanding = OutstandingRpcs::new();
        let _first = outstanding.register::<u32, _>(9, RpcId::from_raw(1), serializer());
        let _second = outstanding.register::<u32, _>(9, RpcId::from_raw(1), serializer());
    }
}
