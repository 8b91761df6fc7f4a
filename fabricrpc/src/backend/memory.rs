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

//! In-process backend for tests, benches and single-process deployments.

use crate::backend::{Backend, BackendError, BackendKind, LinkState};
use crate::endpoint::{OpRegistry, OpToken};
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct Rendezvous {
    connect_attempts: AtomicU32,
    accepted: AtomicBool,
}

/// One half of an in-process connection.
///
/// [`MemoryBackend::pair`] creates two connected halves. Whichever half calls
/// [`listen`](Backend::listen) accepts the first connection attempt made by
/// the other; the link comes up once both sides have observed the handshake
/// through [`progress`](Backend::progress). Messages keep their boundaries,
/// and dropping or disconnecting one half surfaces as a zero-length receive
/// on the other once every message sent before it has been delivered.
///
/// # Examples
///
/// ```rust
/// use fabricrpc::backend::{Backend, LinkState, MemoryBackend};
/// use fabricrpc::endpoint::OpRegistry;
///
/// # fn example() -> Result<(), fabricrpc::backend::BackendError> {
/// let (mut server, mut client) = MemoryBackend::pair();
/// let (mut server_ops, mut client_ops) = (OpRegistry::new(), OpRegistry::new());
///
/// server.listen()?;
/// client.connect()?;
/// server.progress(&mut server_ops)?;
/// client.progress(&mut client_ops)?;
///
/// assert_eq!(server.link(), LinkState::Up);
/// assert_eq!(client.link(), LinkState::Up);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug)]
pub struct MemoryBackend {
    rendezvous: Arc<Rendezvous>,
    outbound: Option<mpsc::UnboundedSender<Bytes>>,
    inbound: mpsc::UnboundedReceiver<Bytes>,
    stash: Option<Bytes>,
    link: LinkState,
    seen_attempts: u32,
    sends: VecDeque<OpToken>,
}

impl MemoryBackend {
    /// Creates two halves of one in-process connection.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let rendezvous = Arc::new(Rendezvous::default());
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            Self::half(Arc::clone(&rendezvous), a_tx, b_rx),
            Self::half(rendezvous, b_tx, a_rx),
        )
    }

    fn half(
        rendezvous: Arc<Rendezvous>,
        outbound: mpsc::UnboundedSender<Bytes>,
        inbound: mpsc::UnboundedReceiver<Bytes>,
    ) -> Self {
        Self {
            rendezvous,
            outbound: Some(outbound),
            inbound,
            stash: None,
            link: LinkState::Down,
            seen_attempts: 0,
            sends: VecDeque::new(),
        }
    }

    fn establish(&mut self) -> bool {
        match self.link {
            LinkState::Listening => {
                let attempts = self.rendezvous.connect_attempts.load(Ordering::Acquire);
                if attempts == 0 {
                    return false;
                }
                self.seen_attempts = 1;
                self.rendezvous.accepted.store(true, Ordering::Release);
                self.link = LinkState::Up;
                info!("Accepted in-process peer");
                true
            }
            LinkState::Connecting => {
                if !self.rendezvous.accepted.load(Ordering::Acquire) {
                    return false;
                }
                self.link = LinkState::Up;
                info!("Connected to in-process peer");
                true
            }
            LinkState::Up if self.seen_attempts > 0 => {
                let attempts = self.rendezvous.connect_attempts.load(Ordering::Acquire);
                if attempts > self.seen_attempts {
                    warn!(
                        ignored = attempts - self.seen_attempts,
                        "Ignoring additional connection attempts; endpoint supports one connection"
                    );
                    self.seen_attempts = attempts;
                }
                false
            }
            _ => false,
        }
    }

    fn flush_sends(&mut self, ops: &mut OpRegistry) -> bool {
        let mut progressed = false;
        while let Some(token) = self.sends.pop_front() {
            let Some(payload) = ops.pending_send(token) else {
                continue;
            };
            let message = Bytes::copy_from_slice(payload);
            let len = message.len();
            let delivered = self
                .outbound
                .as_ref()
                .is_some_and(|outbound| outbound.send(message).is_ok());
            if delivered {
                ops.complete_send(token, len);
            } else {
                debug!(token = %token, "Send dropped, peer is gone");
                ops.complete_send(token, 0);
                ops.signal_peer_closed();
            }
            progressed = true;
        }
        progressed
    }

    fn deliver(&mut self, ops: &mut OpRegistry) -> Result<bool, BackendError> {
        let mut progressed = false;
        loop {
            let message = match self.stash.take() {
                Some(message) => message,
                None => match self.inbound.try_recv() {
                    Ok(message) => message,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if self.link != LinkState::Closed {
                            debug!("In-process peer closed the connection");
                            self.link = LinkState::Closed;
                        }
                        if ops.complete_recv(0).is_some() {
                            progressed = true;
                        } else if !ops.peer_closed() {
                            ops.signal_peer_closed();
                            progressed = true;
                        }
                        break;
                    }
                },
            };
            let Some(buffer) = ops.front_recv_mut() else {
                self.stash = Some(message);
                break;
            };
            if message.len() > buffer.len() {
                return Err(BackendError::FrameTooLarge {
                    size: message.len(),
                    capacity: buffer.len(),
                });
            }
            buffer[..message.len()].copy_from_slice(&message);
            ops.complete_recv(message.len());
            progressed = true;
        }
        Ok(progressed)
    }
}

impl Backend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn listen(&mut self) -> Result<(), BackendError> {
        if self.link != LinkState::Down {
            warn!(link = %self.link, "Ignoring listen; endpoint supports one connection");
            return Ok(());
        }
        self.link = LinkState::Listening;
        Ok(())
    }

    fn connect(&mut self) -> Result<(), BackendError> {
        match self.link {
            LinkState::Down => {
                self.rendezvous
                    .connect_attempts
                    .fetch_add(1, Ordering::AcqRel);
                self.link = LinkState::Connecting;
                Ok(())
            }
            LinkState::Closed => Err(BackendError::Closed),
            link => {
                warn!(link = %link, "Ignoring connect; endpoint supports one connection");
                Ok(())
            }
        }
    }

    fn disconnect(&mut self) -> Result<(), BackendError> {
        if self.outbound.take().is_some() {
            debug!("In-process link closed locally");
        }
        self.link = LinkState::Closed;
        Ok(())
    }

    fn link(&self) -> LinkState {
        self.link
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.sends.clear();
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), BackendError> {
        self.sends.clear();
        self.stash = None;
        self.outbound = None;
        self.link = LinkState::Closed;
        Ok(())
    }

    fn post_send(&mut self, token: OpToken) -> Result<(), BackendError> {
        self.sends.push_back(token);
        Ok(())
    }

    fn progress(&mut self, ops: &mut OpRegistry) -> Result<bool, BackendError> {
        let mut progressed = self.establish();
        if matches!(self.link, LinkState::Up | LinkState::Closed) {
            progressed |= self.flush_sends(ops);
            progressed |= self.deliver(ops)?;
        }
        Ok(progressed)
    }
}
