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

//! The capability contract every backend implements.

use crate::backend::BackendError;
use crate::endpoint::{OpRegistry, OpToken};
use std::fmt;

/// Substrate a backend drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// In-process queues.
    Memory,
    /// TCP sockets.
    Tcp,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Memory => f.write_str("memory"),
            BackendKind::Tcp => f.write_str("tcp"),
        }
    }
}

/// Connection state of a backend's link to its peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// No connection attempt has been made.
    Down,
    /// Waiting for a peer to connect.
    Listening,
    /// An outgoing connection is being set up.
    Connecting,
    /// Connected to exactly one peer.
    Up,
    /// The connection was closed by either side.
    Closed,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Down => "Down",
            LinkState::Listening => "Listening",
            LinkState::Connecting => "Connecting",
            LinkState::Up => "Up",
            LinkState::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// Driver for one endpoint's connection over a concrete substrate.
///
/// A backend is owned by its [`Endpoint`](crate::endpoint::Endpoint) and only
/// ever called with the endpoint's lock held, so implementations need not be
/// `Sync`. No method may block indefinitely: establishment and completion are
/// both observed through [`progress`](Self::progress), which the connection
/// handle and the transport poller call repeatedly.
///
/// Operations are referred to by [`OpToken`]. The backend keeps whatever
/// queue of tokens it needs and reports completions back through the
/// [`OpRegistry`] passed to `progress`:
///
/// - sends are completed by token with [`OpRegistry::complete_send`], after
///   optional partial progress through [`OpRegistry::advance_send`];
/// - receives are completed in posting order with
///   [`OpRegistry::complete_recv`], after the message has been copied into
///   [`OpRegistry::front_recv_mut`];
/// - peer closure is reported as a zero-length receive completion, or with
///   [`OpRegistry::signal_peer_closed`] when no receive is pending.
///
/// Lifecycle hooks mirror the endpoint state machine and default to no-ops.
pub trait Backend: Send + 'static {
    /// Substrate this backend drives.
    fn kind(&self) -> BackendKind;

    /// Starts waiting for a peer. Passive side only.
    fn listen(&mut self) -> Result<(), BackendError>;

    /// Starts connecting to the peer. Active side only.
    ///
    /// Calling this while a connection exists is ignored with a warning.
    fn connect(&mut self) -> Result<(), BackendError>;

    /// Closes the link to the peer.
    fn disconnect(&mut self) -> Result<(), BackendError>;

    /// Current link state.
    fn link(&self) -> LinkState;

    /// Sets up per-endpoint resources. Called on `Idle -> Ready`.
    fn prepare(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Whether any data-path channels this backend owns are usable.
    fn data_path_ready(&self) -> bool {
        true
    }

    /// Called on `Ready -> Running`.
    fn run(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Called on `Running -> Stopping`. Must forget every queued token.
    fn stop(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Releases backend resources. Called on `Stopping -> Exited`.
    fn shutdown(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Queues a send registered under `token`.
    fn post_send(&mut self, token: OpToken) -> Result<(), BackendError>;

    /// Queues a receive registered under `token`.
    ///
    /// Receives are matched in posting order by the registry, so most
    /// backends need not track them.
    fn post_recv(&mut self, token: OpToken) -> Result<(), BackendError> {
        let _ = token;
        Ok(())
    }

    /// Drains available events without blocking and reports whether any were
    /// consumed.
    fn progress(&mut self, ops: &mut OpRegistry) -> Result<bool, BackendError>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn listen(&mut self) -> Result<(), BackendError> {
        (**self).listen()
    }

    fn connect(&mut self) -> Result<(), BackendError> {
        (**self).connect()
    }

    fn disconnect(&mut self) -> Result<(), BackendError> {
        (**self).disconnect()
    }

    fn link(&self) -> LinkState {
        (**self).link()
    }

    fn prepare(&mut self) -> Result<(), BackendError> {
        (**self).prepare()
    }

    fn data_path_ready(&self) -> bool {
        (**self).data_path_ready()
    }

    fn run(&mut self) -> Result<(), BackendError> {
        (**self).run()
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        (**self).stop()
    }

    fn shutdown(&mut self) -> Result<(), BackendError> {
        (**self).shutdown()
    }

    fn post_send(&mut self, token: OpToken) -> Result<(), BackendError> {
        (**self).post_send(token)
    }

    fn post_recv(&mut self, token: OpToken) -> Result<(), BackendError> {
        (**self).post_recv(token)
    }

    fn progress(&mut self, ops: &mut OpRegistry) -> Result<bool, BackendError> {
        (**self).progress(ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(BackendKind::Memory.to_string(), "memory");
        assert_eq!(BackendKind::Tcp.to_string(), "tcp");
    }

    #[test]
    fn test_link_display() {
        assert_eq!(LinkState::Listening.to_string(), "Listening");
        assert_eq!(LinkState::Up.to_string(), "Up");
    }
}
