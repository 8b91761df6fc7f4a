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

//! TCP socket backend.
//!
//! Sockets are created with `socket2` and driven in non-blocking mode from
//! [`progress`](Backend::progress). Each message travels as a frame of a
//! little-endian `u32` length prefix followed by the message bytes, so every
//! receive completion carries exactly one message. End of stream surfaces as
//! a zero-length receive.

use crate::backend::{Backend, BackendError, BackendKind, LinkState};
use crate::endpoint::{OpRegistry, OpToken};
use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;
use tracing::{debug, info, warn};

const FRAME_PREFIX: usize = 4;
const READ_CHUNK: usize = 16 * 1024;

/// Configuration for a [`TcpBackend`].
///
/// # Examples
///
/// ```rust
/// use fabricrpc::backend::TcpConfig;
/// use std::time::Duration;
///
/// let config = TcpConfig::new("127.0.0.1:7000".parse().unwrap())
///     .with_nodelay(false)
///     .with_connect_timeout(Duration::from_secs(1));
/// assert!(!config.nodelay);
/// assert_eq!(config.backlog, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpConfig {
    /// Local address to bind (passive side) or remote address to connect to.
    pub address: SocketAddr,
    /// Disable Nagle's algorithm on the connected stream.
    ///
    /// Default: true
    pub nodelay: bool,
    /// Set `SO_REUSEADDR` on the listening socket.
    ///
    /// Default: true
    pub reuse_address: bool,
    /// Listen backlog.
    ///
    /// Default: 10
    pub backlog: i32,
    /// Upper bound on an outgoing connection attempt.
    ///
    /// Default: 5 seconds
    pub connect_timeout: Duration,
    /// Largest frame accepted from the peer.
    ///
    /// Default: 16 MB
    pub max_frame_size: usize,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([127, 0, 0, 1], 0)),
            nodelay: true,
            reuse_address: true,
            backlog: 10,
            connect_timeout: Duration::from_secs(5),
            max_frame_size: 16 * 1024 * 1024,
        }
    }
}

impl TcpConfig {
    /// Creates a configuration for `address` with default settings.
    #[must_use]
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    #[must_use]
    pub fn with_reuse_address(mut self, reuse_address: bool) -> Self {
        self.reuse_address = reuse_address;
        self
    }

    #[must_use]
    pub fn with_backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}

/// Backend driving one TCP connection.
///
/// The passive side is created with [`TcpBackend::bind`], which binds and
/// starts listening immediately so [`local_addr`](Self::local_addr) is known
/// before establishment begins. The active side is created with
/// [`TcpBackend::connector`] and connects when the connection handle asks it
/// to.
///
/// Only one connection is served. Further incoming connections are accepted
/// and closed right away with a warning.
#[derive(Debug)]
pub struct TcpBackend {
    config: TcpConfig,
    listener: Option<TcpListener>,
    stream: Option<TcpStream>,
    peer: Option<SocketAddr>,
    link: LinkState,
    sends: VecDeque<OpToken>,
    prefix_written: usize,
    inbox: BytesMut,
    eof: bool,
}

impl TcpBackend {
    /// Binds a listening socket at `config.address`.
    pub fn bind(config: TcpConfig) -> Result<Self, BackendError> {
        let address = config.address;
        let bind_failed = |source: io::Error| BackendError::BindFailed {
            address: address.to_string(),
            source,
        };

        let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
            .map_err(bind_failed)?;
        if config.reuse_address {
            socket.set_reuse_address(true).map_err(bind_failed)?;
        }
        socket.bind(&SockAddr::from(address)).map_err(bind_failed)?;
        socket.listen(config.backlog).map_err(bind_failed)?;
        socket.set_nonblocking(true).map_err(bind_failed)?;
        let listener = TcpListener::from(socket);
        debug!(address = %address, "TCP listener bound");

        Ok(Self::with_listener(config, Some(listener)))
    }

    /// Creates the active side; nothing is opened until `connect`.
    #[must_use]
    pub fn connector(config: TcpConfig) -> Self {
        Self::with_listener(config, None)
    }

    fn with_listener(config: TcpConfig, listener: Option<TcpListener>) -> Self {
        Self {
            config,
            listener,
            stream: None,
            peer: None,
            link: LinkState::Down,
            sends: VecDeque::new(),
            prefix_written: 0,
            inbox: BytesMut::new(),
            eof: false,
        }
    }

    /// Local address of the listening socket or of the connected stream.
    pub fn local_addr(&self) -> Result<SocketAddr, BackendError> {
        match (&self.listener, &self.stream) {
            (Some(listener), _) => Ok(listener.local_addr()?),
            (None, Some(stream)) => Ok(stream.local_addr()?),
            (None, None) => Err(BackendError::Closed),
        }
    }

    /// Address of the connected peer.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    fn configure_stream(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(self.config.nodelay)
    }

    fn accept(&mut self) -> Result<bool, BackendError> {
        if !matches!(self.link, LinkState::Listening | LinkState::Up) {
            return Ok(false);
        }
        let Some(listener) = &self.listener else {
            return Ok(false);
        };
        match listener.accept() {
            Ok((stream, peer)) => {
                if self.stream.is_some() {
                    warn!(peer = %peer, "Ignoring additional connection; endpoint supports one connection");
                    drop(stream);
                    return Ok(true);
                }
                self.configure_stream(&stream)?;
                self.stream = Some(stream);
                self.peer = Some(peer);
                self.link = LinkState::Up;
                info!(peer = %peer, "Accepted TCP connection");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn flush_sends(&mut self, ops: &mut OpRegistry) -> Result<bool, BackendError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(false);
        };
        let mut progressed = false;
        let mut broken = false;

        while let Some(&token) = self.sends.front() {
            let Some(len) = ops.get(token).map(|ctx| ctx.len()) else {
                self.sends.pop_front();
                self.prefix_written = 0;
                continue;
            };
            if self.prefix_written == FRAME_PREFIX
                && ops.pending_send(token).is_none_or(<[u8]>::is_empty)
            {
                ops.complete_send(token, len);
                self.sends.pop_front();
                self.prefix_written = 0;
                progressed = true;
                continue;
            }

            let written = if self.prefix_written < FRAME_PREFIX {
                let prefix = (len as u32).to_le_bytes();
                stream.write(&prefix[self.prefix_written..])
            } else {
                stream.write(ops.pending_send(token).unwrap_or_default())
            };

            match written {
                Ok(0) => {
                    broken = true;
                    break;
                }
                Ok(n) if self.prefix_written < FRAME_PREFIX => {
                    self.prefix_written += n;
                    progressed = true;
                }
                Ok(n) => {
                    ops.advance_send(token, n);
                    progressed = true;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if is_disconnect(&e) => {
                    broken = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if broken {
            debug!("TCP peer went away while sending");
            self.abandon_sends(ops);
            progressed = true;
        }
        Ok(progressed)
    }

    fn abandon_sends(&mut self, ops: &mut OpRegistry) {
        for token in self.sends.drain(..) {
            ops.complete_send(token, 0);
        }
        self.prefix_written = 0;
        self.eof = true;
        self.link = LinkState::Closed;
    }

    fn fill_inbox(&mut self) -> Result<bool, BackendError> {
        if self.eof {
            return Ok(false);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(false);
        };
        let limit = self.config.max_frame_size.saturating_add(FRAME_PREFIX);
        let mut scratch = [0u8; READ_CHUNK];
        let mut progressed = false;

        while self.inbox.len() < limit {
            match stream.read(&mut scratch) {
                Ok(0) => {
                    self.eof = true;
                    progressed = true;
                    break;
                }
                Ok(n) => {
                    self.inbox.extend_from_slice(&scratch[..n]);
                    progressed = true;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if is_disconnect(&e) => {
                    self.eof = true;
                    progressed = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if self.eof {
            debug!(peer = ?self.peer, "TCP peer closed the connection");
            self.link = LinkState::Closed;
        }
        Ok(progressed)
    }

    /// Length of the next frame if it is fully buffered.
    fn buffered_frame(&self) -> Result<Option<usize>, BackendError> {
        if self.inbox.len() < FRAME_PREFIX {
            return Ok(None);
        }
        let size = (&self.inbox[..FRAME_PREFIX]).get_u32_le() as usize;
        if size > self.config.max_frame_size {
            return Err(BackendError::FrameTooLarge {
                size,
                capacity: self.config.max_frame_size,
            });
        }
        Ok((self.inbox.len() >= FRAME_PREFIX + size).then_some(size))
    }

    fn deliver(&mut self, ops: &mut OpRegistry) -> Result<bool, BackendError> {
        let mut progressed = false;
        while let Some(size) = self.buffered_frame()? {
            let Some(buffer) = ops.front_recv_mut() else {
                break;
            };
            if size > buffer.len() {
                return Err(BackendError::FrameTooLarge {
                    size,
                    capacity: buffer.len(),
                });
            }
            buffer[..size].copy_from_slice(&self.inbox[FRAME_PREFIX..FRAME_PREFIX + size]);
            self.inbox.advance(FRAME_PREFIX + size);
            ops.complete_recv(size);
            progressed = true;
        }

        if self.eof && self.buffered_frame()?.is_none() {
            if ops.complete_recv(0).is_some() {
                progressed = true;
            } else if !ops.peer_closed() {
                ops.signal_peer_closed();
                progressed = true;
            }
        }
        Ok(progressed)
    }
}

fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    )
}

impl Backend for TcpBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Tcp
    }

    fn listen(&mut self) -> Result<(), BackendError> {
        if self.listener.is_none() {
            return Err(BackendError::InvalidConfiguration {
                reason: "listen requires a backend created with TcpBackend::bind".to_string(),
            });
        }
        if self.link != LinkState::Down {
            warn!(link = %self.link, "Ignoring listen; endpoint supports one connection");
            return Ok(());
        }
        self.link = LinkState::Listening;
        info!(address = %self.config.address, "Listening for TCP connection");
        Ok(())
    }

    fn connect(&mut self) -> Result<(), BackendError> {
        if self.listener.is_some() {
            return Err(BackendError::InvalidConfiguration {
                reason: "connect requires a backend created with TcpBackend::connector".to_string(),
            });
        }
        if self.stream.is_some() {
            warn!(peer = ?self.peer, "Ignoring connect; endpoint supports one connection");
            return Ok(());
        }

        let address = self.config.address;
        let connect_failed = |source: io::Error| BackendError::ConnectionFailed {
            address: address.to_string(),
            source,
        };
        self.link = LinkState::Connecting;
        let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
            .map_err(connect_failed)?;
        socket
            .connect_timeout(&SockAddr::from(address), self.config.connect_timeout)
            .map_err(connect_failed)?;
        let stream = TcpStream::from(socket);
        self.configure_stream(&stream).map_err(connect_failed)?;

        self.stream = Some(stream);
        self.peer = Some(address);
        self.link = LinkState::Up;
        info!(peer = %address, "Connected over TCP");
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), BackendError> {
        if let Some(stream) = &self.stream {
            match stream.shutdown(Shutdown::Both) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
                Err(e) => return Err(e.into()),
            }
            debug!(peer = ?self.peer, "TCP connection shut down locally");
        }
        self.link = LinkState::Closed;
        Ok(())
    }

    fn link(&self) -> LinkState {
        self.link
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.sends.clear();
        self.prefix_written = 0;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), BackendError> {
        self.sends.clear();
        self.stream = None;
        self.listener = None;
        self.inbox.clear();
        self.link = LinkState::Closed;
        Ok(())
    }

    fn post_send(&mut self, token: OpToken) -> Result<(), BackendError> {
        self.sends.push_back(token);
        Ok(())
    }

    fn progress(&mut self, ops: &mut OpRegistry) -> Result<bool, BackendError> {
        let mut progressed = self.accept()?;
        progressed |= self.flush_sends(ops)?;
        progressed |= self.fill_inbox()?;
        progressed |= self.deliver(ops)?;
        Ok(progressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPool;
    use crate::endpoint::{Endpoint, PathRole};
    use std::time::Instant;

    fn establish() -> (Endpoint<TcpBackend>, Endpoint<TcpBackend>, SocketAddr) {
        let listener = TcpBackend::bind(TcpConfig::default()).unwrap();
        let address = listener.local_addr().unwrap();
        let server = Endpoint::new(PathRole::Control, listener);
        let client = Endpoint::new(PathRole::Control, TcpBackend::connector(TcpConfig::new(address)));

        server.listen().unwrap();
        client.connect().unwrap();
        drive_until(&[&server], || server.link() == LinkState::Up);
        for endpoint in [&server, &client] {
            endpoint.prepare().unwrap();
            endpoint.run().unwrap();
        }
        (server, client, address)
    }

    fn drive_until(endpoints: &[&Endpoint<TcpBackend>], mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            for endpoint in endpoints {
                endpoint.progress().unwrap();
            }
            assert!(Instant::now() < deadline, "timed out driving endpoints");
            std::thread::sleep(Duration::from_micros(50));
        }
    }

    #[test]
    fn test_bind_reports_local_addr() {
        let backend = TcpBackend::bind(TcpConfig::default()).unwrap();
        let address = backend.local_addr().unwrap();
        assert!(address.ip().is_loopback());
        assert_ne!(address.port(), 0);
        assert_eq!(backend.kind(), BackendKind::Tcp);
    }

    #[test]
    fn test_connector_cannot_listen() {
        let mut backend = TcpBackend::connector(TcpConfig::default());
        assert!(matches!(
            backend.listen(),
            Err(BackendError::InvalidConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn test_frames_round_trip() {
        let (server, client, _) = establish();
        let pool = BufferPool::new(4, 64);

        let first = server.post_recv(pool.acquire_one().unwrap()).unwrap();
        let second = server.post_recv(pool.acquire_one().unwrap()).unwrap();
        for payload in [&b"hello"[..], &b"world!"[..]] {
            let mut lease = pool.acquire_one().unwrap();
            lease[..payload.len()].copy_from_slice(payload);
            let _ = client.post_send(lease, payload.len()).unwrap();
        }

        drive_until(&[&server, &client], || server.pending() == 0);
        assert_eq!(first.await.bytes(), b"hello");
        assert_eq!(second.await.bytes(), b"world!");
    }

    #[tokio::test]
    async fn test_peer_shutdown_stops_endpoint() {
        let (server, client, _) = establish();
        let pool = BufferPool::new(1, 64);
        let recv = server.post_recv(pool.acquire_one().unwrap()).unwrap();

        client.stop().unwrap();
        client.disconnect().unwrap();

        drive_until(&[&server], || server.stopping());
        assert!(recv.await.is_closed());
        assert_eq!(server.link(), LinkState::Closed);
    }

    #[test]
    fn test_additional_connection_is_dropped() {
        let (server, _client, address) = establish();
        let mut extra = TcpStream::connect(address).unwrap();
        extra
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();

        let mut closed = false;
        drive_until(&[&server], || {
            let mut byte = [0u8; 1];
            match extra.read(&mut byte) {
                Ok(0) => closed = true,
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                _ => closed = true,
            }
            closed
        });

        assert!(closed);
        assert_eq!(server.link(), LinkState::Up);
    }
}
