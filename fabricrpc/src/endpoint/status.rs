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

//! Endpoint lifecycle states and the small enums that label endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of an [`Endpoint`](crate::endpoint::Endpoint).
///
/// States are only ever visited in declaration order:
/// `Idle -> Ready -> Running -> Stopping -> Exited`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// Created, backend not yet prepared.
    Idle = 0,
    /// Backend resources are set up; no traffic yet.
    Ready = 1,
    /// Operations may be posted.
    Running = 2,
    /// Stopped locally or by the peer; queued operations have been resolved.
    Stopping = 3,
    /// Backend resources are released. Terminal.
    Exited = 4,
}

impl Status {
    /// The state that legally follows this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Status> {
        match self {
            Status::Idle => Some(Status::Ready),
            Status::Ready => Some(Status::Running),
            Status::Running => Some(Status::Stopping),
            Status::Stopping => Some(Status::Exited),
            Status::Exited => None,
        }
    }

    /// Human-readable name of the state.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Status::Idle => "Idle",
            Status::Ready => "Ready",
            Status::Running => "Running",
            Status::Stopping => "Stopping",
            Status::Exited => "Exited",
        }
    }

    const fn from_u8(raw: u8) -> Status {
        match raw {
            0 => Status::Idle,
            1 => Status::Ready,
            2 => Status::Running,
            3 => Status::Stopping,
            _ => Status::Exited,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Lock-free cell holding a [`Status`] for readers outside the endpoint lock.
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(Status::Idle as u8))
    }

    pub(crate) fn load(&self) -> Status {
        Status::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, status: Status) {
        self.0.store(status as u8, Ordering::Release);
    }
}

/// Which side of a connection an endpoint or transport plays.
///
/// The server is the passive side: it listens and accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Actively connects to a listening peer.
    Client,
    /// Listens for and accepts one peer.
    Server,
}

impl Side {
    /// Returns `true` for the listening side.
    #[must_use]
    pub const fn is_passive(self) -> bool {
        matches!(self, Side::Server)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Client => f.write_str("Client"),
            Side::Server => f.write_str("Server"),
        }
    }
}

/// Purpose of an endpoint within a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathRole {
    /// Carries RPC requests and responses.
    Control,
    /// Carries bulk payloads next to the control path.
    Data,
}

impl fmt::Display for PathRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathRole::Control => f.write_str("control"),
            PathRole::Data => f.write_str("data"),
        }
    }
}

/// Kind of a posted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Transfer a leased buffer to the peer.
    Send,
    /// Fill a leased buffer with the next message from the peer.
    Recv,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Send => f.write_str("send"),
            Op::Recv => f.write_str("recv"),
        }
    }
}
