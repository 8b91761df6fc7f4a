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

//! Endpoints: one side of one logical connection.
//!
//! An [`Endpoint`] couples a [`Backend`](crate::backend::Backend) with the
//! lifecycle state machine every backend shares and with the registry of its
//! pending operations.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --prepare--> Ready --run--> Running --stop--> Stopping --shutdown--> Exited
//! ```
//!
//! Transitions only ever move forward. `stop` may be called any number of
//! times once the endpoint ran; the first call resolves every queued
//! operation with zero bytes and later calls do nothing. A receive that
//! completes with zero bytes means the peer closed the connection and stops
//! the endpoint the same way.
//!
//! # Operations
//!
//! Sends and receives are posted with a [`BufferLease`](crate::buffer::BufferLease)
//! and resolve to a [`Completion`] carrying the transferred byte count and the
//! lease. Backends see operations only as [`OpToken`]s into the endpoint's
//! [`OpRegistry`].

mod context;
#[allow(clippy::module_inception)]
mod endpoint;
mod status;

pub use context::{Completion, OpContext, OpFuture, OpRegistry, OpToken};
pub use endpoint::Endpoint;
pub use status::{Op, PathRole, Side, Status};
