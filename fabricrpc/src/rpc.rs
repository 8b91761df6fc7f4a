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

//! Correlated request/response calls over a control path.
//!
//! An [`RpcTransport`] turns one established control endpoint into an RPC
//! channel. Every request travels in a single frame:
//!
//! ```text
//! +----------------+-----------------+-------------------+
//! | seq: i64 (LE)  | rpc_id: u64 (LE)| payload           |
//! +----------------+-----------------+-------------------+
//! ```
//!
//! Requests carry a positive sequence number drawn from a per-transport
//! counter; the response to a request carries the same number negated.
//! [`RpcId`]s are content hashes of the RPC name, so both sides agree on
//! them without a handshake.
//!
//! A caller pre-posts a receive for each call and spawns a task that matches
//! whatever frame arrives in that receive against the table of outstanding
//! calls. Receives complete in posting order, not call order, so the task
//! for one call may resolve another; each entry is resolved at most once.
//!
//! Nothing in this module drives the control endpoint. Attach a
//! [`TransportGuard`] for the lifetime of the calls or the serve loop.
//!
//! # Examples
//!
//! ```rust
//! use fabricrpc::Rpc;
//! use fabricrpc::rpc::{Rpc as _, RpcHandler};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! pub struct Greeting {
//!     pub id: u32,
//!     pub text: String,
//! }
//!
//! #[derive(Rpc)]
//! #[rpc(name = "echo", request = Greeting, response = Greeting)]
//! pub struct Echo;
//!
//! impl RpcHandler for Echo {
//!     fn handle(&self, request: Greeting) -> Greeting {
//!         Greeting { id: request.id + 1, text: format!("{}, World", request.text) }
//!     }
//! }
//!
//! assert_eq!(Echo::NAME, "echo");
//! assert_eq!(Echo::ID, fabricrpc::rpc_id!("echo"));
//! ```

mod descriptor;
mod error;
mod frame;
mod guard;
mod id;
mod outstanding;
mod sequence;
mod set;
mod transport;

pub use descriptor::{Rpc, RpcHandler};
pub use error::RpcError;
pub use frame::{FrameHeader, HEADER_LEN};
pub use guard::TransportGuard;
pub use id::RpcId;
pub use outstanding::{OutstandingRpcs, Pending, ResponseFuture};
pub use sequence::SequenceGenerator;
pub use set::{HandlerSet, RpcSet};
pub use transport::RpcTransport;
