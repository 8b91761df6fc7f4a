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

//! # fabricrpc
//!
//! A backend-agnostic RPC transport core: pooled message buffers, an explicit
//! endpoint lifecycle, predicate-polled connection establishment and
//! correlated request/response calls over a single control path.
//!
//! ## Layers
//!
//! - [`buffer`]: fixed-size pieces carved out of one region, leased and
//!   returned without blocking
//! - [`backend`]: the [`Backend`](backend::Backend) trait plus in-process and
//!   TCP implementations
//! - [`endpoint`]: one path of a connection, moving through
//!   `Idle -> Ready -> Running -> Stopping -> Exited`
//! - [`connection`]: establishes and tears down a set of endpoints together
//! - [`progress`]: the pull-based completion loop
//! - [`rpc`]: sequence-correlated calls, the serve loop and the transport
//!   poller
//!
//! ## Quick start
//!
//! ```rust
//! use fabricrpc::backend::MemoryBackend;
//! use fabricrpc::config::TransportConfig;
//! use fabricrpc::endpoint::Side;
//! use fabricrpc::rpc::{RpcHandler, RpcTransport, TransportGuard};
//! use fabricrpc::Rpc;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! pub struct Hello {
//!     pub id: u32,
//!     pub msg: String,
//! }
//!
//! #[derive(Rpc)]
//! #[rpc(name = "echo", request = Hello, response = Hello)]
//! pub struct Echo;
//!
//! impl RpcHandler for Echo {
//!     fn handle(&self, request: Hello) -> Hello {
//!         Hello { id: request.id + 1, msg: format!("{}, World", request.msg) }
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (server_backend, client_backend) = MemoryBackend::pair();
//! let (server, client) = tokio::try_join!(
//!     RpcTransport::<_, ()>::establish(TransportConfig::new(Side::Server), server_backend),
//!     RpcTransport::<_, (Echo,)>::establish(TransportConfig::new(Side::Client), client_backend),
//! )?;
//!
//! let serving = async {
//!     let guard = TransportGuard::attach(&server);
//!     server.serve((Echo,)).await?;
//!     guard.detach().await?;
//!     server.close().await
//! };
//! let calling = async {
//!     let guard = TransportGuard::attach(&client);
//!     let reply = client
//!         .call::<Echo>(&Hello { id: 1, msg: "hi".to_string() })
//!         .await?
//!         .await?;
//!     assert_eq!(reply, Hello { id: 2, msg: "hi, World".to_string() });
//!     guard.detach().await?;
//!     client.close().await
//! };
//! let (served, called) = tokio::join!(serving, calling);
//! served?;
//! called?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure model
//!
//! - Backend faults are returned as [`BackendError`](backend::BackendError),
//!   wrapped in [`RpcError`](rpc::RpcError) or [`FabricError`]
//! - A peer closing the connection resolves pending operations with zero
//!   bytes and pending calls with `ConnectionClosed`
//! - An empty buffer pool makes callers yield and retry
//! - Protocol violations (illegal state transitions, unmatched responses,
//!   unknown RPC ids, foreign buffers) are logged and abort the process
//!
//! ## Features
//!
//! - `tcp` (default): the [`TcpBackend`](backend::TcpBackend)
//! - `json`: the [`JsonSerializer`](serialization::JsonSerializer)
//! - `observability`: mirrors [`TransportMetrics`] to the `metrics` facade

#![warn(clippy::all)]
#![deny(unsafe_code)]

extern crate self as fabricrpc;

pub mod backend;
pub mod buffer;
pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
mod fatal;
pub mod observability;
pub mod progress;
pub mod rpc;
pub mod serialization;

pub use fabricrpc_macros::{Rpc, rpc_id};

pub use backend::{Backend, BackendError, BackendKind, LinkState, MemoryBackend};
#[cfg(feature = "tcp")]
pub use backend::{TcpBackend, TcpConfig};
pub use buffer::{BufferLease, BufferPool};
pub use config::TransportConfig;
pub use connection::ConnectionHandle;
pub use endpoint::{Endpoint, PathRole, Side, Status};
pub use error::FabricError;
pub use observability::TransportMetrics;
pub use rpc::{Rpc, RpcError, RpcHandler, RpcId, RpcTransport, TransportGuard};
pub use serialization::{PostcardSerializer, Serializer};
