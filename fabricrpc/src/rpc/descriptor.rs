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

//! RPC descriptors and handlers.

use crate::rpc::RpcId;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Static description of one RPC: its name, wire identifier and message types.
///
/// Usually derived with `#[derive(Rpc)]` on a unit struct. A manual
/// implementation must keep `ID` equal to `RpcId::from_name(NAME)`:
///
/// ```rust
/// use fabricrpc::rpc::{Rpc, RpcId};
///
/// struct Ping;
///
/// impl Rpc for Ping {
///     const NAME: &'static str = "ping";
///     const ID: RpcId = fabricrpc::rpc_id!("ping");
///     type Request = u64;
///     type Response = u64;
/// }
///
/// assert_eq!(Ping::ID, RpcId::from_name(Ping::NAME));
/// ```
pub trait Rpc: Send + Sync + 'static {
    /// Name the identifier is derived from.
    const NAME: &'static str;
    /// Wire identifier.
    const ID: RpcId;
    /// Message sent by the caller.
    type Request: Serialize + DeserializeOwned + Send + 'static;
    /// Message returned by the server.
    type Response: Serialize + DeserializeOwned + Send + 'static;
}

/// Server-side implementation of an RPC.
///
/// Handlers run on the serve workers and must not block for long: a worker
/// takes no new request until its handler returns.
pub trait RpcHandler: Rpc {
    fn handle(&self, request: Self::Request) -> Self::Response;
}
