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

//! RPC error types.

use crate::backend::BackendError;
use crate::serialization::{DeserializationError, SerializationError};
use thiserror::Error;

/// Errors returned by calls and the serve loop.
///
/// Peer closure surfaces as [`RpcError::ConnectionClosed`]. Protocol
/// violations are not represented here; they terminate the process.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The backend failed underneath the transport.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A request or response could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// A request or response could not be decoded.
    #[error("deserialization error: {0}")]
    Deserialization(#[from] DeserializationError),

    /// A frame does not fit in one pool piece.
    #[error("message of {size} bytes exceeds the {capacity}-byte piece size")]
    MessageTooLarge {
        /// Required frame size
        size: usize,
        /// Size of a pool piece
        capacity: usize,
    },

    /// The connection closed before the call completed.
    #[error("connection closed")]
    ConnectionClosed,
}

impl RpcError {
    /// Returns `true` if the call failed because the connection went away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match self {
            Self::ConnectionClosed => true,
            Self::Backend(e) => e.is_closed(),
            _ => false,
        }
    }
}
