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

//! Configuration for RPC transports.

use crate::endpoint::Side;
use crate::error::FabricError;
use crate::rpc::HEADER_LEN;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for an [`RpcTransport`](crate::rpc::RpcTransport).
///
/// # Examples
///
/// ```rust
/// use fabricrpc::config::TransportConfig;
/// use fabricrpc::endpoint::Side;
///
/// let config = TransportConfig::new(Side::Server)
///     .with_workers(8)
///     .with_max_rpc_msg_size(8192);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.pool_pieces(), 16);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Which side of the connection this transport establishes.
    ///
    /// Default: `Client`
    pub side: Side,

    /// Number of server workers, each with one receive outstanding.
    ///
    /// Also sizes the buffer pool: `2 * n_workers` pieces, so a client can
    /// have `n_workers` calls in flight.
    ///
    /// Default: 4
    pub n_workers: usize,

    /// Size of one pool piece and the largest frame, header included.
    ///
    /// Default: 4096
    pub max_rpc_msg_size: usize,

    /// Sleep of the transport poller after a round without progress.
    ///
    /// Default: zero (yield only)
    pub poll_backoff: Duration,

    /// Sleep between establishment and teardown polling rounds.
    ///
    /// Default: 10 µs
    pub establish_backoff: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            side: Side::Client,
            n_workers: 4,
            max_rpc_msg_size: 4096,
            poll_backoff: Duration::ZERO,
            establish_backoff: Duration::from_micros(10),
        }
    }
}

impl TransportConfig {
    /// Creates a default configuration for `side`.
    #[must_use]
    pub fn new(side: Side) -> Self {
        Self {
            side,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_workers(mut self, n_workers: usize) -> Self {
        self.n_workers = n_workers;
        self
    }

    #[must_use]
    pub fn with_max_rpc_msg_size(mut self, size: usize) -> Self {
        self.max_rpc_msg_size = size;
        self
    }

    #[must_use]
    pub fn with_poll_backoff(mut self, backoff: Duration) -> Self {
        self.poll_backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_establish_backoff(mut self, backoff: Duration) -> Self {
        self.establish_backoff = backoff;
        self
    }

    /// Number of pieces in the transport's buffer pool.
    #[must_use]
    pub fn pool_pieces(&self) -> usize {
        self.n_workers.saturating_mul(2)
    }

    /// Checks that the configuration can back a transport.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::InvalidConfiguration`] when there are no
    /// workers or a piece cannot hold a frame header plus payload.
    pub fn validate(&self) -> Result<(), FabricError> {
        if self.n_workers == 0 {
            return Err(FabricError::InvalidConfiguration {
                reason: "n_workers must be at least 1".to_string(),
            });
        }
        if self.max_rpc_msg_size <= HEADER_LEN {
            return Err(FabricError::InvalidConfiguration {
                reason: format!(
                    "max_rpc_msg_size {} does not exceed the {}-byte frame header",
                    self.max_rpc_msg_size, HEADER_LEN
                ),
            });
        }
        Ok(())
    }
}
