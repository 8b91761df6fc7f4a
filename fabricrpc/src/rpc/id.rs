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

//! RPC identifiers.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Wire identifier of an RPC.
///
/// The identifier is the first eight bytes of the SHA-256 digest of the RPC
/// name, read little-endian. `#[derive(Rpc)]` and [`rpc_id!`](crate::rpc_id)
/// compute the same value at compile time.
///
/// # Examples
///
/// ```rust
/// use fabricrpc::rpc::RpcId;
///
/// let id = RpcId::from_name("echo");
/// assert_eq!(id, fabricrpc::rpc_id!("echo"));
/// assert_ne!(id, RpcId::from_name("hello"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RpcId(u64);

impl RpcId {
    /// Wraps an identifier read from the wire or computed ahead of time.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Hashes an RPC name into its identifier.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        Self(u64::from_le_bytes(prefix))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_stable() {
        // sha256("echo") starts with 09 2c 79 e8 f8 0e 55 9e
        assert_eq!(RpcId::from_name("echo").get(), 0x9e55_0ef8_e879_2c09);
        assert_eq!(RpcId::from_name("echo"), RpcId::from_name("echo"));
    }

    #[test]
    fn test_display_is_padded_hex() {
        assert_eq!(RpcId::from_raw(0xAB).to_string(), "0x00000000000000ab");
    }
}
