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

//! Top-level error type for fabricrpc.
//!
//! Errors are layered the way the crate is:
//!
//! 1. **Backend**: link and I/O failures ([`BackendError`])
//! 2. **RPC**: call and serve failures ([`RpcError`])
//! 3. **Configuration**: values rejected before anything is set up
//!
//! [`FabricError`] composes them for the lifecycle entry points
//! (establishing, polling and closing a transport). Protocol violations have
//! no variant here: they are logged and terminate the process.
//!
//! # Examples
//!
//! ```rust
//! use fabricrpc::FabricError;
//! use fabricrpc::backend::BackendError;
//! use fabricrpc::rpc::RpcError;
//!
//! let error: FabricError = BackendError::Closed.into();
//! assert!(error.is_backend_error());
//! assert!(error.is_connection_closed());
//!
//! let error: FabricError = RpcError::ConnectionClosed.into();
//! assert!(error.is_rpc_error());
//! assert!(error.is_connection_closed());
//! ```

use crate::backend::BackendError;
use crate::rpc::RpcError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for fabricrpc operations.
#[derive(Debug)]
pub enum FabricError {
    /// The backend failed while establishing, polling or tearing down.
    Backend(BackendError),

    /// A call or the serve loop failed.
    Rpc(RpcError),

    /// A configuration value was rejected.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fabricrpc::config::TransportConfig;
    ///
    /// let error = TransportConfig::default().with_workers(0).validate().unwrap_err();
    /// assert!(error.is_configuration_error());
    /// ```
    InvalidConfiguration {
        /// What was wrong with it
        reason: String,
    },
}

impl FabricError {
    #[must_use]
    pub const fn is_backend_error(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    #[must_use]
    pub const fn is_rpc_error(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }

    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::InvalidConfiguration { .. })
    }

    /// Returns `true` if the peer or the local side closed the connection.
    #[must_use]
    pub fn is_connection_closed(&self) -> bool {
        match self {
            Self::Backend(e) => e.is_closed(),
            Self::Rpc(e) => e.is_closed(),
            Self::InvalidConfiguration { .. } => false,
        }
    }
}

impl fmt::Display for FabricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(e) => write!(f, "backend error: {}", e),
            Self::Rpc(e) => write!(f, "rpc error: {}", e),
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid configuration: {}", reason)
            }
        }
    }
}

impl StdError for FabricError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Backend(e) => Some(e),
            Self::Rpc(e) => Some(e),
            Self::InvalidConfiguration { .. } => None,
        }
    }
}

impl From<BackendError> for FabricError {
    fn from(error: BackendError) -> Self {
        Self::Backend(error)
    }
}

impl From<RpcError> for FabricError {
    fn from(error: RpcError) -> Self {
        Self::Rpc(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_is_backend_error() {
        let error = FabricError::from(BackendError::from(io::Error::other("reset")));
        assert!(error.is_backend_error());
        assert!(!error.is_rpc_error());
        assert!(!error.is_configuration_error());
        assert!(error.source().is_some());
    }

    #[test]
    fn test_is_rpc_error() {
        let error = FabricError::from(RpcError::MessageTooLarge {
            size: 10,
            capacity: 4,
        });
        assert!(error.is_rpc_error());
        assert!(!error.is_connection_closed());
    }

    #[test]
    fn test_configuration_error_display() {
        let error = FabricError::InvalidConfiguration {
            reason: "n_workers must be at least 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "invalid configuration: n_workers must be at least 1"
        );
        assert!(error.source().is_none());
        assert!(!error.is_connection_closed());
    }

    #[test]
    fn test_connection_closed_through_layers() {
        assert!(FabricError::from(BackendError::Closed).is_connection_closed());
        assert!(FabricError::from(RpcError::Backend(BackendError::Closed)).is_connection_closed());
    }
}
