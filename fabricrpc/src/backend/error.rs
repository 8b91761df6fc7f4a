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

//! Backend error types.
//!
//! Backend errors are the lowest layer of the error hierarchy. They come from
//! the substrate a backend drives (sockets, in-process queues) and are never
//! retried by the core: a backend error during establishment aborts the
//! establishment, and a backend error while running stops the endpoint.

use std::io;
use thiserror::Error;

/// Errors raised by a [`Backend`](crate::backend::Backend).
///
/// # Examples
///
/// ```rust
/// use fabricrpc::backend::BackendError;
/// use std::io;
///
/// let error = BackendError::ConnectionFailed {
///     address: "127.0.0.1:7000".to_string(),
///     source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
/// };
/// assert!(error.is_connection_error());
/// assert!(error.to_string().contains("127.0.0.1:7000"));
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// The listening socket could not be bound.
    #[error("failed to bind to {address}: {source}")]
    BindFailed {
        /// The address that failed to bind
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The active side could not reach the peer.
    #[error("failed to connect to {address}: {source}")]
    ConnectionFailed {
        /// The address that failed to connect
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A read, write or accept failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[from]
        source: io::Error,
    },

    /// The peer announced a message larger than the receive buffer.
    #[error("incoming frame of {size} bytes exceeds the {capacity}-byte receive buffer")]
    FrameTooLarge {
        /// Announced message size
        size: usize,
        /// Capacity of the posted receive buffer
        capacity: usize,
    },

    /// The backend was configured with unusable parameters.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
    },

    /// The link is already closed.
    #[error("link is closed")]
    Closed,
}

impl BackendError {
    /// Returns `true` for failures to establish a link.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::BindFailed { .. } | Self::ConnectionFailed { .. })
    }

    /// Returns `true` when the error reports that the link went away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Closed => true,
            Self::Io { source } => matches!(
                source.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_conversion() {
        let error: BackendError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(error, BackendError::Io { .. }));
        assert!(error.is_closed());
        assert!(!error.is_connection_error());
    }

    #[test]
    fn test_frame_too_large_display() {
        let error = BackendError::FrameTooLarge {
            size: 9000,
            capacity: 4096,
        };
        assert_eq!(
            error.to_string(),
            "incoming frame of 9000 bytes exceeds the 4096-byte receive buffer"
        );
    }

    #[test]
    fn test_bind_failed_is_connection_error() {
        let error = BackendError::BindFailed {
            address: "0.0.0.0:1".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(error.is_connection_error());
        assert!(!error.is_closed());
    }
}
