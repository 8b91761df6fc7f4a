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

//! Serialization error types.

use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error raised by the underlying format crate.
pub type FormatError = Box<dyn StdError + Send + Sync>;

/// A value could not be encoded.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// The format rejected the value.
    #[error("{format} encoding failed: {source}")]
    Encode {
        /// Name of the serializer
        format: &'static str,
        /// Error reported by the format
        #[source]
        source: FormatError,
    },

    /// The encoded value does not fit in the destination buffer.
    #[error("encoded {format} value does not fit in {capacity} bytes")]
    BufferTooSmall {
        /// Name of the serializer
        format: &'static str,
        /// Size of the destination buffer
        capacity: usize,
    },
}

impl SerializationError {
    /// Wraps an error reported by the format crate.
    pub fn encode(format: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Encode {
            format,
            source: Box::new(source),
        }
    }

    /// Returns `true` if a larger buffer would have been enough.
    #[must_use]
    pub const fn is_buffer_too_small(&self) -> bool {
        matches!(self, Self::BufferTooSmall { .. })
    }
}

/// Bytes could not be decoded into a value.
#[derive(Debug, Error)]
pub enum DeserializationError {
    /// The bytes are not a valid encoding of the requested type.
    #[error("{format} decoding failed: {source}")]
    Decode {
        /// Name of the serializer
        format: &'static str,
        /// Error reported by the format
        #[source]
        source: FormatError,
    },

    /// The input exceeds the serializer's size limit.
    #[error("payload of {size} bytes exceeds the {limit}-byte limit")]
    Oversized {
        /// Size of the input
        size: usize,
        /// Configured limit
        limit: usize,
    },
}

impl DeserializationError {
    /// Wraps an error reported by the format crate.
    pub fn decode(format: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Decode {
            format,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_encode_display_and_source() {
        let error = SerializationError::encode("postcard", io::Error::other("boom"));
        assert_eq!(error.to_string(), "postcard encoding failed: boom");
        assert!(error.source().is_some());
        assert!(!error.is_buffer_too_small());
    }

    #[test]
    fn test_buffer_too_small() {
        let error = SerializationError::BufferTooSmall {
            format: "json",
            capacity: 16,
        };
        assert!(error.is_buffer_too_small());
        assert_eq!(error.to_string(), "encoded json value does not fit in 16 bytes");
    }

    #[test]
    fn test_oversized_display() {
        let error = DeserializationError::Oversized { size: 10, limit: 4 };
        assert_eq!(error.to_string(), "payload of 10 bytes exceeds the 4-byte limit");
    }
}
