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

//! The [`Serializer`] trait.

use crate::serialization::{DeserializationError, SerializationError};

/// Encodes and decodes RPC payloads.
///
/// Implementations must be thread-safe: one serializer is shared by every
/// caller and worker of a transport.
///
/// # Implementing a serializer
///
/// Only [`serialize`](Self::serialize), [`deserialize`](Self::deserialize)
/// and [`name`](Self::name) are required. The provided
/// [`serialize_into`](Self::serialize_into) goes through an intermediate
/// vector; formats that can write into a slice should override it.
///
/// ```rust
/// use fabricrpc::serialization::{DeserializationError, SerializationError, Serializer};
///
/// struct Utf8Only;
///
/// impl Serializer for Utf8Only {
///     fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
///     where
///         T: serde::Serialize + ?Sized,
///     {
///         postcard::to_allocvec(value).map_err(|e| SerializationError::encode(self.name(), e))
///     }
///
///     fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
///     where
///         T: serde::de::DeserializeOwned,
///     {
///         postcard::from_bytes(bytes).map_err(|e| DeserializationError::decode(self.name(), e))
///     }
///
///     fn name(&self) -> &'static str {
///         "utf8-only"
///     }
/// }
/// ```
pub trait Serializer: Send + Sync + 'static {
    /// Encodes `value` into a new vector.
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized;

    /// Encodes `value` at the start of `buf` and returns the bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::BufferTooSmall`] if the encoding does not
    /// fit in `buf`.
    fn serialize_into<T>(&self, value: &T, buf: &mut [u8]) -> Result<usize, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        let bytes = self.serialize(value)?;
        let Some(dest) = buf.get_mut(..bytes.len()) else {
            return Err(SerializationError::BufferTooSmall {
                format: self.name(),
                capacity: buf.len(),
            });
        };
        dest.copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    /// Decodes a value from `bytes`.
    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned;

    /// Short name of the format, used in errors and logs.
    fn name(&self) -> &'static str;
}
