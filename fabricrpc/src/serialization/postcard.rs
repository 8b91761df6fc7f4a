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

//! Postcard serializer.

use crate::serialization::{DeserializationError, SerializationError, Serializer};

/// Compact binary serializer based on `postcard`.
///
/// This is the default payload format. It writes directly into the leased
/// buffer and optionally rejects inputs above a size limit before decoding.
///
/// # Examples
///
/// ```rust
/// use fabricrpc::serialization::{PostcardSerializer, Serializer};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let serializer = PostcardSerializer::new().with_max_size(1024);
/// let bytes = serializer.serialize(&(7u32, "seven"))?;
/// let decoded: (u32, String) = serializer.deserialize(&bytes)?;
/// assert_eq!(decoded, (7, "seven".to_string()));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Clone, Debug, Default)]
pub struct PostcardSerializer {
    max_size: Option<usize>,
}

impl PostcardSerializer {
    /// Creates a serializer without a size limit.
    #[must_use]
    pub fn new() -> Self {
        Self { max_size: None }
    }

    /// Rejects inputs larger than `max_size` bytes on decode.
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }
}

impl Serializer for PostcardSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        postcard::to_allocvec(value).map_err(|e| SerializationError::encode(self.name(), e))
    }

    fn serialize_into<T>(&self, value: &T, buf: &mut [u8]) -> Result<usize, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        let capacity = buf.len();
        match postcard::to_slice(value, buf) {
            Ok(written) => Ok(written.len()),
            Err(postcard::Error::SerializeBufferFull) => Err(SerializationError::BufferTooSmall {
                format: self.name(),
                capacity,
            }),
            Err(e) => Err(SerializationError::encode(self.name(), e)),
        }
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        if let Some(limit) = self.max_size {
            if bytes.len() > limit {
                return Err(DeserializationError::Oversized {
                    size: bytes.len(),
                    limit,
                });
            }
        }
        postcard::from_bytes(bytes).map_err(|e| DeserializationError::decode(self.name(), e))
    }

    fn name(&self) -> &'static str {
        "postcard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Greeting {
        id: u32,
        text: String,
    }

    #[test]
    fn test_serialize_into_slice() {
        let serializer = PostcardSerializer::default();
        let greeting = Greeting {
            id: 1,
            text: "hi".to_string(),
        };
        let mut buf = [0xFFu8; 32];
        let written = serializer.serialize_into(&greeting, &mut buf).unwrap();
        assert_eq!(&buf[..written], serializer.serialize(&greeting).unwrap());

        let decoded: Greeting = serializer.deserialize(&buf[..written]).unwrap();
        assert_eq!(decoded, greeting);
    }

    #[test]
    fn test_serialize_into_small_buffer() {
        let serializer = PostcardSerializer::default();
        let greeting = Greeting {
            id: 1,
            text: "x".repeat(64),
        };
        let mut buf = [0u8; 8];
        let error = serializer.serialize_into(&greeting, &mut buf).unwrap_err();
        assert!(error.is_buffer_too_small());
    }

    #[test]
    fn test_invalid_bytes() {
        let serializer = PostcardSerializer::default();
        let result: Result<Greeting, _> = serializer.deserialize(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(result, Err(DeserializationError::Decode { format: "postcard", .. })));
    }

    #[test]
    fn test_max_size() {
        let serializer = PostcardSerializer::new().with_max_size(4);
        let bytes = PostcardSerializer::new()
            .serialize(&"longer than four")
            .unwrap();
        let result: Result<String, _> = serializer.deserialize(&bytes);
        assert!(matches!(result, Err(DeserializationError::Oversized { limit: 4, .. })));
    }
}
