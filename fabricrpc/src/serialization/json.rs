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

//! JSON serializer, for inspecting traffic while debugging.

use crate::serialization::{DeserializationError, SerializationError, Serializer};
use std::io::{self, Cursor};

/// Human-readable serializer based on `serde_json`.
#[derive(Clone, Debug, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for JsonSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        serde_json::to_vec(value).map_err(|e| SerializationError::encode(self.name(), e))
    }

    fn serialize_into<T>(&self, value: &T, buf: &mut [u8]) -> Result<usize, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        let capacity = buf.len();
        let mut cursor = Cursor::new(buf);
        match serde_json::to_writer(&mut cursor, value) {
            Ok(()) => Ok(cursor.position() as usize),
            Err(e) if e.io_error_kind() == Some(io::ErrorKind::WriteZero) => {
                Err(SerializationError::BufferTooSmall {
                    format: self.name(),
                    capacity,
                })
            }
            Err(e) => Err(SerializationError::encode(self.name(), e)),
        }
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(bytes).map_err(|e| DeserializationError::decode(self.name(), e))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_into_is_readable() {
        let serializer = JsonSerializer::new();
        let mut buf = [0u8; 64];
        let written = serializer
            .serialize_into(&("hi", 2u8), &mut buf)
            .unwrap();
        assert_eq!(&buf[..written], br#"["hi",2]"#);
        let decoded: (String, u8) = serializer.deserialize(&buf[..written]).unwrap();
        assert_eq!(decoded, ("hi".to_string(), 2));
    }

    #[test]
    fn test_serialize_into_small_buffer() {
        let serializer = JsonSerializer::new();
        let mut buf = [0u8; 4];
        let error = serializer
            .serialize_into(&"does not fit", &mut buf)
            .unwrap_err();
        assert!(error.is_buffer_too_small());
    }
}
