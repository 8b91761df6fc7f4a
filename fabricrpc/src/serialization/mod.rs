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

//! Payload serialization.
//!
//! The transport owns the frame header; everything after it belongs to a
//! [`Serializer`]. Serializers write straight into a leased pool piece with
//! [`Serializer::serialize_into`], so a request or response never needs a
//! separate heap buffer on the hot path.
//!
//! Two formats are provided:
//!
//! - [`PostcardSerializer`]: compact binary, the default
//! - [`JsonSerializer`]: human-readable, for debugging (requires the `json` feature)
//!
//! # Examples
//!
//! ```rust
//! use fabricrpc::serialization::{PostcardSerializer, Serializer};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Message {
//!     id: u32,
//!     text: String,
//! }
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let serializer = PostcardSerializer::default();
//! let message = Message { id: 42, text: "Hello".to_string() };
//!
//! let mut piece = [0u8; 64];
//! let written = serializer.serialize_into(&message, &mut piece)?;
//! let decoded: Message = serializer.deserialize(&piece[..written])?;
//! assert_eq!(message, decoded);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod error;
#[cfg(feature = "json")]
mod json;
mod postcard;
mod traits;

pub use error::{DeserializationError, SerializationError};
#[cfg(feature = "json")]
pub use json::JsonSerializer;
pub use postcard::PostcardSerializer;
pub use traits::Serializer;
