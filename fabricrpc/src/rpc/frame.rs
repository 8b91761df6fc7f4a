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

//! Frame header encoding.

use crate::rpc::{RpcError, RpcId};
use bytes::{Buf, BufMut};

/// Size of the frame header: an `i64` sequence and a `u64` RPC identifier.
pub const HEADER_LEN: usize = 16;

/// Header at the start of every request and response frame.
///
/// # Examples
///
/// ```rust
/// use fabricrpc::rpc::{FrameHeader, RpcId, HEADER_LEN};
///
/// let header = FrameHeader { seq: 3, rpc_id: RpcId::from_raw(9) };
/// let mut frame = [0u8; HEADER_LEN + 2];
/// header.encode(&mut frame).unwrap();
/// frame[HEADER_LEN..].copy_from_slice(b"hi");
///
/// let (decoded, payload) = FrameHeader::decode(&frame).unwrap();
/// assert_eq!(decoded, header);
/// assert_eq!(payload, b"hi");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Positive for requests, the negated request sequence for responses.
    pub seq: i64,
    pub rpc_id: RpcId,
}

impl FrameHeader {
    /// Returns `true` if this header belongs to a response.
    #[must_use]
    pub fn is_response(&self) -> bool {
        self.seq < 0
    }

    /// Writes the header at the start of `buf`.
    pub fn encode(&self, buf: &mut [u8]) -> Result<(), RpcError> {
        if buf.len() < HEADER_LEN {
            return Err(RpcError::MessageTooLarge {
                size: HEADER_LEN,
                capacity: buf.len(),
            });
        }
        let mut dst = &mut buf[..HEADER_LEN];
        dst.put_i64_le(self.seq);
        dst.put_u64_le(self.rpc_id.get());
        Ok(())
    }

    /// Splits a frame into its header and payload.
    ///
    /// Returns `None` if the frame is shorter than a header.
    #[must_use]
    pub fn decode(frame: &[u8]) -> Option<(FrameHeader, &[u8])> {
        if frame.len() < HEADER_LEN {
            return None;
        }
        let (mut header, payload) = frame.split_at(HEADER_LEN);
        let seq = header.get_i64_le();
        let rpc_id = RpcId::from_raw(header.get_u64_le());
        Some((FrameHeader { seq, rpc_id }, payload))
    }
}
