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

//! Hex dumps of frame contents for trace logging.

use std::fmt;

const ROW: usize = 16;

/// Formats a byte slice as an address header followed by rows of hex and ASCII.
///
/// Intended for `trace!` output; formatting happens only when the event is
/// actually recorded.
///
/// ```rust
/// use fabricrpc::observability::HexDump;
///
/// let dump = HexDump::new(b"hi").to_string();
/// assert!(dump.contains("Length:  2"));
/// assert!(dump.lines().last().unwrap().starts_with("00000000: 6869 "));
/// ```
#[derive(Clone, Copy)]
pub struct HexDump<'a> {
    bytes: &'a [u8],
}

impl<'a> HexDump<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address: {:#X}", self.bytes.as_ptr() as usize)?;
        write!(f, "\nLength:  {}", self.bytes.len())?;
        write!(f, "\nContent: ")?;
        for (row, chunk) in self.bytes.chunks(ROW).enumerate() {
            write!(f, "\n{:08x}: ", row * ROW)?;
            for column in 0..ROW {
                match chunk.get(column) {
                    Some(byte) => write!(f, "{byte:02X}")?,
                    None => f.write_str("  ")?,
                }
                if column % 2 == 1 {
                    f.write_str(" ")?;
                }
            }
            f.write_str(" ")?;
            for &byte in chunk {
                let c = if byte.is_ascii_graphic() || byte == b' ' {
                    byte as char
                } else {
                    '.'
                };
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hexdump_empty() {
        let dump = HexDump::new(&[]).to_string();
        assert!(dump.ends_with("Length:  0\nContent: "));
    }

    #[test]
    fn test_hexdump_rows() {
        let bytes: Vec<u8> = (0u8..20).collect();
        let dump = HexDump::new(&bytes).to_string();
        let rows: Vec<&str> = dump.lines().skip(3).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("00000000: 0001 0203 0405 0607 0809 0A0B 0C0D 0E0F "));
        assert!(rows[1].starts_with("00000010: 1011 1213 "));
        assert!(rows[1].ends_with(" ...."));
    }

    #[test]
    fn test_hexdump_ascii_column() {
        let dump = HexDump::new(b"hi, World\n").to_string();
        assert!(dump.ends_with(" hi, World."));
    }
}
