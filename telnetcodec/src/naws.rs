//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
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

//! Negotiate About Window Size
//!

use crate::consts;
use crate::result::{CodecError, CodecResult, SubnegotiationErrorKind};
use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, BufMut};

/// Terminal dimensions carried by a NAWS subnegotiation.
///
/// # Format
/// Four bytes, big-endian:
/// - 2 bytes for columns (width)
/// - 2 bytes for rows (height)
///
/// Payload bytes are carried raw. A dimension containing `0xFF` is not IAC-doubled on
/// encode and not collapsed on decode.
///
/// The default size is `(0,0)`, meaning the peer has not reported one yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct WindowSize {
    /// The number of columns (characters) in the terminal window
    pub cols: u16,
    /// The number of rows (lines) in the terminal window
    pub rows: u16,
}

impl WindowSize {
    /// Number of payload bytes in a NAWS subnegotiation.
    pub const ENCODED_LEN: usize = 4;

    /// Creates a new `WindowSize` with the specified columns and rows.
    pub fn new(cols: u16, rows: u16) -> Self {
        WindowSize { cols, rows }
    }

    /// Returns the encoded length of this `WindowSize` in bytes. Always `4`.
    pub fn len(&self) -> usize {
        Self::ENCODED_LEN
    }

    /// Encodes the four payload bytes into `dst`.
    ///
    /// # Returns
    /// `Ok(4)` on success, or a `CodecError` if the write fails.
    pub fn encode<T: BufMut>(&self, dst: &mut T) -> CodecResult<usize> {
        Ok(self.write(&mut dst.writer())?)
    }

    /// Writes the columns followed by the rows as big-endian u16 values.
    pub fn write<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<usize> {
        writer.write_u16::<BigEndian>(self.cols)?;
        writer.write_u16::<BigEndian>(self.rows)?;
        Ok(Self::ENCODED_LEN)
    }

    /// Encodes a complete `IAC SB NAWS <payload> IAC SE` frame into `dst`, as a client
    /// reporting its size would send it.
    pub fn encode_frame<T: BufMut>(&self, dst: &mut T) -> CodecResult<usize> {
        dst.put_slice(&[consts::IAC, consts::SB, consts::option::NAWS]);
        let payload = self.encode(dst)?;
        dst.put_slice(&[consts::IAC, consts::SE]);
        Ok(payload + 5)
    }

    /// Decodes the four payload bytes from `src`.
    ///
    /// # Errors
    /// Returns `CodecError::SubnegotiationError` with `InsufficientData` if
    /// fewer than 4 bytes are available in the buffer. Nothing is consumed in that case.
    pub fn decode<T: Buf>(src: &mut T) -> CodecResult<WindowSize> {
        if src.remaining() < Self::ENCODED_LEN {
            return Err(CodecError::SubnegotiationError {
                option: Some(consts::option::NAWS),
                reason: SubnegotiationErrorKind::InsufficientData {
                    required: Self::ENCODED_LEN,
                    available: src.remaining(),
                },
            });
        }
        let cols = src.get_u16();
        let rows = src.get_u16();
        Ok(WindowSize { cols, rows })
    }
}

impl std::fmt::Display for WindowSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.cols, self.rows)
    }
}

impl From<(u16, u16)> for WindowSize {
    fn from((cols, rows): (u16, u16)) -> Self {
        WindowSize::new(cols, rows)
    }
}
