//! VarInt and string primitives of the Minecraft protocol
//!
//! VarInts carry 7 payload bits per byte, least significant group first, with
//! the high bit flagging continuation. Negative values are encoded over their
//! two's-complement bit pattern and always take 5 bytes.

use crate::core::status::types::{ProbeError, ProtocolError};
use tokio::io::{AsyncRead, AsyncReadExt};

/// A 32-bit value never needs more than 5 groups of 7 bits
pub const MAX_VARINT_BYTES: usize = 5;

const SEGMENT_BITS: u8 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

/// Append the VarInt encoding of `value` to `buf`
pub fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !(SEGMENT_BITS as u32) == 0 {
            buf.push(value as u8);
            return;
        }
        buf.push((value as u8 & SEGMENT_BITS) | CONTINUE_BIT);
        value >>= 7;
    }
}

pub fn encode_varint(value: i32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_VARINT_BYTES);
    write_varint(&mut buf, value);
    buf
}

/// Number of bytes `value` occupies on the wire
pub fn varint_len(value: i32) -> usize {
    let bits = 32 - (value as u32).leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

/// Decode a VarInt from the front of `input`, advancing it
pub fn decode_varint(input: &mut &[u8]) -> Result<i32, ProtocolError> {
    let mut value: u32 = 0;
    for position in 0..MAX_VARINT_BYTES {
        let (&byte, rest) = input
            .split_first()
            .ok_or(ProtocolError::Truncated { needed: 1 })?;
        *input = rest;
        value |= ((byte & SEGMENT_BITS) as u32) << (7 * position);
        if byte & CONTINUE_BIT == 0 {
            return Ok(value as i32);
        }
    }
    Err(ProtocolError::VarIntTooLong)
}

/// Read a VarInt byte by byte from a stream
pub async fn read_varint<R>(reader: &mut R) -> Result<i32, ProbeError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut value: u32 = 0;
    for position in 0..MAX_VARINT_BYTES {
        let byte = reader
            .read_u8()
            .await
            .map_err(|e| ProbeError::from_read(e, 1))?;
        value |= ((byte & SEGMENT_BITS) as u32) << (7 * position);
        if byte & CONTINUE_BIT == 0 {
            return Ok(value as i32);
        }
    }
    Err(ProtocolError::VarIntTooLong.into())
}

/// Append a VarInt-prefixed UTF-8 string
pub fn write_string(buf: &mut Vec<u8>, value: &str) -> Result<(), ProtocolError> {
    let len = i32::try_from(value.len()).map_err(|_| ProtocolError::PacketTooLarge(value.len()))?;
    write_varint(buf, len);
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

pub fn encode_string(value: &str) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::with_capacity(value.len() + MAX_VARINT_BYTES);
    write_string(&mut buf, value)?;
    Ok(buf)
}

/// Split the declared number of bytes off the front of `input`
pub fn take_prefixed<'a>(input: &mut &'a [u8]) -> Result<&'a [u8], ProtocolError> {
    let declared = decode_varint(input)?;
    let len = usize::try_from(declared).map_err(|_| ProtocolError::InvalidLength(declared as i64))?;
    if input.len() < len {
        return Err(ProtocolError::Truncated {
            needed: len - input.len(),
        });
    }
    let (bytes, rest) = input.split_at(len);
    *input = rest;
    Ok(bytes)
}

/// Decode a VarInt-prefixed UTF-8 string, advancing `input`
pub fn decode_string(input: &mut &[u8]) -> Result<String, ProtocolError> {
    let bytes = take_prefixed(input)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
}
