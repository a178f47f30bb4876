//! Packet framing
//!
//! Two outbound encodings coexist on the wire and both must be kept for
//! compatibility with real servers:
//!
//! - handshake and status request: `[len:u8][body]`
//! - ping: `[len:VarInt][body]`
//!
//! Inbound packets are always `[len:VarInt][id:VarInt][body]`.

use crate::core::status::codec::{decode_varint, read_varint, varint_len, write_varint};
use crate::core::status::types::{ProbeError, ProtocolError};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Upper bound on an inbound packet; real status responses stay far below it
pub const MAX_PACKET_LEN: usize = 2 * 1024 * 1024;

/// One inbound packet split into id and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub body: Vec<u8>,
}

/// Start a packet body with its VarInt id
pub fn packet_body(id: i32) -> Vec<u8> {
    let mut body = Vec::with_capacity(64);
    write_varint(&mut body, id);
    body
}

/// Frame with a single raw length byte (handshake and status request)
pub fn frame_short(body: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let len = u8::try_from(body.len()).map_err(|_| ProtocolError::PacketTooLarge(body.len()))?;
    let mut framed = Vec::with_capacity(body.len() + 1);
    framed.push(len);
    framed.extend_from_slice(body);
    Ok(framed)
}

/// Frame with a VarInt length prefix
pub fn frame(body: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if body.len() > MAX_PACKET_LEN {
        return Err(ProtocolError::PacketTooLarge(body.len()));
    }
    let len = body.len() as i32;
    let mut framed = Vec::with_capacity(varint_len(len) + body.len());
    write_varint(&mut framed, len);
    framed.extend_from_slice(body);
    Ok(framed)
}

/// Interpret an already length-delimited payload as `[id][body]`
pub fn split_packet(payload: &[u8]) -> Result<Packet, ProtocolError> {
    let mut cursor = payload;
    let id = decode_varint(&mut cursor)?;
    Ok(Packet {
        id,
        body: cursor.to_vec(),
    })
}

/// Read one framed packet from the stream
pub async fn read_packet<R>(reader: &mut R) -> Result<Packet, ProbeError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let declared = read_varint(reader).await?;
    let len = usize::try_from(declared)
        .ok()
        .filter(|len| *len <= MAX_PACKET_LEN)
        .ok_or(ProtocolError::InvalidLength(declared as i64))?;
    if len == 0 {
        return Err(ProtocolError::Truncated { needed: 1 }.into());
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| ProbeError::from_read(e, len))?;

    Ok(split_packet(&payload)?)
}

/// Check an inbound packet id
pub fn expect_packet_id(packet: &Packet, expected: i32) -> Result<(), ProtocolError> {
    if packet.id == expected {
        Ok(())
    } else {
        Err(ProtocolError::UnexpectedPacketId {
            expected,
            actual: packet.id,
        })
    }
}
