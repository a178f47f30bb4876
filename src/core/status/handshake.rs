//! Outbound half of a status query: handshake followed by status request

use crate::core::status::codec::{write_string, write_varint};
use crate::core::status::framing::{frame_short, packet_body};
use crate::core::status::types::{Endpoint, ProbeError, ProtocolError};
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const HANDSHAKE_PACKET_ID: i32 = 0x00;

/// Protocol version sent in the handshake; servers answer status queries
/// regardless of the value
pub const UNKNOWN_PROTOCOL_VERSION: i32 = -1;

/// Handshake `next state` selecting the status exchange
pub const NEXT_STATE_STATUS: i32 = 1;

/// Status request: length 1, packet id 0x00, empty body
pub const STATUS_REQUEST: [u8; 2] = [0x01, 0x00];

/// Build the framed handshake packet for `endpoint`
///
/// Fails with `PacketTooLarge` when the host name pushes the body past the
/// single-byte length prefix.
pub fn build_handshake(endpoint: &Endpoint) -> Result<Vec<u8>, ProtocolError> {
    let mut body = packet_body(HANDSHAKE_PACKET_ID);
    write_varint(&mut body, UNKNOWN_PROTOCOL_VERSION);
    write_string(&mut body, &endpoint.host)?;
    body.extend_from_slice(&endpoint.port.to_be_bytes());
    write_varint(&mut body, NEXT_STATE_STATUS);
    frame_short(&body)
}

/// Write and flush handshake and status request before any read begins
pub async fn send_status_request<W>(writer: &mut W, endpoint: &Endpoint) -> Result<(), ProbeError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let handshake = build_handshake(endpoint)?;
    writer.write_all(&handshake).await?;
    writer.flush().await?;

    writer.write_all(&STATUS_REQUEST).await?;
    writer.flush().await?;
    Ok(())
}
