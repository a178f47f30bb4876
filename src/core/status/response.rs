//! Status response reading
//!
//! The response packet (id 0x00) carries a single VarInt-prefixed JSON string.
//! Transport and framing problems are hard failures; a body that is not a JSON
//! object is a soft failure reported as `StatusPayload::Malformed`.

use crate::core::status::codec::take_prefixed;
use crate::core::status::framing::{expect_packet_id, read_packet};
use crate::core::status::types::ProbeError;
use serde_json::Value;
use tokio::io::AsyncRead;

pub const STATUS_RESPONSE_PACKET_ID: i32 = 0x00;

/// Parsed status document or the reason it could not be parsed
#[derive(Debug, Clone, PartialEq)]
pub enum StatusPayload {
    Parsed(Value),
    Malformed { reason: String },
}

/// Read the status response packet and return its JSON text
pub async fn read_status_response<R>(reader: &mut R) -> Result<String, ProbeError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let packet = read_packet(reader).await?;
    expect_packet_id(&packet, STATUS_RESPONSE_PACKET_ID)?;

    let mut body = packet.body.as_slice();
    let json = take_prefixed(&mut body)?;
    Ok(String::from_utf8_lossy(json).into_owned())
}

/// Parse status JSON; the document must be an object
pub fn parse_status_json(raw: &str) -> StatusPayload {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) if value.is_object() => StatusPayload::Parsed(value),
        Ok(_) => StatusPayload::Malformed {
            reason: "status document is not a JSON object".to_string(),
        },
        Err(e) => StatusPayload::Malformed {
            reason: format!("invalid status JSON: {}", e),
        },
    }
}
