//! Ping/pong latency measurement over an already open status connection

use crate::core::status::framing::{expect_packet_id, frame, packet_body, read_packet};
use crate::core::status::prober::ClockTrait;
use crate::core::status::types::{ProbeError, ProtocolError};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

pub const PING_PACKET_ID: i32 = 0x01;
pub const PONG_PACKET_ID: i32 = 0x01;

const PAYLOAD_LEN: usize = 8;

/// One round trip measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySample {
    pub latency_ms: i64,
    pub sent_payload: i64,
    pub echoed_payload: i64,
}

impl LatencySample {
    /// Servers should echo the payload; a mismatch is reported but tolerated
    pub fn payload_matches(&self) -> bool {
        self.sent_payload == self.echoed_payload
    }
}

/// Build the VarInt-framed ping packet
pub fn build_ping(payload: i64) -> Result<Vec<u8>, ProtocolError> {
    let mut body = packet_body(PING_PACKET_ID);
    body.extend_from_slice(&payload.to_be_bytes());
    frame(&body)
}

/// Send a timestamped ping and time the pong with the monotonic clock
pub async fn measure_latency<S>(stream: &mut S, clock: &dyn ClockTrait) -> Result<LatencySample, ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let sent_payload = clock.epoch_millis();
    let ping = build_ping(sent_payload)?;

    let start = clock.now();
    stream.write_all(&ping).await?;
    stream.flush().await?;

    let packet = read_packet(stream).await?;
    expect_packet_id(&packet, PONG_PACKET_ID)?;

    let payload: [u8; PAYLOAD_LEN] = packet
        .body
        .get(..PAYLOAD_LEN)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(ProtocolError::Truncated {
            needed: PAYLOAD_LEN.saturating_sub(packet.body.len()),
        })?;
    let elapsed = clock.now().saturating_duration_since(start);

    Ok(LatencySample {
        latency_ms: (elapsed.as_nanos() / 1_000_000) as i64,
        sent_payload,
        echoed_payload: i64::from_be_bytes(payload),
    })
}

