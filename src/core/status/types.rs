// Core types for server status probing
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Default Minecraft server port used when an address carries none
pub const DEFAULT_PORT: u16 = 25565;

/// Version label used before a probe succeeds or when the server omits it
pub const UNKNOWN_VERSION: &str = "Unknown";

/// Description stored when the status document could not be parsed
pub const PARSE_FAILED_DESCRIPTION: &str = "Failed to parse response";

/// Latency sentinel for offline or never-probed servers
pub const UNKNOWN_LATENCY_MS: i64 = -1;

/// Probe target identity
///
/// Endpoints are immutable and compared by value, so two tracked servers that
/// point at the same `host:port` share one probe slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

/// Address parsing failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("server address is empty")]
    EmptyHost,
    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port` or `[v6]:port`
    ///
    /// A bare IPv6 literal (more than one colon, no brackets) is taken as a host
    /// without a port.
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(AddressError::EmptyHost);
        }

        if let Some(rest) = address.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| AddressError::InvalidPort(address.to_string()))?;
            if host.is_empty() {
                return Err(AddressError::EmptyHost);
            }
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(port)?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => return Err(AddressError::InvalidPort(tail.to_string())),
            };
            return Ok(Self::new(host, port));
        }

        if address.matches(':').count() > 1 {
            return Ok(Self::new(address, DEFAULT_PORT));
        }

        match address.split_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(AddressError::EmptyHost);
                }
                Ok(Self::new(host, parse_port(port)?))
            }
            None => Ok(Self::new(address, DEFAULT_PORT)),
        }
    }
}

fn parse_port(raw: &str) -> Result<u16, AddressError> {
    match raw.parse::<u16>() {
        Ok(0) | Err(_) => Err(AddressError::InvalidPort(raw.to_string())),
        Ok(port) => Ok(port),
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// One entry of the server-supplied player sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePlayer {
    pub name: String,
    pub id: String,
}

/// Mod loaders recognised from vendor extension keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModLoader {
    /// `forgeData` (1.13+) or legacy `modinfo` key present
    Forge,
}

/// Canonical status snapshot for one endpoint
///
/// Snapshots are immutable once published; every probe builds a fresh record
/// and the owning slot swaps it in as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub online: bool,
    pub version_name: String,
    pub protocol_version: i32,
    /// Raw favicon string as sent by the server (usually a PNG data URI)
    pub favicon: String,
    pub max_players: i32,
    pub online_players: i32,
    pub sample_players: Vec<SamplePlayer>,
    pub description: String,
    pub mod_loader: Option<ModLoader>,
    pub latency_ms: i64,
    /// Epoch milliseconds of the last probe attempt, 0 before the first one
    pub last_checked_epoch_ms: i64,
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self {
            online: false,
            version_name: UNKNOWN_VERSION.to_string(),
            protocol_version: 0,
            favicon: String::new(),
            max_players: 0,
            online_players: 0,
            sample_players: Vec::new(),
            description: String::new(),
            mod_loader: None,
            latency_ms: UNKNOWN_LATENCY_MS,
            last_checked_epoch_ms: 0,
        }
    }
}

impl StatusRecord {
    /// True iff the status document carried a vendor extension key
    pub fn mod_loader_detected(&self) -> bool {
        self.mod_loader.is_some()
    }

    /// Canonical offline state derived from the previous snapshot
    ///
    /// Static metadata (version, favicon, description, slots) is kept so a
    /// collaborator can still show what the server looked like last time.
    pub fn offline(&self, now_epoch_ms: i64) -> Self {
        Self {
            online: false,
            online_players: 0,
            sample_players: Vec::new(),
            latency_ms: UNKNOWN_LATENCY_MS,
            last_checked_epoch_ms: now_epoch_ms,
            ..self.clone()
        }
    }

    /// Offline state for a server that answered with an unreadable document
    pub fn parse_failed(&self, now_epoch_ms: i64) -> Self {
        Self {
            version_name: UNKNOWN_VERSION.to_string(),
            protocol_version: 0,
            max_players: 0,
            description: PARSE_FAILED_DESCRIPTION.to_string(),
            ..self.offline(now_epoch_ms)
        }
    }
}

/// Wire-level protocol violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("VarInt is longer than 5 bytes")]
    VarIntTooLong,
    #[error("truncated input: {needed} more byte(s) needed")]
    Truncated { needed: usize },
    #[error("unexpected packet id 0x{actual:02x} (expected 0x{expected:02x})")]
    UnexpectedPacketId { expected: i32, actual: i32 },
    #[error("invalid length prefix {0}")]
    InvalidLength(i64),
    #[error("packet body of {0} bytes does not fit its length prefix")]
    PacketTooLarge(usize),
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
}

/// Failure of one probe stage
///
/// Every variant ends the probe in the offline state; none of them escape the
/// orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{stage} timed out after {timeout_ms}ms")]
    Timeout { stage: &'static str, timeout_ms: u64 },
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ProbeError {
    /// Map a failed exact read, turning EOF into a truncation
    pub(crate) fn from_read(err: io::Error, needed: usize) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ProbeError::Protocol(ProtocolError::Truncated { needed })
        } else {
            ProbeError::Io(err)
        }
    }
}

/// Why a probe ended offline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OfflineReason {
    /// Refused, reset, unreachable, closed
    Connection(String),
    /// Connect or I/O deadline elapsed
    Timeout(String),
    /// Unexpected packet id, oversized VarInt, short read
    Protocol(String),
    /// Status JSON could not be parsed
    MalformedPayload(String),
}

impl From<&ProbeError> for OfflineReason {
    fn from(err: &ProbeError) -> Self {
        match err {
            ProbeError::Io(_) => OfflineReason::Connection(err.to_string()),
            ProbeError::Timeout { .. } => OfflineReason::Timeout(err.to_string()),
            ProbeError::Protocol(_) => OfflineReason::Protocol(err.to_string()),
        }
    }
}

impl OfflineReason {
    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            OfflineReason::Connection(_) => "connection",
            OfflineReason::Timeout(_) => "timeout",
            OfflineReason::Protocol(_) => "protocol",
            OfflineReason::MalformedPayload(_) => "malformed_payload",
        }
    }
}

/// Result of one probe call
///
/// A probe never returns an error: it either publishes a new snapshot or
/// skips because another probe for the same endpoint is in flight.
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    Online(std::sync::Arc<StatusRecord>),
    Offline {
        record: std::sync::Arc<StatusRecord>,
        reason: OfflineReason,
    },
    /// Duplicate probe; the record was left untouched
    Skipped,
}

impl ProbeOutcome {
    pub fn record(&self) -> Option<&std::sync::Arc<StatusRecord>> {
        match self {
            ProbeOutcome::Online(record) => Some(record),
            ProbeOutcome::Offline { record, .. } => Some(record),
            ProbeOutcome::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ProbeOutcome::Skipped)
    }

    pub fn is_online(&self) -> bool {
        matches!(self, ProbeOutcome::Online(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Online(_) => "online",
            ProbeOutcome::Offline { .. } => "offline",
            ProbeOutcome::Skipped => "skipped",
        }
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
