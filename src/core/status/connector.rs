//! Connection abstraction for dependency injection and testing

use crate::core::status::debug_logger::get_debug_logger;
use crate::core::status::types::{Endpoint, ProbeError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Bidirectional byte stream a probe runs over
pub trait ProbeStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ProbeStream for T {}

/// Opens one connection per probe
#[async_trait::async_trait]
pub trait StatusConnector: Send + Sync {
    /// Connect to `endpoint` within `timeout`
    ///
    /// Returns `ProbeError::Timeout` when the deadline passes and
    /// `ProbeError::Io` for refused, unreachable or unresolvable targets.
    async fn connect(&self, endpoint: &Endpoint, timeout: Duration) -> Result<Box<dyn ProbeStream>, ProbeError>;
}

/// Production connector over TCP
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait::async_trait]
impl StatusConnector for TcpConnector {
    async fn connect(&self, endpoint: &Endpoint, timeout: Duration) -> Result<Box<dyn ProbeStream>, ProbeError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect((endpoint.host.as_str(), endpoint.port)))
            .await
            .map_err(|_| ProbeError::Timeout {
                stage: "connect",
                timeout_ms: timeout.as_millis() as u64,
            })??;

        // Status packets are tiny; don't let Nagle hold the ping back
        if let Err(e) = stream.set_nodelay(true) {
            get_debug_logger().nodelay_failed(&endpoint.to_string(), &e.to_string());
        }
        Ok(Box::new(stream))
    }
}
