pub mod codec;
pub mod connector;
pub mod debug_logger;
pub mod extract;
pub mod framing;
pub mod handshake;
pub mod latency;
pub mod monitor;
pub mod prober;
pub mod response;
pub mod types;

// Re-export commonly used items
pub use connector::{ProbeStream, StatusConnector, TcpConnector};
pub use debug_logger::{get_debug_logger, EnhancedDebugLogger, RotationPolicy};
pub use monitor::{ServerMonitor, TrackedServer};
pub use prober::{ClockTrait, EndpointSlot, ProbeOptions, StatusProber, SystemClock};
pub use types::*;
