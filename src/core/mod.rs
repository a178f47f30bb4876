pub mod status;

pub use status::{ServerMonitor, StatusProber};
