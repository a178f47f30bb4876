/*!
Status probe orchestration.

`StatusProber` runs one Server List Ping exchange against an endpoint and
publishes the resulting `StatusRecord` into that endpoint's `EndpointSlot`.

## Probe lifecycle

`Idle → Probing → {Success, Offline}`

- The slot's probing flag is claimed before the socket is opened. A second
  probe for the same endpoint while the flag is held returns
  `ProbeOutcome::Skipped` without touching the record.
- Handshake and status request are sent, the status document is read and
  extracted, then latency is measured over the same connection.
- Any I/O error, deadline or protocol violation ends in the offline record.
  An unparseable document ends in the parse-failure offline record.
- The socket is dropped before the flag is released. Release happens in
  `Drop`, so early returns, panics and cancelled futures all free the slot.
*/

use crate::core::status::connector::{StatusConnector, TcpConnector};
use crate::core::status::debug_logger::get_debug_logger;
use crate::core::status::extract::extract_status;
use crate::core::status::handshake::send_status_request;
use crate::core::status::latency::measure_latency;
use crate::core::status::response::{parse_status_json, read_status_response, StatusPayload};
use crate::core::status::types::*;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Clock abstraction for dependency injection and testing
pub trait ClockTrait: Send + Sync {
    /// Monotonic instant used for latency measurement
    fn now(&self) -> Instant;
    /// Wall-clock epoch milliseconds used for timestamps and ping payloads
    fn epoch_millis(&self) -> i64;
}

/// Production clock implementation using system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockTrait for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_millis(&self) -> i64 {
        epoch_millis()
    }
}

/// Probe deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Deadline for establishing the TCP connection
    pub connect_timeout: Duration,
    /// Deadline applied to each request/response stage
    pub read_timeout: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(5000),
            read_timeout: Duration::from_millis(5000),
        }
    }
}

/// Per-endpoint probe state: the exclusivity flag and the latest snapshot
#[derive(Debug)]
pub struct EndpointSlot {
    probing: AtomicBool,
    record: RwLock<Arc<StatusRecord>>,
}

impl Default for EndpointSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointSlot {
    pub fn new() -> Self {
        Self::with_record(StatusRecord::default())
    }

    pub fn with_record(record: StatusRecord) -> Self {
        Self {
            probing: AtomicBool::new(false),
            record: RwLock::new(Arc::new(record)),
        }
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<StatusRecord> {
        match self.record.read() {
            Ok(record) => Arc::clone(&record),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn is_probing(&self) -> bool {
        self.probing.load(Ordering::Acquire)
    }

    /// Claim the probing flag; `None` if a probe is already in flight
    fn try_begin(&self) -> Option<ProbeGuard<'_>> {
        self.probing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProbeGuard { flag: &self.probing })
    }

    /// Swap in a whole new snapshot
    fn publish(&self, record: Arc<StatusRecord>) {
        match self.record.write() {
            Ok(mut current) => *current = record,
            Err(poisoned) => *poisoned.into_inner() = record,
        }
    }
}

/// Releases the probing flag when dropped
struct ProbeGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Result of the network pipeline before it is folded into a record
enum PipelineResult {
    Online(StatusRecord),
    Malformed(String),
}

/// Server List Ping prober
pub struct StatusProber {
    connector: Box<dyn StatusConnector>,
    clock: Box<dyn ClockTrait>,
    options: ProbeOptions,
}

impl Default for StatusProber {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusProber {
    /// Prober over TCP with the system clock and default deadlines
    pub fn new() -> Self {
        Self {
            connector: Box::new(TcpConnector),
            clock: Box::new(SystemClock),
            options: ProbeOptions::default(),
        }
    }

    /// Configure StatusProber with custom connector (for testing)
    pub fn with_connector(mut self, connector: Box<dyn StatusConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Configure StatusProber with custom clock (for testing)
    pub fn with_clock(mut self, clock: Box<dyn ClockTrait>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: ProbeOptions) -> Self {
        self.options = options;
        self
    }

    /// Probe `endpoint` and publish the result into `slot`
    ///
    /// Never fails: connection, protocol and payload problems all produce an
    /// offline record. Returns `ProbeOutcome::Skipped` if `slot` already has
    /// a probe in flight.
    pub async fn probe(&self, endpoint: &Endpoint, slot: &EndpointSlot) -> ProbeOutcome {
        let debug_logger = get_debug_logger();
        let target = endpoint.to_string();

        let Some(_guard) = slot.try_begin() else {
            debug_logger.duplicate_probe(&target);
            return ProbeOutcome::Skipped;
        };

        let probe_id = format!("probe_{}", uuid::Uuid::new_v4());
        debug_logger.probe_start(
            &target,
            self.options.connect_timeout.as_millis() as u64,
            self.options.read_timeout.as_millis() as u64,
            &probe_id,
        );
        let started = self.clock.now();

        // The connection lives and dies inside run_pipeline
        let result = self.run_pipeline(endpoint, &target, &probe_id).await;
        let previous = slot.snapshot();
        let now_ms = self.clock.epoch_millis();

        let outcome = match result {
            Ok(PipelineResult::Online(record)) => ProbeOutcome::Online(Arc::new(record)),
            Ok(PipelineResult::Malformed(reason)) => ProbeOutcome::Offline {
                record: Arc::new(previous.parse_failed(now_ms)),
                reason: OfflineReason::MalformedPayload(reason),
            },
            Err(err) => {
                let reason = OfflineReason::from(&err);
                debug_logger.server_offline(&target, reason.kind(), &err.to_string(), &probe_id);
                ProbeOutcome::Offline {
                    record: Arc::new(previous.offline(now_ms)),
                    reason,
                }
            }
        };

        if let Some(record) = outcome.record() {
            slot.publish(Arc::clone(record));
            debug_logger.probe_end(
                &target,
                outcome.label(),
                record.latency_ms,
                self.clock.now().saturating_duration_since(started).as_millis() as u64,
                &probe_id,
            );
        }

        outcome
    }

    async fn run_pipeline(&self, endpoint: &Endpoint, target: &str, probe_id: &str) -> Result<PipelineResult, ProbeError> {
        let debug_logger = get_debug_logger();
        let mut stream = self.connector.connect(endpoint, self.options.connect_timeout).await?;

        self.within("handshake", send_status_request(&mut stream, endpoint))
            .await?;
        let raw = self
            .within("status_response", read_status_response(&mut stream))
            .await?;
        debug_logger.status_received(target, &raw, probe_id);

        let status = match parse_status_json(&raw) {
            StatusPayload::Parsed(document) => Ok(extract_status(&document, self.clock.epoch_millis())),
            StatusPayload::Malformed { reason } => {
                debug_logger.status_parse_failed(target, &reason, probe_id);
                Err(reason)
            }
        };

        let latency = self
            .within("ping", measure_latency(&mut stream, self.clock.as_ref()))
            .await;
        if let Ok(sample) = &latency {
            if !sample.payload_matches() {
                debug_logger.pong_mismatch(target, sample.sent_payload, sample.echoed_payload, probe_id);
            }
        }

        match (status, latency) {
            (Ok(mut record), Ok(sample)) => {
                record.latency_ms = sample.latency_ms;
                Ok(PipelineResult::Online(record))
            }
            (Ok(_), Err(err)) => Err(err),
            // The document was unusable; the ping outcome cannot rescue it
            (Err(reason), _) => Ok(PipelineResult::Malformed(reason)),
        }
    }

    /// Run one request/response stage under the read deadline
    async fn within<T, F>(&self, stage: &'static str, stage_future: F) -> Result<T, ProbeError>
    where
        F: Future<Output = Result<T, ProbeError>>,
    {
        tokio::time::timeout(self.options.read_timeout, stage_future)
            .await
            .map_err(|_| ProbeError::Timeout {
                stage,
                timeout_ms: self.options.read_timeout.as_millis() as u64,
            })?
    }
}
