use std::collections::HashMap;
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, OnceLock};

use chrono::Local;
use flate2::{write::GzEncoder, Compression};
use fs2::FileExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const COMPONENT: &str = "StatusProber";

/// When the active log file is archived and how many archives survive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_bytes: u64,
    pub max_archives: usize,
    /// Size is checked once every this many writes
    pub check_every: u32,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 8 * 1024 * 1024,
            max_archives: 5,
            check_every: 200,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LogEntry {
    pub timestamp: String,                          // ISO-8601 with timezone
    pub level: String,                              // DEBUG, INFO, WARN, ERROR, NETWORK
    pub component: String,                          // Component name
    pub event: String,                              // Event type
    pub message: String,                            // Human readable message (redacted)
    pub correlation_id: Option<String>,             // Probe id or session id
    pub fields: HashMap<String, serde_json::Value>, // Structured data
}

/// Append-only JSONL file archived as `<stem>.<component>.<time>-<seq>.gz`
struct ProbeLogFile {
    path: PathBuf,
    policy: RotationPolicy,
    writes: AtomicU32,
    archive_seq: AtomicU32,
}

impl ProbeLogFile {
    fn open(path: PathBuf, policy: RotationPolicy) -> Self {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        Self {
            path,
            policy,
            writes: AtomicU32::new(0),
            archive_seq: AtomicU32::new(0),
        }
    }

    fn append(&self, json_line: &str) -> Result<(), std::io::Error> {
        let every = self.policy.check_every.max(1);
        if self.writes.fetch_add(1, Ordering::Relaxed) % every == 0 {
            // A failed rotation must not cost the entry
            let _ = self.archive_if_full();
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", json_line)
    }

    fn is_full(&self) -> bool {
        std::fs::metadata(&self.path)
            .map(|metadata| metadata.len() >= self.policy.max_bytes)
            .unwrap_or(false)
    }

    fn archive_if_full(&self) -> Result<(), std::io::Error> {
        if !self.is_full() {
            return Ok(());
        }

        // Several sculkprobe processes may share one log file
        let lock_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Ok(());
        }

        let result = if self.is_full() { self.archive() } else { Ok(()) };
        let _ = std::fs::remove_file(&lock_path);
        result
    }

    fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sculkprobe-debug".to_string())
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    fn archive_prefix(&self) -> String {
        format!("{}.{}.", self.stem(), COMPONENT.to_lowercase())
    }

    fn archive(&self) -> Result<(), std::io::Error> {
        let name = format!(
            "{}{}-{}.gz",
            self.archive_prefix(),
            Local::now().format("%Y%m%d_%H%M%S"),
            self.archive_seq.fetch_add(1, Ordering::Relaxed)
        );

        let staged = self.path.with_extension("rotating");
        std::fs::rename(&self.path, &staged)?;

        let mut encoder = GzEncoder::new(File::create(self.dir().join(name))?, Compression::default());
        std::io::copy(&mut BufReader::new(File::open(&staged)?), &mut encoder)?;
        encoder.finish()?;
        std::fs::remove_file(&staged)?;

        self.prune_archives()
    }

    /// Keep the newest `max_archives`; names sort by time then sequence
    fn prune_archives(&self) -> Result<(), std::io::Error> {
        let prefix = self.archive_prefix();
        let mut archives: Vec<(std::time::SystemTime, u32, PathBuf)> = Vec::new();

        for entry in std::fs::read_dir(self.dir())? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(rest) = name.strip_prefix(&prefix).and_then(|rest| rest.strip_suffix(".gz")) else {
                continue;
            };
            let seq = rest
                .rsplit_once('-')
                .and_then(|(_, seq)| seq.parse().ok())
                .unwrap_or(0);
            archives.push((entry.metadata()?.modified()?, seq, entry.path()));
        }

        archives.sort();
        let excess = archives.len().saturating_sub(self.policy.max_archives);
        for (_, _, path) in archives.into_iter().take(excess) {
            let _ = std::fs::remove_file(path);
        }
        Ok(())
    }
}

/// JSON Lines debug logger for probe lifecycle events
///
/// Disabled unless `SCULKPROBE_DEBUG` is set; a disabled logger drops every
/// entry without touching the filesystem.
pub struct EnhancedDebugLogger {
    enabled: bool,
    log_file: Option<Mutex<ProbeLogFile>>,
    session_id: String,
    redaction_patterns: Vec<(Regex, &'static str)>,
}

impl Default for EnhancedDebugLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl EnhancedDebugLogger {
    pub fn new() -> Self {
        if Self::parse_debug_enabled() {
            Self::with_log_path(Self::get_log_path())
        } else {
            Self::build(false, None)
        }
    }

    /// Enabled logger writing to an explicit file
    pub fn with_log_path(log_path: PathBuf) -> Self {
        Self::with_rotation(log_path, RotationPolicy::default())
    }

    /// Enabled logger with a custom archive policy
    pub fn with_rotation(log_path: PathBuf, policy: RotationPolicy) -> Self {
        Self::build(true, Some(Mutex::new(ProbeLogFile::open(log_path, policy))))
    }

    fn build(enabled: bool, log_file: Option<Mutex<ProbeLogFile>>) -> Self {
        Self {
            enabled,
            log_file,
            session_id: Uuid::new_v4().to_string()[..8].to_string(),
            redaction_patterns: Self::compile_redaction_patterns(),
        }
    }

    /// Parse debug enabled status from SCULKPROBE_DEBUG
    /// Supports: true/false, 1/0, yes/no, on/off (case insensitive)
    fn parse_debug_enabled() -> bool {
        env::var("SCULKPROBE_DEBUG")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
            .unwrap_or(false)
    }

    fn get_log_path() -> PathBuf {
        if let Ok(path) = env::var("SCULKPROBE_DEBUG_LOG") {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        let mut log_path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        log_path.push(".sculkprobe");
        log_path.push("sculkprobe-debug.log");
        log_path
    }

    fn compile_redaction_patterns() -> Vec<(Regex, &'static str)> {
        let patterns = [
            (r"data:image/[a-zA-Z+.-]+;base64,[A-Za-z0-9+/=\\n]+", "[FAVICON]"),
            (r"(?i)password[:\s]+[^\s\n]+", "[REDACTED]"),
        ];

        patterns
            .iter()
            .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|regex| (regex, *replacement)))
            .collect()
    }

    /// Strip favicon payloads and other bulky opaque strings before writing
    pub fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_string();

        for (regex, replacement) in &self.redaction_patterns {
            redacted = regex.replace_all(&redacted, *replacement).to_string();
        }

        if redacted.len() > 100
            && !redacted.contains(' ')
            && redacted
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_+/=".contains(c))
        {
            redacted = format!("[REDACTED_LONG_STRING_{}chars]", redacted.len());
        }

        redacted
    }

    fn log_sync(
        &self,
        level: &str,
        event: &str,
        message: &str,
        correlation_id: Option<&str>,
        fields: HashMap<String, serde_json::Value>,
    ) {
        if !self.enabled {
            return;
        }

        let entry = LogEntry {
            timestamp: Local::now().to_rfc3339(),
            level: level.to_string(),
            component: COMPONENT.to_string(),
            event: event.to_string(),
            message: self.redact(message),
            correlation_id: Some(correlation_id.unwrap_or(&self.session_id).to_string()),
            fields,
        };

        if let (Some(log_file), Ok(json_line)) = (&self.log_file, serde_json::to_string(&entry)) {
            if let Ok(log_file) = log_file.lock() {
                let _ = log_file.append(&json_line);
            }
        }
    }

    pub fn debug_sync(&self, event: &str, message: &str) {
        self.log_sync("DEBUG", event, message, None, HashMap::new());
    }

    pub fn error_sync(&self, event: &str, message: &str) {
        self.log_sync("ERROR", event, message, None, HashMap::new());
    }

    // Typed probe lifecycle events

    pub fn probe_start(&self, endpoint: &str, connect_timeout_ms: u64, read_timeout_ms: u64, probe_id: &str) {
        let mut fields = HashMap::new();
        fields.insert("endpoint".to_string(), endpoint.into());
        fields.insert("connect_timeout_ms".to_string(), connect_timeout_ms.into());
        fields.insert("read_timeout_ms".to_string(), read_timeout_ms.into());

        self.log_sync(
            "NETWORK",
            "probe_start",
            &format!("Starting status probe of {}", endpoint),
            Some(probe_id),
            fields,
        );
    }

    pub fn probe_end(&self, endpoint: &str, outcome: &str, latency_ms: i64, duration_ms: u64, probe_id: &str) {
        let mut fields = HashMap::new();
        fields.insert("endpoint".to_string(), endpoint.into());
        fields.insert("outcome".to_string(), outcome.into());
        fields.insert("latency_ms".to_string(), latency_ms.into());
        fields.insert("duration_ms".to_string(), duration_ms.into());

        self.log_sync(
            "NETWORK",
            "probe_end",
            &format!("Probe of {} completed: {} ({}ms)", endpoint, outcome, duration_ms),
            Some(probe_id),
            fields,
        );
    }

    pub fn duplicate_probe(&self, endpoint: &str) {
        let mut fields = HashMap::new();
        fields.insert("endpoint".to_string(), endpoint.into());

        self.log_sync(
            "WARN",
            "duplicate_probe",
            &format!("duplicate probe of {} ignored, one is already in flight", endpoint),
            None,
            fields,
        );
    }

    pub fn server_offline(&self, endpoint: &str, kind: &str, detail: &str, probe_id: &str) {
        let mut fields = HashMap::new();
        fields.insert("endpoint".to_string(), endpoint.into());
        fields.insert("kind".to_string(), kind.into());

        self.log_sync(
            "INFO",
            "server_offline",
            &format!("Server {} is offline ({}): {}", endpoint, kind, detail),
            Some(probe_id),
            fields,
        );
    }

    pub fn status_received(&self, endpoint: &str, raw_json: &str, probe_id: &str) {
        let mut fields = HashMap::new();
        fields.insert("endpoint".to_string(), endpoint.into());
        fields.insert("json_len".to_string(), raw_json.len().into());

        self.log_sync(
            "DEBUG",
            "status_received",
            &format!("Server {} responded with: {}", endpoint, raw_json),
            Some(probe_id),
            fields,
        );
    }

    pub fn status_parse_failed(&self, endpoint: &str, reason: &str, probe_id: &str) {
        let mut fields = HashMap::new();
        fields.insert("endpoint".to_string(), endpoint.into());

        self.log_sync(
            "ERROR",
            "status_parse_failed",
            &format!("Failed to parse status response from {}: {}", endpoint, reason),
            Some(probe_id),
            fields,
        );
    }

    pub fn sample_entry_dropped(&self, index: usize, kind: &str) {
        let mut fields = HashMap::new();
        fields.insert("index".to_string(), index.into());
        fields.insert("kind".to_string(), kind.into());

        self.log_sync(
            "ERROR",
            "sample_entry_dropped",
            &format!("Dropped player sample entry #{} ({})", index, kind),
            None,
            fields,
        );
    }

    pub fn pong_mismatch(&self, endpoint: &str, sent: i64, received: i64, probe_id: &str) {
        let mut fields = HashMap::new();
        fields.insert("sent".to_string(), sent.into());
        fields.insert("received".to_string(), received.into());

        self.log_sync(
            "WARN",
            "pong_mismatch",
            &format!("Ping/pong payload mismatch from {} (sent: {}, received: {})", endpoint, sent, received),
            Some(probe_id),
            fields,
        );
    }

    pub fn nodelay_failed(&self, endpoint: &str, error: &str) {
        let mut fields = HashMap::new();
        fields.insert("endpoint".to_string(), endpoint.into());

        self.log_sync(
            "WARN",
            "nodelay_failed",
            &format!("Could not disable Nagle on {}: {}", endpoint, error),
            None,
            fields,
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get_session_id(&self) -> &str {
        &self.session_id
    }
}

/// Process-wide logger, configured from the environment on first use
pub fn get_debug_logger() -> &'static EnhancedDebugLogger {
    static LOGGER: OnceLock<EnhancedDebugLogger> = OnceLock::new();
    LOGGER.get_or_init(EnhancedDebugLogger::new)
}
