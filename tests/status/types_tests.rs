/*!
Tests for endpoints, status records and probe outcomes.
*/

use sculkprobe::core::status::*;
use std::sync::Arc;

#[test]
fn test_endpoint_parse_host_only() {
    assert_eq!(
        Endpoint::parse("play.example.net").unwrap(),
        Endpoint::new("play.example.net", DEFAULT_PORT)
    );
}

#[test]
fn test_endpoint_parse_host_and_port() {
    assert_eq!(
        Endpoint::parse(" 10.0.0.5:25570 ").unwrap(),
        Endpoint::new("10.0.0.5", 25570)
    );
}

#[test]
fn test_endpoint_parse_ipv6() {
    assert_eq!(
        Endpoint::parse("[::1]:25600").unwrap(),
        Endpoint::new("::1", 25600)
    );
    assert_eq!(Endpoint::parse("[::1]").unwrap(), Endpoint::new("::1", DEFAULT_PORT));
    assert_eq!(
        Endpoint::parse("fe80::1").unwrap(),
        Endpoint::new("fe80::1", DEFAULT_PORT)
    );
}

#[test]
fn test_endpoint_parse_errors() {
    assert_eq!(Endpoint::parse(""), Err(AddressError::EmptyHost));
    assert_eq!(Endpoint::parse(":25565"), Err(AddressError::EmptyHost));
    assert_eq!(Endpoint::parse("[]:25565"), Err(AddressError::EmptyHost));
    assert_eq!(
        Endpoint::parse("host:0"),
        Err(AddressError::InvalidPort("0".to_string()))
    );
    assert_eq!(
        Endpoint::parse("host:99999"),
        Err(AddressError::InvalidPort("99999".to_string()))
    );
    assert!(matches!(Endpoint::parse("host:abc"), Err(AddressError::InvalidPort(_))));
    assert!(matches!(Endpoint::parse("[::1]x"), Err(AddressError::InvalidPort(_))));
}

#[test]
fn test_endpoint_display() {
    assert_eq!(Endpoint::new("mc.example.com", 25565).to_string(), "mc.example.com:25565");
    assert_eq!(Endpoint::new("::1", 25565).to_string(), "[::1]:25565");
}

#[test]
fn test_default_record() {
    let record = StatusRecord::default();
    assert!(!record.online);
    assert_eq!(record.version_name, "Unknown");
    assert_eq!(record.latency_ms, -1);
    assert_eq!(record.last_checked_epoch_ms, 0);
    assert!(record.sample_players.is_empty());
    assert!(!record.mod_loader_detected());
}

#[test]
fn test_offline_record_keeps_static_metadata() {
    let online = StatusRecord {
        online: true,
        version_name: "1.20.4".to_string(),
        protocol_version: 765,
        favicon: "data:image/png;base64,AAAA".to_string(),
        max_players: 50,
        online_players: 7,
        sample_players: vec![SamplePlayer {
            name: "Steve".to_string(),
            id: "abc".to_string(),
        }],
        description: "Hub".to_string(),
        mod_loader: Some(ModLoader::Forge),
        latency_ms: 12,
        last_checked_epoch_ms: 10,
    };

    let offline = online.offline(99);
    assert!(!offline.online);
    assert_eq!(offline.online_players, 0);
    assert!(offline.sample_players.is_empty());
    assert_eq!(offline.latency_ms, -1);
    assert_eq!(offline.last_checked_epoch_ms, 99);
    assert_eq!(offline.version_name, "1.20.4");
    assert_eq!(offline.protocol_version, 765);
    assert_eq!(offline.favicon, online.favicon);
    assert_eq!(offline.description, "Hub");
    assert_eq!(offline.max_players, 50);

    let failed = online.parse_failed(100);
    assert!(!failed.online);
    assert_eq!(failed.version_name, "Unknown");
    assert_eq!(failed.protocol_version, 0);
    assert_eq!(failed.max_players, 0);
    assert_eq!(failed.description, "Failed to parse response");
    assert_eq!(failed.latency_ms, -1);
    assert_eq!(failed.last_checked_epoch_ms, 100);
}

#[test]
fn test_record_serializes() {
    let json = serde_json::to_value(StatusRecord::default()).unwrap();
    assert_eq!(json["version_name"], "Unknown");
    assert_eq!(json["latency_ms"], -1);
    assert!(json["mod_loader"].is_null());
}

#[test]
fn test_offline_reason_from_probe_error() {
    let io = ProbeError::Io(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"));
    assert_eq!(OfflineReason::from(&io).kind(), "connection");

    let timeout = ProbeError::Timeout {
        stage: "ping",
        timeout_ms: 250,
    };
    let reason = OfflineReason::from(&timeout);
    assert_eq!(reason, OfflineReason::Timeout("ping timed out after 250ms".to_string()));

    let protocol = ProbeError::from(ProtocolError::VarIntTooLong);
    assert_eq!(OfflineReason::from(&protocol).kind(), "protocol");
}

#[test]
fn test_probe_outcome_accessors() {
    let record = Arc::new(StatusRecord::default());

    let online = ProbeOutcome::Online(Arc::clone(&record));
    assert!(online.is_online());
    assert_eq!(online.label(), "online");
    assert!(online.record().is_some());

    let offline = ProbeOutcome::Offline {
        record,
        reason: OfflineReason::MalformedPayload("bad".to_string()),
    };
    assert!(!offline.is_online());
    assert_eq!(offline.label(), "offline");

    assert!(ProbeOutcome::Skipped.is_skipped());
    assert!(ProbeOutcome::Skipped.record().is_none());
}
