/*!
Probe orchestration tests.

Drives `StatusProber` against scripted in-memory servers and, for the
transport path, against a real TCP listener on localhost.
*/

use crate::common::*;
use sculkprobe::core::status::handshake::{build_handshake, STATUS_REQUEST};
use sculkprobe::core::status::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

fn prober_with(connector: &ScriptedConnector) -> StatusProber {
    StatusProber::new()
        .with_connector(Box::new(connector.clone()))
        .with_clock(Box::new(FixedClock))
}

fn short_deadlines() -> ProbeOptions {
    ProbeOptions {
        connect_timeout: Duration::from_millis(200),
        read_timeout: Duration::from_millis(50),
    }
}

fn online_record() -> StatusRecord {
    StatusRecord {
        online: true,
        version_name: "Paper 1.21".to_string(),
        protocol_version: 767,
        favicon: "data:image/png;base64,AAAA".to_string(),
        max_players: 100,
        online_players: 12,
        sample_players: vec![SamplePlayer {
            name: "Alex".to_string(),
            id: "1".to_string(),
        }],
        description: "Survival".to_string(),
        mod_loader: None,
        latency_ms: 35,
        last_checked_epoch_ms: 1,
    }
}

#[tokio::test]
async fn test_probe_success() {
    let connector = ScriptedConnector::serving(FakeServer::sample());
    let prober = prober_with(&connector);
    let endpoint = test_endpoint();
    let slot = EndpointSlot::new();

    let outcome = prober.probe(&endpoint, &slot).await;

    let record = match &outcome {
        ProbeOutcome::Online(record) => Arc::clone(record),
        other => panic!("expected online outcome, got {:?}", other),
    };
    assert!(record.online);
    assert_eq!(record.version_name, "1.20.1");
    assert_eq!(record.protocol_version, 763);
    assert_eq!(record.max_players, 20);
    assert_eq!(record.online_players, 1);
    assert_eq!(record.sample_players.len(), 1);
    assert_eq!(record.description, "Hello");
    assert!(record.latency_ms >= 0);
    assert_eq!(record.last_checked_epoch_ms, FIXED_EPOCH_MS);

    assert!(Arc::ptr_eq(&slot.snapshot(), &record));
    assert!(!slot.is_probing());
    assert_eq!(connector.connect_count(), 1);
}

#[tokio::test]
async fn test_probe_sends_expected_bytes() {
    let connector = ScriptedConnector::serving(FakeServer::sample());
    let prober = prober_with(&connector);
    let endpoint = test_endpoint();

    prober.probe(&endpoint, &EndpointSlot::new()).await;

    let captured = connector.captured(0);
    let handshake = build_handshake(&endpoint).unwrap();
    assert_eq!(captured.handshake, handshake[1..].to_vec());
    assert_eq!(captured.status_request, STATUS_REQUEST.to_vec());
    assert_eq!(captured.ping_payload, Some(FIXED_EPOCH_MS));
}

#[tokio::test]
async fn test_probe_connection_refused() {
    let connector = ScriptedConnector::refusing();
    let prober = prober_with(&connector);
    let slot = EndpointSlot::new();

    let outcome = prober.probe(&test_endpoint(), &slot).await;

    match &outcome {
        ProbeOutcome::Offline { record, reason } => {
            assert_eq!(**record, StatusRecord::default().offline(FIXED_EPOCH_MS));
            assert_eq!(record.latency_ms, -1);
            assert_eq!(record.version_name, "Unknown");
            assert!(matches!(reason, OfflineReason::Connection(_)));
        }
        other => panic!("expected offline outcome, got {:?}", other),
    }
    assert!(!slot.is_probing());
}

#[tokio::test]
async fn test_probe_offline_keeps_static_fields() {
    let prober = prober_with(&ScriptedConnector::refusing());
    let slot = EndpointSlot::with_record(online_record());

    prober.probe(&test_endpoint(), &slot).await;

    let record = slot.snapshot();
    assert!(!record.online);
    assert_eq!(record.version_name, "Paper 1.21");
    assert_eq!(record.protocol_version, 767);
    assert_eq!(record.favicon, "data:image/png;base64,AAAA");
    assert_eq!(record.description, "Survival");
    assert_eq!(record.max_players, 100);
    assert_eq!(record.online_players, 0);
    assert!(record.sample_players.is_empty());
    assert_eq!(record.latency_ms, -1);
    assert_eq!(record.last_checked_epoch_ms, FIXED_EPOCH_MS);
}

#[tokio::test]
async fn test_probe_unparseable_json() {
    let connector = ScriptedConnector::serving(FakeServer::with_json("definitely { not json"));
    let prober = prober_with(&connector);
    let slot = EndpointSlot::with_record(online_record());

    let outcome = prober.probe(&test_endpoint(), &slot).await;

    match &outcome {
        ProbeOutcome::Offline { record, reason } => {
            assert!(!record.online);
            assert_eq!(record.version_name, "Unknown");
            assert_eq!(record.protocol_version, 0);
            assert_eq!(record.max_players, 0);
            assert_eq!(record.description, "Failed to parse response");
            assert_eq!(record.latency_ms, -1);
            assert_eq!(record.last_checked_epoch_ms, FIXED_EPOCH_MS);
            assert!(record.sample_players.is_empty());
            assert!(matches!(reason, OfflineReason::MalformedPayload(_)));
        }
        other => panic!("expected offline outcome, got {:?}", other),
    }

    // Ping still ran over the same connection
    assert_eq!(connector.captured(0).ping_payload, Some(FIXED_EPOCH_MS));
}

#[tokio::test]
async fn test_probe_non_object_json_is_parse_failure() {
    let prober = prober_with(&ScriptedConnector::serving(FakeServer::with_json("\"just a string\"")));
    let slot = EndpointSlot::new();

    let outcome = prober.probe(&test_endpoint(), &slot).await;

    assert_eq!(
        *slot.snapshot(),
        StatusRecord::default().parse_failed(FIXED_EPOCH_MS)
    );
    assert!(matches!(
        outcome,
        ProbeOutcome::Offline {
            reason: OfflineReason::MalformedPayload(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_probe_read_timeout() {
    let connector = ScriptedConnector::serving(FakeServer::sample().hanging());
    let prober = prober_with(&connector).with_options(short_deadlines());
    let slot = EndpointSlot::new();

    let outcome = prober.probe(&test_endpoint(), &slot).await;

    match &outcome {
        ProbeOutcome::Offline { record, reason } => {
            assert_eq!(**record, StatusRecord::default().offline(FIXED_EPOCH_MS));
            match reason {
                OfflineReason::Timeout(message) => assert!(message.contains("status_response")),
                other => panic!("expected timeout, got {:?}", other),
            }
        }
        other => panic!("expected offline outcome, got {:?}", other),
    }
    assert!(!slot.is_probing());
}

#[tokio::test]
async fn test_probe_wrong_status_packet_id() {
    let prober = prober_with(&ScriptedConnector::serving(FakeServer::sample().status_packet_id(0x05)));
    let slot = EndpointSlot::new();

    let outcome = prober.probe(&test_endpoint(), &slot).await;

    match outcome {
        ProbeOutcome::Offline { record, reason } => {
            assert_eq!(*record, StatusRecord::default().offline(FIXED_EPOCH_MS));
            assert!(matches!(reason, OfflineReason::Protocol(_)));
        }
        other => panic!("expected offline outcome, got {:?}", other),
    }
}

#[tokio::test]
async fn test_probe_pong_mismatch_is_still_online() {
    let prober = prober_with(&ScriptedConnector::serving(
        FakeServer::sample().pong(PongReply::Payload(-7)),
    ));

    let outcome = prober.probe(&test_endpoint(), &EndpointSlot::new()).await;

    let record = outcome.record().expect("record published");
    assert!(outcome.is_online());
    assert!(record.latency_ms >= 0);
}

#[tokio::test]
async fn test_probe_wrong_pong_id_is_offline() {
    let prober = prober_with(&ScriptedConnector::serving(FakeServer::sample().pong(PongReply::WrongId)));

    let outcome = prober.probe(&test_endpoint(), &EndpointSlot::new()).await;

    assert!(matches!(
        outcome,
        ProbeOutcome::Offline {
            reason: OfflineReason::Protocol(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_probe_pong_never_sent_is_offline() {
    let prober = prober_with(&ScriptedConnector::serving(FakeServer::sample().pong(PongReply::Close)));
    let slot = EndpointSlot::new();

    let outcome = prober.probe(&test_endpoint(), &slot).await;

    assert_eq!(outcome.label(), "offline");
    assert_eq!(slot.snapshot().latency_ms, -1);
}

#[tokio::test]
async fn test_duplicate_probe_is_skipped() {
    let gate = Arc::new(Notify::new());
    let connector = ScriptedConnector::serving(FakeServer::sample().gated(Arc::clone(&gate)));
    let prober = prober_with(&connector);
    let endpoint = test_endpoint();
    let slot = EndpointSlot::new();

    let (first, second) = tokio::join!(prober.probe(&endpoint, &slot), async {
        let outcome = prober.probe(&endpoint, &slot).await;
        gate.notify_one();
        outcome
    });

    assert!(first.is_online());
    assert!(second.is_skipped());
    assert!(second.record().is_none());
    assert_eq!(connector.connect_count(), 1);
    assert!(!slot.is_probing());
}

#[tokio::test]
async fn test_cancelled_probe_releases_slot() {
    let connector = ScriptedConnector::new(vec![
        ConnectBehaviour::Serve(FakeServer::sample().hanging()),
        ConnectBehaviour::Serve(FakeServer::sample()),
    ]);
    let prober = prober_with(&connector);
    let endpoint = test_endpoint();
    let slot = EndpointSlot::new();

    let cancelled = tokio::time::timeout(Duration::from_millis(50), prober.probe(&endpoint, &slot)).await;
    assert!(cancelled.is_err());
    assert!(!slot.is_probing());
    assert_eq!(*slot.snapshot(), StatusRecord::default());

    // The slot accepts a fresh probe afterwards
    assert!(prober.probe(&endpoint, &slot).await.is_online());
    assert_eq!(connector.connect_count(), 2);
}

#[test]
fn test_default_probe_options() {
    let options = ProbeOptions::default();
    assert_eq!(options.connect_timeout, Duration::from_millis(5000));
    assert_eq!(options.read_timeout, Duration::from_millis(5000));
}

#[tokio::test]
async fn test_probe_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let captured = Arc::new(Mutex::new(Captured::default()));
    let server_captured = Arc::clone(&captured);
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        FakeServer::sample().serve(stream, server_captured).await
    });

    let prober = StatusProber::new()
        .with_clock(Box::new(FixedClock))
        .with_options(short_deadlines());
    let endpoint = Endpoint::new("127.0.0.1", port);

    let outcome = prober.probe(&endpoint, &EndpointSlot::new()).await;
    server.await.unwrap().unwrap();

    assert!(outcome.is_online());
    assert_eq!(outcome.record().unwrap().description, "Hello");
    assert_eq!(captured.lock().unwrap().ping_payload, Some(FIXED_EPOCH_MS));
}

#[tokio::test]
async fn test_probe_over_tcp_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let prober = StatusProber::new()
        .with_clock(Box::new(FixedClock))
        .with_options(short_deadlines());
    let slot = EndpointSlot::new();

    let outcome = prober.probe(&Endpoint::new("127.0.0.1", port), &slot).await;

    assert!(matches!(
        outcome,
        ProbeOutcome::Offline {
            reason: OfflineReason::Connection(_),
            ..
        }
    ));
    assert_eq!(*slot.snapshot(), StatusRecord::default().offline(FIXED_EPOCH_MS));
}
