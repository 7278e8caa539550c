mod common;

use common::{read, status_of, TestMap};
use plama_sync::{
    announce, event_channel, wait_for_readiness, AgentEvent, EventSink, HandshakeConfig,
    HandshakeError, ReadinessInfo, StatusReporter,
};
use std::time::Duration;

// ── Announce ────────────────────────────────────────────────────

#[test]
fn announce_writes_file_then_sets_on() {
    let map = TestMap::new();
    let server = map.object("mozg", &[]);
    let status = StatusReporter::new(server.join("mapa_dane.txt"), EventSink::disabled());

    let path = announce(&server, "127.0.0.1", 3333, &status).unwrap();

    assert_eq!(path, server.join("gotowe.txt"));
    let text = read(&path);
    assert!(text.starts_with("# gotowe.txt "));
    assert!(text.contains("url = http://127.0.0.1:3333\n"));
    assert_eq!(status_of(server.join("mapa_dane.txt")).as_deref(), Some("on"));
}

// ── Waiting ─────────────────────────────────────────────────────

#[tokio::test]
async fn present_file_is_read_without_waiting() {
    let map = TestMap::new();
    let agent = map.object("agent", &[]);
    let server = map.object("mozg", &[("gotowe.txt", "host=localhost\nport=9000\n")]);
    let status = StatusReporter::new(agent.join("mapa_dane.txt"), EventSink::disabled());

    let info = wait_for_readiness(&server, &HandshakeConfig::default(), &status, &EventSink::disabled())
        .await
        .unwrap();

    assert_eq!(
        info,
        ReadinessInfo {
            host: Some("localhost".into()),
            port: Some(9000),
            url: Some("http://localhost:9000".into()),
        }
    );
    assert_eq!(status_of(agent.join("mapa_dane.txt")).as_deref(), Some("off"));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn missing_file_times_out_after_bound() {
    let map = TestMap::new();
    let agent = map.object("agent", &[]);
    let server = map.object("mozg", &[]);
    let (events, mut rx) = event_channel();
    let status = StatusReporter::new(agent.join("mapa_dane.txt"), events.clone());

    let started = tokio::time::Instant::now();
    let err = wait_for_readiness(&server, &HandshakeConfig::default(), &status, &events)
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, HandshakeError::ReadinessTimeout { .. }), "{err:?}");
    assert!(elapsed >= Duration::from_secs(30));
    assert!(elapsed <= Duration::from_secs(31));
    assert_eq!(status_of(agent.join("mapa_dane.txt")).as_deref(), Some("lag"));

    let mut waits = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, AgentEvent::WaitingForReadiness { .. }) {
            waits += 1;
        }
    }
    assert_eq!(waits, 30);
}

#[tokio::test]
async fn file_appearing_mid_wait_is_picked_up() {
    let map = TestMap::new();
    let agent = map.object("agent", &[]);
    let server = map.object("mozg", &[]);
    let status = StatusReporter::new(agent.join("mapa_dane.txt"), EventSink::disabled());
    let config = common::fast_config();

    let ready = server.join("gotowe.txt");
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(ready, "url = http://h:1/run\n").unwrap();
    });

    let info = wait_for_readiness(&server, &config, &status, &EventSink::disabled())
        .await
        .unwrap();
    writer.await.unwrap();

    assert_eq!(info.url.as_deref(), Some("http://h:1/run"));
    assert_eq!(status_of(agent.join("mapa_dane.txt")).as_deref(), Some("lag"));
}
