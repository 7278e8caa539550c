mod common;

use common::{fast_config, read, status_of, RecordingLauncher, TestMap};
use plama_sync::{event_channel, Agent, AgentEvent, HandshakeConfig, HandshakeError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn agent_files(config: &str) -> Vec<(&'static str, String)> {
    vec![
        ("instrukcje.txt", "Be terse.\n".to_string()),
        ("wejście.txt", "  ping  \n".to_string()),
        ("konfiguracja.txt", config.to_string()),
    ]
}

fn make_agent(map: &TestMap, config: &str) -> std::path::PathBuf {
    let files = agent_files(config);
    let refs: Vec<(&str, &str)> = files.iter().map(|(k, v)| (*k, v.as_str())).collect();
    map.object("agent", &refs)
}

// ── Success ─────────────────────────────────────────────────────

#[tokio::test]
async fn agent_writes_cleaned_output_and_goes_off() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .and(body_partial_json(json!({
            "instructions": "Be terse.",
            "input": "ping",
            "max_token": 64,
            "top_k": "40",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "<|im_start|>assistant\npong<|im_end|>"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let map = TestMap::new();
    let dir = make_agent(&map, "serwer=mozg\nmax_tokens=64\ntop_k=40\n");
    map.object("mozg", &[("gotowe.txt", &format!("url = {}/run\n", server.uri()))]);

    let (events, mut rx) = event_channel();
    let outcome = Agent::new(&dir, fast_config())
        .with_events(events)
        .with_launcher(Arc::new(RecordingLauncher::default()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.output, "pong");
    assert_eq!(outcome.chained, None);
    assert_eq!(read(dir.join("wyjście.txt")), "pong");
    assert_eq!(status_of(dir.join("mapa_dane.txt")).as_deref(), Some("off"));

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event);
    }
    assert_eq!(seen.first(), Some(&AgentEvent::StatusChanged(plama_types::ProcessStatus::On)));
    assert!(seen.iter().any(|e| matches!(e, AgentEvent::Dispatched { .. })));
    assert_eq!(seen.last(), Some(&AgentEvent::Completed { output_len: 4 }));
}

#[tokio::test]
async fn direct_url_skips_readiness() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200).set_body_string("direct"))
        .mount(&server)
        .await;

    let map = TestMap::new();
    let dir = make_agent(&map, &format!("url={}\n", server.uri()));

    let outcome = Agent::new(&dir, fast_config()).run().await.unwrap();
    assert_eq!(outcome.output, "direct");
}

#[tokio::test]
async fn file_api_peer_needs_no_readiness_file() {
    let map = TestMap::new();
    let dir = make_agent(&map, "serwer=mozg\n");
    let peer = map.object("mozg", &[("api.txt", "")]);

    let answer = peer.join("wyjście.txt");
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(answer, "assistant from files").unwrap();
    });

    let outcome = Agent::new(&dir, fast_config()).run().await.unwrap();
    writer.await.unwrap();

    assert_eq!(outcome.output, "from files");
    assert_eq!(read(peer.join("wejście.txt")), "instrukcje:Be terse.\nwejście:ping\n");
    assert_eq!(status_of(dir.join("mapa_dane.txt")).as_deref(), Some("off"));
}

// ── Chaining ────────────────────────────────────────────────────

#[tokio::test]
async fn next_line_is_launched_after_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let map = TestMap::new();
    let dir = make_agent(&map, &format!("url={}\n", server.uri()));
    std::fs::write(dir.join("następny.txt"), " 7\n").unwrap();
    map.line("linia 1", &[("L_id.txt", "3"), ("start.py", "")]);
    let next = map.line("linia 2", &[("L_id.txt", "7"), ("start.py", "")]);

    let launcher = Arc::new(RecordingLauncher::default());
    let outcome = Agent::new(&dir, fast_config())
        .with_launcher(launcher.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.chained, Some(next.join("start.py")));
    assert_eq!(launcher.launched(), vec![next.join("start.py")]);
}

#[tokio::test]
async fn next_line_without_entry_point_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let map = TestMap::new();
    let dir = make_agent(&map, &format!("url={}\n", server.uri()));
    std::fs::write(dir.join("następny.txt"), "7").unwrap();
    map.line("linia 1", &[("L_id.txt", "7")]);

    let launcher = Arc::new(RecordingLauncher::default());
    let outcome = Agent::new(&dir, fast_config())
        .with_launcher(launcher.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.chained, None);
    assert!(launcher.launched().is_empty());
    assert_eq!(status_of(dir.join("mapa_dane.txt")).as_deref(), Some("off"));
}

// ── Failures ────────────────────────────────────────────────────

#[tokio::test]
async fn missing_endpoint_is_a_config_error() {
    let map = TestMap::new();
    let dir = make_agent(&map, "temp=0.2\n");

    let err = Agent::new(&dir, fast_config()).run().await.unwrap_err();

    assert!(matches!(err, HandshakeError::Config(_)), "{err:?}");
    assert!(read(dir.join("wyjście.txt")).starts_with("[AGENT ERROR] ConfigError: "));
    assert_eq!(status_of(dir.join("mapa_dane.txt")).as_deref(), Some("error"));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn silent_peer_ends_in_error_within_bound() {
    let map = TestMap::new();
    let dir = make_agent(&map, "serwer=mozg\n");
    map.object("mozg", &[]);

    let started = tokio::time::Instant::now();
    let err = Agent::new(&dir, HandshakeConfig::default()).run().await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, HandshakeError::ReadinessTimeout { .. }), "{err:?}");
    assert!(elapsed >= Duration::from_secs(30));
    assert!(elapsed <= Duration::from_secs(31));
    assert!(read(dir.join("wyjście.txt")).starts_with("[AGENT ERROR] ReadinessTimeout: no "));
    assert_eq!(status_of(dir.join("mapa_dane.txt")).as_deref(), Some("error"));
}

#[tokio::test]
async fn readiness_without_endpoint_is_an_error() {
    let map = TestMap::new();
    let dir = make_agent(&map, "serwer=mozg\n");
    map.object("mozg", &[("gotowe.txt", "# starting\nhost=localhost\n")]);

    let err = Agent::new(&dir, fast_config()).run().await.unwrap_err();
    assert!(matches!(err, HandshakeError::ReadinessIncomplete(_)), "{err:?}");
}

#[tokio::test]
async fn application_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let map = TestMap::new();
    let dir = make_agent(&map, &format!("url={}\n", server.uri()));
    let (events, mut rx) = event_channel();

    let err = Agent::new(&dir, fast_config())
        .with_events(events)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, HandshakeError::Status { status: 503, .. }), "{err:?}");
    assert!(read(dir.join("wyjście.txt")).starts_with("[AGENT ERROR] HttpStatusError: "));
    while let Ok(event) = rx.try_recv() {
        assert!(!matches!(event, AgentEvent::Retrying { .. }));
    }
}

#[tokio::test]
async fn network_failure_is_retried_once() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let map = TestMap::new();
    let dir = make_agent(&map, &format!("url=http://127.0.0.1:{port}\n"));
    let (events, mut rx) = event_channel();

    let err = Agent::new(&dir, fast_config())
        .with_events(events)
        .run()
        .await
        .unwrap_err();

    assert!(err.is_network(), "{err:?}");
    let mut dispatched = 0;
    let mut retries = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            AgentEvent::Dispatched { .. } => dispatched += 1,
            AgentEvent::Retrying { after, .. } => {
                retries += 1;
                assert_eq!(after, Duration::from_millis(20));
            }
            _ => {}
        }
    }
    assert_eq!((dispatched, retries), (2, 1));
    assert_eq!(status_of(dir.join("mapa_dane.txt")).as_deref(), Some("error"));
}
