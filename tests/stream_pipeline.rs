//! Integration tests for the streaming pipeline: SSE framing → message
//! decoding → session registry state.
//!
//! These run the same path a live connection uses, minus the socket: raw
//! backend bytes go through the frame parser and message decoder, and the
//! resulting events are routed into sessions exactly as the stream task
//! would deliver them.

use gsmon_app::SessionRegistry;
use gsmon_client::{ApiClient, ProcessStreamClient, SseParser, StreamEvent};
use gsmon_core::{render_spans, AnsiColor, OutputEvent, ProcessKind, StreamMessage};

fn registry() -> SessionRegistry {
    // No network paths are exercised; the address just has to parse.
    let api = ApiClient::new("http://127.0.0.1:1", None).unwrap();
    let stream = ProcessStreamClient::new(api.clone());
    SessionRegistry::new(api, stream).0
}

/// Decode raw SSE bytes into the events a stream task would deliver.
fn decode(parser: &mut SseParser, bytes: &[u8]) -> Vec<OutputEvent> {
    parser
        .feed(bytes)
        .into_iter()
        .flat_map(|payload| {
            StreamMessage::parse(&payload)
                .expect("fixture payloads are valid")
                .into_events()
        })
        .collect()
}

#[tokio::test]
async fn install_stream_drives_session_to_completion() {
    let mut registry = registry();
    registry.create("mc-vanilla", ProcessKind::Install).unwrap();

    let mut parser = SseParser::new();
    // Chunk boundaries deliberately fall mid-message
    let chunks: Vec<&[u8]> = vec![
        b"data: {\"line\":\"Connecting to Steam...\"}\n\ndata: {\"li",
        b"ne\":\"\\u001b[32mUpdate complete\\u001b[0m\"}\n\n",
        b"data: {\"heartbeat\":true,\"timestamp\":1723100000}\n\n",
        b"data: {\"prompt\":\"Steam Guard code:\"}\n\n",
        b"data: {\"complete\":true,\"status\":\"success\",\"message\":\"installed\"}\n\n",
    ];

    for chunk in chunks {
        for event in decode(&mut parser, chunk) {
            registry.apply_event("mc-vanilla", StreamEvent::Output(event));
        }
    }

    let session = registry.get("mc-vanilla").unwrap();
    assert_eq!(session.output.len(), 4, "heartbeats must not appear in output");
    assert!(session.complete);
    assert!(!session.loading);

    // Order preserved: two lines, the prompt, then completion
    assert_eq!(session.output[0].text(), Some("Connecting to Steam..."));
    assert!(matches!(session.output[2], OutputEvent::Prompt { .. }));
    assert!(matches!(
        session.output[3],
        OutputEvent::Complete { succeeded: true, .. }
    ));
}

#[tokio::test]
async fn interleaved_sessions_keep_independent_ordered_logs() {
    let mut registry = registry();
    registry.create("install-job", ProcessKind::Install).unwrap();
    registry.create("game-server", ProcessKind::Server).unwrap();

    // Simulate the event loop interleaving deliveries from two streams
    let deliveries = [
        ("install-job", "verifying 10%"),
        ("game-server", "[Server] Starting minecraft server"),
        ("install-job", "verifying 55%"),
        ("game-server", "[Server] Done (3.2s)!"),
        ("install-job", "verifying 100%"),
    ];
    for (id, text) in deliveries {
        registry.apply_event(id, StreamEvent::Output(OutputEvent::line(text)));
    }

    let texts = |id: &str| -> Vec<String> {
        registry
            .get(id)
            .unwrap()
            .output
            .iter()
            .filter_map(|e| e.text().map(str::to_string))
            .collect()
    };

    assert_eq!(
        texts("install-job"),
        vec!["verifying 10%", "verifying 55%", "verifying 100%"]
    );
    assert_eq!(
        texts("game-server"),
        vec![
            "[Server] Starting minecraft server",
            "[Server] Done (3.2s)!"
        ]
    );
}

#[tokio::test]
async fn decoded_line_renders_to_styled_spans() {
    let mut parser = SseParser::new();
    let events = decode(
        &mut parser,
        b"data: {\"line\":\"\\u001b[1;31mFAILED\\u001b[0m to acquire lock\"}\n\n",
    );

    let text = events[0].text().unwrap();
    let spans = render_spans(text);
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].text, "FAILED");
    assert!(spans[0].style.bold);
    assert_eq!(spans[0].style.fg, Some(AnsiColor::Red));
    assert_eq!(spans[1].text, " to acquire lock");
    assert!(spans[1].style.is_plain());
}

#[tokio::test]
async fn prompt_flow_records_pending_input() {
    let mut registry = registry();
    registry.create("job", ProcessKind::Install).unwrap();

    registry.apply_event(
        "job",
        StreamEvent::Output(OutputEvent::Prompt {
            text: "Password:".to_string(),
        }),
    );
    assert_eq!(registry.get("job").unwrap().awaiting_input(), Some("Password:"));

    // The prompt record itself stays in the log after being answered
    registry.apply_event("job", StreamEvent::Output(OutputEvent::line("ok")));
    assert_eq!(registry.get("job").unwrap().output.len(), 2);
}

#[tokio::test]
async fn malformed_payload_becomes_visible_error_line() {
    // The stream task reports undecodable messages inline instead of
    // dropping them; sessions just see a Line event.
    let payload = "{not json";
    let err = StreamMessage::parse(payload).unwrap_err();

    let mut registry = registry();
    registry.create("job", ProcessKind::Install).unwrap();
    registry.apply_event(
        "job",
        StreamEvent::Output(OutputEvent::line(format!(
            "failed to parse stream message: {err}"
        ))),
    );

    let session = registry.get("job").unwrap();
    assert!(session.output[0]
        .text()
        .unwrap()
        .starts_with("failed to parse stream message"));
    assert!(!session.complete, "a bad message is not fatal");
}

#[tokio::test]
async fn removed_session_swallows_late_events() {
    let mut registry = registry();
    registry.create("gone", ProcessKind::Server).unwrap();
    registry.remove("gone");

    registry.apply_event("gone", StreamEvent::Output(OutputEvent::line("late")));
    assert!(registry.get("gone").is_none());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn failed_completion_reports_failure_and_stays_queryable() {
    let mut registry = registry();
    registry.create("job", ProcessKind::Install).unwrap();

    registry.apply_event("job", StreamEvent::Output(OutputEvent::line("step 1")));
    registry.apply_event(
        "job",
        StreamEvent::Output(OutputEvent::Complete {
            succeeded: false,
            message: Some("install process exited with code 8".to_string()),
        }),
    );

    let session = registry.get("job").unwrap();
    assert!(session.complete);
    assert!(!session.loading);
    // Output retained until explicit removal
    assert_eq!(session.output.len(), 2);
}
