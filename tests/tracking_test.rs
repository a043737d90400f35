//! Integration tests for HTTP session tracking
//!
//! Uses wiremock to stand in for the tracking endpoint.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use quiz_flow_engine::error::TrackingError;
use quiz_flow_engine::tracking::{HttpNotifier, SessionEvent, SessionNotifier};
use quiz_flow_engine::{QuizGraph, TraversalEngine};

fn start_event() -> SessionEvent {
    SessionEvent::Start {
        quiz_id: "intake".to_string(),
        session_id: "sess-1".to_string(),
        at: Utc::now(),
    }
}

/// Poll the mock server until it has seen `count` requests or give up.
async fn wait_for_requests(server: &MockServer, count: usize) -> Vec<Value> {
    for _ in 0..50 {
        let received = server.received_requests().await.unwrap_or_default();
        if received.len() >= count {
            return received
                .iter()
                .map(|r| serde_json::from_slice(&r.body).unwrap())
                .collect();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("tracking endpoint did not receive {} requests", count);
}

#[tokio::test]
async fn test_send_posts_event_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/track"))
        .and(body_partial_json(json!({"kind": "start", "quiz_id": "intake"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = HttpNotifier::new(format!("{}/track", server.uri()), 2000).unwrap();
    notifier.send(&start_event()).await.unwrap();
}

#[tokio::test]
async fn test_send_reports_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let notifier = HttpNotifier::new(format!("{}/track", server.uri()), 2000).unwrap();
    let err = notifier.send(&start_event()).await.unwrap_err();
    assert!(matches!(err, TrackingError::Rejected { status: 503 }));
}

#[tokio::test]
async fn test_session_events_are_posted_in_background() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/track"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let graph = QuizGraph::from_value(json!({
        "quiz_id": "intake",
        "title": "Intake",
        "questions": {
            "Q1": {"type": "single_choice", "text": "Who?", "options": [
                {"id": "self", "text": "Me", "next": "RESULTS", "tags": ["audience:self"]}
            ]}
        }
    }))
    .unwrap();

    let notifier = HttpNotifier::new(format!("{}/track", server.uri()), 2000).unwrap();
    let mut engine = TraversalEngine::start_with_notifier(Arc::new(graph), Arc::new(notifier)).unwrap();
    engine.select_option("self").unwrap();

    let bodies = wait_for_requests(&server, 3).await;
    let kinds: Vec<&str> = bodies.iter().filter_map(|b| b["kind"].as_str()).collect();
    assert_eq!(kinds, vec!["start", "answer", "complete"]);
    assert!(bodies
        .iter()
        .all(|b| b["session_id"].as_str() == Some(engine.session_id())));
}

#[tokio::test]
async fn test_events_arrive_in_emission_order_despite_slow_endpoint() {
    let server = MockServer::start().await;
    // the first event is answered slowly; later ones must still queue behind it
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"kind": "start"})))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(150)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let notifier = HttpNotifier::new(format!("{}/track", server.uri()), 2000).unwrap();
    for session_id in ["sess-1", "sess-2", "sess-3"] {
        notifier.notify(SessionEvent::Start {
            quiz_id: "intake".to_string(),
            session_id: session_id.to_string(),
            at: Utc::now(),
        });
        notifier.notify(SessionEvent::Complete {
            quiz_id: "intake".to_string(),
            session_id: session_id.to_string(),
            collected_tags: vec!["audience:self".to_string()],
            path_length: 1,
            at: Utc::now(),
        });
    }

    let bodies = wait_for_requests(&server, 6).await;
    let order: Vec<(&str, &str)> = bodies
        .iter()
        .map(|b| (b["kind"].as_str().unwrap(), b["session_id"].as_str().unwrap()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("start", "sess-1"),
            ("complete", "sess-1"),
            ("start", "sess-2"),
            ("complete", "sess-2"),
            ("start", "sess-3"),
            ("complete", "sess-3"),
        ]
    );
}

#[tokio::test]
async fn test_unreachable_endpoint_never_blocks_traversal() {
    // nothing listens on port 9 (discard); delivery fails in the background
    let notifier = HttpNotifier::new("http://127.0.0.1:9/track", 200).unwrap();
    let graph = QuizGraph::from_value(json!({
        "quiz_id": "intake",
        "title": "Intake",
        "questions": {
            "Q1": {"type": "single_choice", "text": "Who?", "options": [
                {"id": "self", "text": "Me", "next": "RESULTS"}
            ]}
        }
    }))
    .unwrap();

    let mut engine = TraversalEngine::start_with_notifier(Arc::new(graph), Arc::new(notifier)).unwrap();
    engine.select_option("self").unwrap();
    assert!(engine.is_terminal());
}
