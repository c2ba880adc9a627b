use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use shared::{ApiError, BackendClient, JobStatus};

/// Serves exactly one HTTP response on a fresh local port and returns the
/// base URL pointing at it.
fn serve_once(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 16384];
            let _ = stream.read(&mut buf);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{}", addr)
}

/// A port with nothing listening on it.
fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[tokio::test]
async fn fetch_job_parses_the_job_body() {
    let base = serve_once(
        "200 OK",
        r#"{"id": "j-1", "status": "queued", "progress": 0, "steps": []}"#,
    );
    let client = BackendClient::new(&base);
    let job = client.fetch_job("j-1").await.unwrap();
    assert_eq!(job.id, "j-1");
    assert_eq!(job.status, JobStatus::Queued);
}

#[tokio::test]
async fn backend_errors_surface_the_detail_message() {
    let base = serve_once("500 Internal Server Error", r#"{"detail": "model not loaded"}"#);
    let client = BackendClient::new(&base);
    let err = client.fetch_job("j-1").await.unwrap_err();
    match err {
        ApiError::Backend { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "model not loaded");
        }
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn backend_errors_without_detail_get_a_generic_message() {
    let base = serve_once("503 Service Unavailable", "oops");
    let client = BackendClient::new(&base);
    let err = client.fetch_job("j-1").await.unwrap_err();
    match err {
        ApiError::Backend { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "Backend returned status 503.");
        }
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_success_bodies_map_to_decode_errors() {
    let base = serve_once("200 OK", r#"{"id": 42}"#);
    let client = BackendClient::new(&base);
    let err = client.fetch_job("j-1").await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
    assert_eq!(err.to_string(), "Backend returned a malformed response.");
}

#[tokio::test]
async fn transport_failures_map_to_network_errors() {
    let client = BackendClient::new(&dead_endpoint());
    let err = client.fetch_job("j-1").await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(err.to_string(), "Failed to reach the backend API.");
}

#[tokio::test]
async fn fetch_pose_parses_the_sequence() {
    let base = serve_once(
        "200 OK",
        r#"{
            "frames": [[[1.0, 2.0, 1.0]]],
            "edges": [],
            "bounds": {"min_x": 0.0, "max_x": 2.0, "min_y": 0.0, "max_y": 4.0},
            "fps": 24
        }"#,
    );
    let client = BackendClient::new(&base);
    let seq = client.fetch_pose("j-1", 2).await.unwrap();
    assert_eq!(seq.frames.len(), 1);
    assert_eq!(seq.joint_count(), 1);
}

#[tokio::test]
async fn recognize_parses_the_prediction() {
    let base = serve_once(
        "200 OK",
        r#"{"label": "A", "confidence": 0.92, "top3": [{"label": "A", "score": 0.92}]}"#,
    );
    let client = BackendClient::new(&base);
    let recognition = client.recognize(vec![0xff, 0xd8, 0xff]).await.unwrap();
    assert_eq!(recognition.label, "A");
    assert!((recognition.confidence - 0.92).abs() < f32::EPSILON);
}
