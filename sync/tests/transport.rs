use common::{Endpoint, JobId};
use jobdeck_sync::config::ApiConfig;
use jobdeck_sync::{HttpTransport, SyncError, Transport};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the one-shot server saw.
struct Received {
    request_line: String,
    body: String,
}

/// Accepts a single connection, records the request and answers with the
/// canned status line and body.
async fn serve_once(status: &'static str, body: &'static str) -> (HttpTransport, JoinHandle<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let reply = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(reply.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        Received {
            request_line: head.lines().next().unwrap_or_default().to_string(),
            body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
        }
    });

    let transport = HttpTransport::new(&ApiConfig {
        base_url: format!("http://{}/", addr),
        request_timeout_ms: 5_000,
    })
    .unwrap();
    (transport, server)
}

#[tokio::test]
async fn non_success_status_is_a_status_error() {
    let (transport, server) = serve_once("500 Internal Server Error", "{\"error\":\"boom\"}").await;

    let err = transport.send(&Endpoint::Stats, None).await.unwrap_err();
    match err {
        SyncError::Status { endpoint, status } => {
            assert_eq!(endpoint, "GET /stats");
            assert_eq!(status, 500);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn success_body_that_is_not_json_is_null() {
    let (transport, server) = serve_once("200 OK", "not json").await;

    let value = transport.send(&Endpoint::Job(JobId::from("j-1")), None).await.unwrap();
    assert_eq!(value, Value::Null);

    let seen = server.await.unwrap();
    assert_eq!(seen.request_line, "GET /jobs/j-1 HTTP/1.1");
}

#[tokio::test]
async fn list_requests_carry_limit_and_offset() {
    let (transport, server) = serve_once("200 OK", "{\"jobs\":[],\"meta\":{\"totalPages\":3}}").await;

    let value = transport
        .send(&Endpoint::DeadJobs { limit: 20, offset: 40 }, None)
        .await
        .unwrap();
    assert_eq!(value["meta"]["totalPages"], 3);

    let seen = server.await.unwrap();
    assert_eq!(seen.request_line, "GET /jobs/dead?limit=20&offset=40 HTTP/1.1");
    assert!(seen.body.is_empty());
}

#[tokio::test]
async fn post_sends_json_body() {
    let (transport, server) = serve_once("201 Created", "{\"jobId\":\"j-9\"}").await;
    let body = json!({"type": "notification:email", "payload": "{}"});

    let created = transport.send(&Endpoint::CreateJob, Some(&body)).await.unwrap();
    assert_eq!(created["jobId"], "j-9");

    let seen = server.await.unwrap();
    assert_eq!(seen.request_line, "POST /jobs HTTP/1.1");
    let sent: Value = serde_json::from_str(&seen.body).unwrap();
    assert_eq!(sent, body);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(&ApiConfig {
        base_url: format!("http://{}", addr),
        request_timeout_ms: 2_000,
    })
    .unwrap();

    let err = transport.send(&Endpoint::Stats, None).await.unwrap_err();
    assert!(matches!(err, SyncError::Transport { ref endpoint, .. } if endpoint == "GET /stats"));
    assert!(!err.is_local());
}
