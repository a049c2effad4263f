//! Exchange-level tests for the OpenAI client against a local stub server

use super::*;
use crate::config::ClientConfig;

use probe_bench_core::{ErrorKind, OrchestratorBuilder, TaskStatus};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// ============================================================================
// Stub server
// ============================================================================

#[derive(Clone)]
enum Reply {
    /// Write a complete raw HTTP response and close
    Full(String),
    /// Write event-stream headers, then each chunk after its delay, then close
    Stream(Vec<(Duration, Vec<u8>)>),
    /// Read the request and never answer
    Hang,
}

struct Stub {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Stub {
    async fn start<F>(handler: F) -> Stub
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handler = Arc::new(handler);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let handler = Arc::clone(&handler);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let _ = serve(socket, handler, log).await;
                });
            }
        });

        Stub {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve<F>(
    mut socket: TcpStream,
    handler: Arc<F>,
    log: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()>
where
    F: Fn(&str) -> Reply,
{
    let request = read_request(&mut socket).await?;
    let reply = handler(&request);
    log.lock().unwrap().push(request);

    match reply {
        Reply::Full(raw) => {
            socket.write_all(raw.as_bytes()).await?;
        }
        Reply::Stream(chunks) => {
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n",
                )
                .await?;
            for (delay, bytes) in chunks {
                tokio::time::sleep(delay).await;
                socket.write_all(&bytes).await?;
                socket.flush().await?;
            }
        }
        Reply::Hang => std::future::pending::<()>().await,
    }
    socket.shutdown().await
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn http(status: &str, body: &str) -> Reply {
    Reply::Full(format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    ))
}

fn completion(content: &str) -> Reply {
    let body = serde_json::json!({
        "id": "cmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    });
    http("200 OK", &body.to_string())
}

fn frame(content: &str) -> Vec<u8> {
    format!(
        "data: {}\n\n",
        serde_json::json!({"choices": [{"delta": {"content": content}}]})
    )
    .into_bytes()
}

fn client(stub: &Stub, mode: ProbeMode, timeout: Duration) -> OpenAiClient {
    OpenAiClient::new(
        ClientConfig::new(format!("{}/v1/", stub.base_url))
            .with_api_key("test-key")
            .with_mode(mode)
            .with_timeout(timeout),
    )
    .unwrap()
}

fn task(model: &str) -> ProbeTask {
    ProbeTask::new(0, model, "Say hi")
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_new_rejects_invalid_config() {
    let err = OpenAiClient::new(ClientConfig::new("http://localhost:1")).unwrap_err();
    assert!(matches!(err, ProbeError::Config(_)));
    assert!(err.to_string().contains("api_key"));
}

// ============================================================================
// Single-shot
// ============================================================================

#[tokio::test]
async fn test_single_shot_success() {
    let stub = Stub::start(|_| completion("Hello from the model")).await;
    let client = client(&stub, ProbeMode::SingleShot, Duration::from_secs(5));

    let output = client.probe(&task("gpt-test")).await.unwrap();
    assert_eq!(output.text, "Hello from the model");
    assert!(!output.missing_content);

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.starts_with("POST /v1/chat/completions "));
    assert!(request.to_lowercase().contains("authorization: bearer test-key"));
    assert!(request.contains(r#""model":"gpt-test""#));
    assert!(request.contains(r#""content":"Say hi""#));
    assert!(request.contains(r#""max_tokens":80"#));
    assert!(request.contains(r#""stream":false"#));
}

#[tokio::test]
async fn test_single_shot_missing_content_is_success_with_fallback() {
    let stub = Stub::start(|_| http("200 OK", r#"{"choices":[{"message":{"role":"assistant"}}]}"#)).await;
    let client = client(&stub, ProbeMode::SingleShot, Duration::from_secs(5));

    let output = client.probe(&task("m")).await.unwrap();
    assert!(output.missing_content);
    assert!(output.text.starts_with(wire::MISSING_CONTENT_TEXT));
    assert!(output.text.contains("\"role\": \"assistant\""));
    assert_eq!(output.warnings(), vec![ErrorKind::MissingContent]);
}

#[tokio::test]
async fn test_http_error_uses_structured_message() {
    let stub = Stub::start(|_| {
        http(
            "401 Unauthorized",
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
        )
    })
    .await;
    let client = client(&stub, ProbeMode::SingleShot, Duration::from_secs(5));

    let err = client.probe(&task("m")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HttpError);
    assert_eq!(err.to_string(), "HTTP 401: Incorrect API key provided");
}

#[tokio::test]
async fn test_http_error_falls_back_to_raw_body() {
    let stub = Stub::start(|_| http("502 Bad Gateway", "upstream unavailable")).await;
    let client = client(&stub, ProbeMode::Streaming, Duration::from_secs(5));

    match client.probe(&task("m")).await.unwrap_err() {
        ProbeError::Http { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "upstream unavailable");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_one_millisecond_timeout_against_silent_server() {
    let stub = Stub::start(|_| Reply::Hang).await;
    let client = client(&stub, ProbeMode::SingleShot, Duration::from_millis(1));

    let err = client.probe(&task("m")).await.unwrap_err();
    assert!(matches!(err, ProbeError::Timeout(_)));
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = OpenAiClient::new(
        ClientConfig::new(format!("http://{addr}")).with_api_key("k"),
    )
    .unwrap();

    let err = client.probe(&task("m")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportError);
}

// ============================================================================
// Streaming
// ============================================================================

#[tokio::test]
async fn test_streaming_aggregates_split_frames() {
    let mut stream = frame("Hel");
    stream.extend(b"data: {broken\n\n");
    stream.extend(frame("lo"));
    stream.extend(b"data: [DONE]\n\n");
    let (first, second) = stream.split_at(17);
    let chunks = vec![
        (Duration::ZERO, first.to_vec()),
        (Duration::from_millis(10), second.to_vec()),
    ];

    let stub = Stub::start(move |_| Reply::Stream(chunks.clone())).await;
    let client = client(&stub, ProbeMode::Streaming, Duration::from_secs(5));

    let output = client.probe(&task("m")).await.unwrap();
    assert_eq!(output.text, "Hello");
    assert_eq!(output.malformed_chunks, 1);
    assert_eq!(output.warnings(), vec![ErrorKind::MalformedStreamChunk]);

    let request = &stub.requests()[0];
    assert!(request.contains(r#""stream":true"#));
    assert!(request.contains(r#""max_tokens":250"#));
}

#[tokio::test]
async fn test_streaming_timeout_bounds_idle_gaps_not_total_time() {
    let chunks: Vec<_> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|c| (Duration::from_millis(80), frame(c)))
        .chain([(Duration::from_millis(80), b"data: [DONE]\n\n".to_vec())])
        .collect();

    let stub = Stub::start(move |_| Reply::Stream(chunks.clone())).await;
    let client = client(&stub, ProbeMode::Streaming, Duration::from_millis(300));

    let output = client.probe(&task("m")).await.unwrap();
    assert_eq!(output.text, "abcd");
}

#[tokio::test]
async fn test_streaming_stalled_body_times_out() {
    let chunks = vec![
        (Duration::ZERO, frame("partial")),
        (Duration::from_secs(5), frame("never")),
    ];

    let stub = Stub::start(move |_| Reply::Stream(chunks.clone())).await;
    let client = client(&stub, ProbeMode::Streaming, Duration::from_millis(100));

    let err = client.probe(&task("m")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_streaming_placeholders_when_enabled() {
    let mut stream = frame("a");
    stream.extend(b"data: ???\n");
    stream.extend(frame("b"));
    let chunks = vec![(Duration::ZERO, stream)];

    let stub = Stub::start(move |_| Reply::Stream(chunks.clone())).await;
    let client = OpenAiClient::new(
        ClientConfig::new(&stub.base_url)
            .with_api_key("k")
            .with_mode(ProbeMode::Streaming)
            .with_malformed_markers(true),
    )
    .unwrap();

    let output = client.probe(&task("m")).await.unwrap();
    assert_eq!(output.text, "a[unparsable chunk: ???]b");
}

// ============================================================================
// Model listing
// ============================================================================

#[tokio::test]
async fn test_list_models_sorted() {
    let stub = Stub::start(|_| {
        http(
            "200 OK",
            r#"{"object":"list","data":[{"id":"zeta"},{"id":"alpha","owned_by":"x"},{"id":"mid"}]}"#,
        )
    })
    .await;
    let client = client(&stub, ProbeMode::SingleShot, Duration::from_secs(5));

    let models = client.list_models().await.unwrap();
    assert_eq!(models, ["alpha", "mid", "zeta"]);
    assert!(stub.requests()[0].starts_with("GET /v1/models "));
}

#[tokio::test]
async fn test_list_models_rejects_unexpected_shape() {
    let stub = Stub::start(|_| http("200 OK", r#"{"models":["a"]}"#)).await;
    let client = client(&stub, ProbeMode::SingleShot, Duration::from_secs(5));

    let err = client.list_models().await.unwrap_err();
    assert!(matches!(err, ProbeError::InvalidResponse(_)));
}

// ============================================================================
// Batch against the stub
// ============================================================================

#[tokio::test]
async fn test_batch_isolates_unresponsive_model() {
    let stub = Stub::start(|request| {
        if request.contains(r#""model":"silent""#) {
            Reply::Hang
        } else {
            completion("ok")
        }
    })
    .await;
    let client = Arc::new(client(&stub, ProbeMode::SingleShot, Duration::from_millis(300)));

    let report = OrchestratorBuilder::new()
        .models(["alpha", "silent", "beta"])
        .concurrency(3)
        .client(client)
        .build()
        .unwrap()
        .run()
        .await;

    let order: Vec<_> = report.results.iter().map(|r| r.model.as_str()).collect();
    assert_eq!(order, ["alpha", "beta", "silent"]);
    assert_eq!(report.results[0].output, "ok");
    assert_eq!(report.results[2].status, TaskStatus::Failed);
    assert_eq!(report.results[2].error_kind, Some(ErrorKind::Timeout));
    assert_eq!(report.summary.succeeded, 2);
}
