//! Ollama client against a minimal in-process HTTP server

use std::time::Duration;

use taleweaver_core::backend::ChatBackend;
use taleweaver_core::{
    BackendError, BackendSettings, ChatMessage, ChatRequest, ConfigSource, OllamaBackend,
    StreamingToken,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve exactly one request with `status` and `body`, reporting the request
/// body it received
async fn serve_once(status: &'static str, body: String) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let _ = seen_tx.send(request);

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    (format!("http://{addr}"), seen_rx)
}

/// Read headers plus a `Content-Length` body, returning the body
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + length {
                return String::from_utf8_lossy(&data[header_end + 4..header_end + 4 + length])
                    .to_string();
            }
        }
    }
    String::new()
}

fn backend(url: &str) -> OllamaBackend {
    OllamaBackend::new(&BackendSettings {
        base_url: url.to_string(),
        connect_timeout: Duration::from_secs(2),
        request_timeout: Some(Duration::from_secs(10)),
        url_source: ConfigSource::Default,
    })
    .unwrap()
}

fn request() -> ChatRequest {
    ChatRequest::new(
        "llama2",
        vec![ChatMessage::system("Narrate."), ChatMessage::user("hi")],
    )
    .with_temperature(0.5)
    .with_context_size(6)
}

async fn collect(mut rx: tokio::sync::mpsc::Receiver<StreamingToken>) -> Vec<StreamingToken> {
    let mut tokens = Vec::new();
    while let Some(token) = rx.recv().await {
        tokens.push(token);
    }
    tokens
}

fn line(content: &str, done: bool) -> String {
    format!(
        "{}\n",
        serde_json::json!({
            "model": "llama2",
            "message": { "role": "assistant", "content": content },
            "done": done,
        })
    )
}

#[tokio::test]
async fn test_streams_deltas_in_order() {
    let body = [
        line("Hello", false),
        line(" world", false),
        line("", true),
    ]
    .concat();
    let (url, seen) = serve_once("200 OK", body).await;

    let rx = backend(&url).send_streaming(&request()).await.unwrap();
    let tokens = collect(rx).await;

    let deltas: Vec<&str> = tokens
        .iter()
        .filter_map(|t| match t {
            StreamingToken::Token(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(deltas, vec!["Hello", " world"]);
    assert!(matches!(
        tokens.last(),
        Some(StreamingToken::Complete { message }) if message == "Hello world"
    ));

    let sent: serde_json::Value = serde_json::from_str(&seen.await.unwrap()).unwrap();
    assert_eq!(sent["model"], "llama2");
    assert_eq!(sent["stream"], true);
    assert_eq!(sent["messages"][1]["role"], "user");
    assert_eq!(sent["messages"][1]["content"], "hi");
    assert_eq!(sent["options"]["num_ctx"], 6);
}

#[tokio::test]
async fn test_body_end_without_done_completes() {
    let body = [line("The end", false)].concat();
    let (url, _seen) = serve_once("200 OK", body).await;

    let tokens = collect(backend(&url).send_streaming(&request()).await.unwrap()).await;
    assert!(matches!(
        tokens.last(),
        Some(StreamingToken::Complete { message }) if message == "The end"
    ));
}

#[tokio::test]
async fn test_malformed_line_is_error() {
    let body = format!("{}not json at all\n{}", line("ok", false), line("", true));
    let (url, _seen) = serve_once("200 OK", body).await;

    let tokens = collect(backend(&url).send_streaming(&request()).await.unwrap()).await;
    assert!(matches!(tokens[0], StreamingToken::Token(ref t) if t == "ok"));
    assert!(matches!(
        tokens[1],
        StreamingToken::Error(BackendError::Malformed { .. })
    ));
    // Nothing follows an error
    assert_eq!(tokens.len(), 2);
}

#[tokio::test]
async fn test_remote_error_line() {
    let body = "{\"error\":\"model \\\"nope\\\" not found\"}\n".to_string();
    let (url, _seen) = serve_once("200 OK", body).await;

    let tokens = collect(backend(&url).send_streaming(&request()).await.unwrap()).await;
    assert!(matches!(
        tokens.as_slice(),
        [StreamingToken::Error(BackendError::Remote(msg))] if msg.contains("not found")
    ));
}

#[tokio::test]
async fn test_error_status() {
    let (url, _seen) = serve_once("500 Internal Server Error", "boom".to_string()).await;

    let err = backend(&url).send_streaming(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        BackendError::Status { status: 500, ref body } if body == "boom"
    ));
}

#[tokio::test]
async fn test_unreachable_backend() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = backend(&format!("http://{addr}"))
        .send_streaming(&request())
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Connect { .. }));
    assert!(!backend(&format!("http://{addr}")).health_check().await);
}
