//! Scripted in-process QuakeLink server for tests.
//!
//! Replies are configured as raw byte blobs per request family, and every
//! request line is recorded per connection so tests can assert on exactly
//! what went over the wire.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::net::tcp::OwnedWriteHalf;

pub struct MockConfig {
    /// Greeting lines sent in response to `HELLO`, before `WELCOME`.
    pub hello_lines: Vec<String>,
    pub send_welcome: bool,
    /// Send the blank line after `WELCOME`.
    pub welcome_blank: bool,
    /// Raw bytes appended after the greeting block.
    pub trailer: Vec<u8>,
    /// Raw bytes written on any `GET` request.
    pub get_reply: Vec<u8>,
    /// Raw bytes written on any `SELECT` request.
    pub select_reply: Vec<u8>,
    /// Raw bytes written on `ABORT`.
    pub abort_reply: Vec<u8>,
    pub max_connections: usize,
}

impl MockConfig {
    pub fn with_api(api: u32) -> Self {
        Self {
            hello_lines: vec!["QuakeLink server (mock)".to_owned(), format!("API={api}")],
            send_welcome: true,
            welcome_blank: true,
            trailer: Vec::new(),
            get_reply: b"DATA/GET 404\r\n\r\n".to_vec(),
            select_reply: Vec::new(),
            abort_reply: b"EOD/SELECT\r\n".to_vec(),
            max_connections: 1,
        }
    }
}

/// Request lines received so far, grouped by connection.
#[derive(Clone, Default)]
pub struct Captured {
    inner: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Captured {
    pub fn connection(&self, index: usize) -> Vec<String> {
        self.inner.lock().unwrap()[index].clone()
    }

    fn open(&self) -> usize {
        let mut connections = self.inner.lock().unwrap();
        connections.push(Vec::new());
        connections.len() - 1
    }

    fn record(&self, index: usize, line: String) {
        self.inner.lock().unwrap()[index].push(line);
    }
}

pub struct MockServer {
    addr: SocketAddr,
    captured: Captured,
}

impl MockServer {
    pub async fn start(config: MockConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured = Captured::default();

        let task_captured = captured.clone();
        tokio::spawn(async move {
            Self::serve(listener, config, task_captured).await;
        });

        Self { addr, captured }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("ql://{}", self.addr)
    }

    pub fn captured(&self) -> &Captured {
        &self.captured
    }

    async fn serve(listener: TcpListener, config: MockConfig, captured: Captured) {
        for _ in 0..config.max_connections {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let index = captured.open();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();

            loop {
                line.clear();
                let n = match reader.read_line(&mut line).await {
                    Ok(n) => n,
                    Err(_) => break,
                };
                if n == 0 {
                    break;
                }

                let trimmed = line.trim().to_owned();
                captured.record(index, trimmed.clone());
                let upper = trimmed.to_uppercase();

                if upper == "HELLO" {
                    let mut greeting = String::new();
                    for hello_line in &config.hello_lines {
                        greeting.push_str(hello_line);
                        greeting.push_str("\r\n");
                    }
                    if config.send_welcome {
                        greeting.push_str("WELCOME\r\n");
                        if config.welcome_blank {
                            greeting.push_str("\r\n");
                        }
                    }
                    if write_half.write_all(greeting.as_bytes()).await.is_err() {
                        break;
                    }
                    if write_all(&mut write_half, &config.trailer).await.is_err() {
                        break;
                    }
                } else if upper.starts_with("AUTH") || upper.starts_with("SET") {
                    // neither is acknowledged
                } else if upper.starts_with("GET") {
                    if write_all(&mut write_half, &config.get_reply).await.is_err() {
                        break;
                    }
                } else if upper.starts_with("SELECT") {
                    if write_all(&mut write_half, &config.select_reply).await.is_err() {
                        break;
                    }
                } else if upper == "ABORT" {
                    if write_all(&mut write_half, &config.abort_reply).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

async fn write_all(write_half: &mut OwnedWriteHalf, data: &[u8]) -> std::io::Result<()> {
    write_half.write_all(data).await?;
    write_half.flush().await
}

/// Build one data response blob: status line, headers, blank line, payload,
/// trailing line break. `Content-Length` is derived from the payload.
pub fn data_response(
    status: &str,
    content_type: &str,
    payload: &[u8],
    extra_headers: &[(&str, &str)],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(status.as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
    out.extend_from_slice(format!("Content-Length: {}\r\n", payload.len()).as_bytes());
    for (key, value) in extra_headers {
        out.extend_from_slice(format!("{key}: {value}\r\n").as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(payload);
    out.extend_from_slice(b"\r\n");
    out
}
