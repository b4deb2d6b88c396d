use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use consul_watch::kv::KeyValue;
use consul_watch::ConfigFormat;
use consul_watch::WatcherSettings;
use parking_lot::Mutex;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tracing::debug;

pub const WAIT_FOR_EVENT_IN_SEC: u64 = 5;

/// Canned answer of the fake agent for one blocking query
#[derive(Debug, Clone)]
pub enum Answer {
    Entries(String),
    NotFound,
}

impl Answer {
    pub fn entries(entries: &[KeyValue]) -> Self {
        Answer::Entries(serde_json::to_string(entries).unwrap_or_default())
    }
}

type Answers = Arc<Mutex<HashMap<String, VecDeque<Answer>>>>;

/// Minimal Consul agent serving `/v1/kv` from per-key queues
///
/// A request for a key with no queued answer is held open, the way a blocking
/// query waits for a change.
pub struct FakeConsul {
    port: u16,
    answers: Answers,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeConsul {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let answers: Answers = Arc::default();
        let requests: Arc<Mutex<Vec<String>>> = Arc::default();

        let server_answers = answers.clone();
        let server_requests = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve(socket, server_answers.clone(), server_requests.clone()));
            }
        });

        Self {
            port,
            answers,
            requests,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn answer(
        &self,
        key: &str,
        answer: Answer,
    ) {
        self.answers.lock().entry(key.to_string()).or_default().push_back(answer);
    }

    /// Request targets received so far, e.g. `/v1/kv/config/orders?index=3&wait=10m`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

async fn serve(
    mut socket: TcpStream,
    answers: Answers,
    requests: Arc<Mutex<Vec<String>>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let request = String::from_utf8_lossy(&buf).to_string();
    let target = request.split_whitespace().nth(1).unwrap_or_default().to_string();
    let key = target
        .trim_start_matches("/v1/kv/")
        .split('?')
        .next()
        .unwrap_or_default()
        .to_string();
    debug!(%target, "Fake consul request");
    requests.lock().push(target);

    let answer = answers.lock().get_mut(&key).and_then(VecDeque::pop_front);
    let response = match answer {
        Some(Answer::Entries(body)) => http_response("200 OK", &body),
        Some(Answer::NotFound) => http_response("404 Not Found", ""),
        None => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return;
        }
    };
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

fn http_response(
    status_line: &str,
    body: &str,
) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    )
}

pub fn settings_for(
    port: u16,
    format: ConfigFormat,
) -> WatcherSettings {
    let mut settings = WatcherSettings::default();
    settings.watch.enabled = true;
    settings.consul.host = "127.0.0.1".to_string();
    settings.consul.port = port;
    settings.consul.service_id = "orders".to_string();
    settings.consul.config.format = format;
    settings
}

/// Polls `condition` every 20ms until it holds or the deadline passes
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(WAIT_FOR_EVENT_IN_SEC);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
