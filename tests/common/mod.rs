//! Shared utilities for relay integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_proxy::config::RelayConfig;
use relay_proxy::http::HttpServer;
use relay_proxy::lifecycle::Shutdown;
use relay_proxy::relay::RequestStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A raw-TCP upstream that records what it receives.
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    heads: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Connections that sent a request head.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request heads received so far (request line + headers).
    pub fn heads(&self) -> Vec<String> {
        self.heads.lock().unwrap().clone()
    }
}

/// Build a raw HTTP/1.1 response that closes the connection.
pub fn http_response(status_line: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!("HTTP/1.1 {}\r\n", status_line);
    for (name, value) in headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n{}", body.len(), body));
    response
}

/// Start an upstream that answers every request with `raw` verbatim.
///
/// `raw` is written as-is, so a `Content-Length` larger than the body
/// simulates a truncated response.
pub async fn start_upstream(raw: String) -> MockUpstream {
    start(Reply::WriteAndClose(raw)).await
}

/// Start an upstream that reads the request and then never answers.
pub async fn start_stalled_upstream() -> MockUpstream {
    start(Reply::Stall).await
}

/// Start an upstream that writes `raw` (typically a head plus part of the
/// body) and then holds the connection open without sending more.
pub async fn start_stalled_body_upstream(raw: String) -> MockUpstream {
    start(Reply::WriteAndStall(raw)).await
}

#[derive(Clone)]
enum Reply {
    WriteAndClose(String),
    WriteAndStall(String),
    Stall,
}

async fn start(reply: Reply) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let heads = Arc::new(Mutex::new(Vec::new()));

    let upstream = MockUpstream {
        addr,
        hits: hits.clone(),
        heads: heads.clone(),
    };

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let reply = reply.clone();
                    let hits = hits.clone();
                    let heads = heads.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        hits.fetch_add(1, Ordering::SeqCst);
                        heads.lock().unwrap().push(head);

                        match reply {
                            Reply::WriteAndClose(raw) => {
                                let _ = socket.write_all(raw.as_bytes()).await;
                                let _ = socket.shutdown().await;
                            }
                            Reply::WriteAndStall(raw) => {
                                let _ = socket.write_all(raw.as_bytes()).await;
                                let _ = socket.flush().await;
                                tokio::time::sleep(Duration::from_secs(60)).await;
                            }
                            Reply::Stall => {
                                tokio::time::sleep(Duration::from_secs(60)).await;
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    upstream
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A relay running on an ephemeral port.
pub struct RunningRelay {
    pub addr: SocketAddr,
    pub store: RequestStore,
    shutdown: Shutdown,
}

impl RunningRelay {
    pub fn endpoint(&self) -> String {
        format!("http://{}/proxy", self.addr)
    }
}

impl Drop for RunningRelay {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_relay(mut config: RelayConfig) -> RunningRelay {
    config.listener.bind_address = "127.0.0.1:0".to_string();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).unwrap();
    let store = server.store().clone();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningRelay {
        addr,
        store,
        shutdown,
    }
}

/// Client for talking to the relay itself.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
