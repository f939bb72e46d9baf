//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use wrr_balancer::config::{ProxyConfig, ServerConfig};
use wrr_balancer::{HttpServer, Shutdown};

/// Read the request head (request line + headers).
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

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a programmable backend on an ephemeral port.
///
/// `f` receives the raw request head and returns status and body.
#[allow(dead_code)]
pub async fn start_programmable_backend<F>(f: F) -> SocketAddr
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let (status, body) = f(&head);
                let payload = if head.starts_with("HEAD ") { "" } else { body.as_str() };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line(status),
                    body.len(),
                    payload
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a backend that answers 200 with a fixed body.
#[allow(dead_code)]
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| (200, response.to_string())).await
}

/// A port nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

#[allow(dead_code)]
pub fn server(addr: SocketAddr, weight: u32) -> ServerConfig {
    ServerConfig::new(format!("http://{}", addr).parse().unwrap(), weight)
}

/// Start the balancer on an ephemeral port and wait until it accepts.
#[allow(dead_code)]
pub async fn start_balancer(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let (ready_tx, mut ready_rx) = mpsc::channel::<()>(1);
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = ready_tx.send(()).await;
        let _ = server.run(listener, server_shutdown).await;
    });
    ready_rx.recv().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// GET `path` and return the response body, or the status if not 2xx.
#[allow(dead_code)]
pub async fn fetch(client: &reqwest::Client, proxy: SocketAddr, path: &str) -> Result<String, u16> {
    let res = client
        .get(format!("http://{}{}", proxy, path))
        .send()
        .await
        .expect("Proxy unreachable");
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    if status.is_success() {
        Ok(body)
    } else {
        Err(status.as_u16())
    }
}
