//! In-process stand-in for an Ollama server

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// How the fake server answers every request
#[derive(Clone)]
pub enum Reply {
    /// 200 with the body sent as the given chunks, one HTTP chunk each
    Chunks(Vec<String>),
    /// Non-2xx status with a plain text body
    Status(u16, String),
    /// Accept the request and never answer
    Stall,
}

impl Reply {
    pub fn body(body: &str) -> Self {
        Reply::Chunks(vec![body.to_string()])
    }
}

pub struct FakeOllama {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl FakeOllama {
    pub async fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let reply = reply.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    serve(stream, reply, seen).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.requests.lock().unwrap().clone()
    }
}

/// A base URL nothing listens on
pub async fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn serve(mut stream: TcpStream, reply: Reply, seen: Arc<Mutex<Vec<serde_json::Value>>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
    }

    if let Ok(body) = serde_json::from_slice(&buf[header_end..header_end + content_length]) {
        seen.lock().unwrap().push(body);
    }

    match reply {
        Reply::Chunks(chunks) => {
            let head = "HTTP/1.1 200 OK\r\n\
                        Content-Type: application/x-ndjson\r\n\
                        Transfer-Encoding: chunked\r\n\
                        Connection: close\r\n\r\n";
            let _ = stream.write_all(head.as_bytes()).await;
            for part in chunks {
                let framed = format!("{:x}\r\n{}\r\n", part.len(), part);
                let _ = stream.write_all(framed.as_bytes()).await;
                let _ = stream.flush().await;
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            let _ = stream.write_all(b"0\r\n\r\n").await;
        }
        Reply::Status(code, text) => {
            let response = format!(
                "HTTP/1.1 {} Error\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                code,
                text.len(),
                text
            );
            let _ = stream.write_all(response.as_bytes()).await;
        }
        Reply::Stall => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
    let _ = stream.shutdown().await;
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
