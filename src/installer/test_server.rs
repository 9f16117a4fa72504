//! Minimal HTTP/1.1 server for download tests.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Clone)]
pub enum Reply {
    /// Raw response bytes, written as-is
    Raw(Vec<u8>),
    /// Accept the request and never answer
    Hang,
}

impl Reply {
    pub fn ok(headers: &[(&str, &str)], body: &[u8]) -> Self {
        Self::status(200, "OK", headers, body)
    }

    pub fn status(code: u16, reason: &str, headers: &[(&str, &str)], body: &[u8]) -> Self {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            code,
            reason,
            body.len()
        );
        for (name, value) in headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(body);
        Self::Raw(bytes)
    }

    pub fn redirect(location: &str) -> Self {
        Self::status(302, "Found", &[("Location", location)], b"")
    }
}

/// Serve `routes` (path -> reply) until the test runtime shuts down.
/// Returns the base URL, e.g. `http://127.0.0.1:41234`.
pub async fn serve(routes: Vec<(&'static str, Reply)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes: Arc<HashMap<&'static str, Reply>> = Arc::new(routes.into_iter().collect());

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let request = String::from_utf8_lossy(&buf);
                let path = request
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("/")
                    .to_string();

                match routes.get(path.as_str()) {
                    Some(Reply::Raw(bytes)) => {
                        let _ = socket.write_all(bytes).await;
                        let _ = socket.shutdown().await;
                    }
                    Some(Reply::Hang) => {
                        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                    }
                    None => {
                        if let Reply::Raw(bytes) = Reply::status(404, "Not Found", &[], b"") {
                            let _ = socket.write_all(&bytes).await;
                        }
                    }
                }
            });
        }
    });

    format!("http://{}", addr)
}
