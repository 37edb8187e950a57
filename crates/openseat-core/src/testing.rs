//! Loopback HTTP server for adapter tests
//!
//! Compiled with the `test-util` feature. Serves canned responses in order,
//! one per connection, and records every request it receives.

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One request as received by [`serve`]
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    /// Request line and headers
    pub head: String,
    /// Body, sized by `Content-Length`
    pub body: String,
}

/// Requests recorded by a running server
pub type Requests = Arc<Mutex<Vec<RecordedRequest>>>;

/// Serve `responses` in order on a loopback port
///
/// Returns the URL for `path` on the server and the shared request log.
/// Each response closes its connection.
pub async fn serve(
    path: &str,
    content_type: &'static str,
    responses: Vec<(u16, &'static str)>,
) -> (String, Requests) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            recorded.lock().unwrap().push(request);

            let response = format!(
                "HTTP/1.1 {} Status\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                content_type,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
    });

    (format!("http://{}{}", addr, path), requests)
}

/// Read one request: headers, then `Content-Length` bytes of body
async fn read_request(socket: &mut TcpStream) -> RecordedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let length = content_length(&text[..header_end]);
            if buf.len() >= header_end + 4 + length {
                return RecordedRequest {
                    head: text[..header_end].to_string(),
                    body: text[header_end + 4..header_end + 4 + length].to_string(),
                };
            }
        }
    }

    RecordedRequest {
        head: String::from_utf8_lossy(&buf).to_string(),
        body: String::new(),
    }
}

fn content_length(head: &str) -> usize {
    head.lines()
        .find_map(|l| {
            let (key, value) = l.split_once(':')?;
            key.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0)
}
