//! Scripted HTTP/1.1 server on a loopback port.
//!
//! Each accepted connection gets the next scripted response and is closed.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt as _, AsyncReadExt as _, AsyncWriteExt as _, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// A scripted response.
#[derive(Debug, Clone)]
pub struct StubResponse {
    /// HTTP status code.
    pub status: u16,

    /// JSON body.
    pub body: String,
}

impl StubResponse {
    /// A response with a JSON body.
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// A request received by the stub.
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    /// Request method.
    pub method: String,

    /// Request target (path and query).
    pub target: String,

    /// Headers, names lowercased.
    pub headers: Vec<(String, String)>,

    /// Request body.
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// First value of the header `name` (lowercase).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A running stub server.
#[derive(Debug)]
pub struct HttpStub {
    /// Listening address.
    addr: std::net::SocketAddr,

    /// Requests received so far.
    requests: Arc<Mutex<Vec<RecordedRequest>>>,

    /// The accept loop.
    task: tokio::task::JoinHandle<()>,
}

impl HttpStub {
    /// Start serving `responses`, one per connection, in order.
    pub async fn start(responses: impl IntoIterator<Item = StubResponse>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses: Vec<_> = responses.into_iter().collect();

        let task = tokio::spawn({
            let requests = Arc::clone(&requests);
            async move {
                for response in responses {
                    let Ok((stream, _peer)) = listener.accept().await else {
                        return;
                    };
                    if serve(stream, &response, &requests).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(Self {
            addr,
            requests,
            task,
        })
    }

    /// Base URL, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        crate::lock(&self.requests).clone()
    }
}

impl Drop for HttpStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Read and record one request, then write `response`.
async fn serve(
    stream: TcpStream,
    response: &StubResponse,
    requests: &Mutex<Vec<RecordedRequest>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut request = RecordedRequest::default();

    let mut line = String::new();
    reader.read_line(&mut line).await?;
    let mut parts = line.split_whitespace();
    request.method = parts.next().unwrap_or_default().to_owned();
    request.target = parts.next().unwrap_or_default().to_owned();

    loop {
        line.clear();
        reader.read_line(&mut line).await?;
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            request
                .headers
                .push((name.trim().to_ascii_lowercase(), value.trim().to_owned()));
        }
    }

    let length = request
        .header("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    request.body = vec![0; length];
    reader.read_exact(&mut request.body).await?;
    crate::lock(requests).push(request);

    let head = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.body.len()
    );
    let mut stream = reader.into_inner();
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(response.body.as_bytes()).await?;
    stream.shutdown().await
}
