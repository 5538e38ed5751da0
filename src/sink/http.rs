use crate::{
    errors::PublishError,
    http::{header::set_header, request_line, types::slice_to_usize},
    sink::transport::Transport,
};
use memchr::memchr;
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

const REQUEST_TEMPLATE: &[u8] = b"POST / HTTP/1.1\r\n\r\n";
const MAX_STATUS_LINE: usize = 8 * 1024;

/// [`Transport`] POSTing every record to an HTTP upstream; the destination is
/// the request path.
///
/// The request is assembled with the crate's own header and request-line
/// mutators, sent on a fresh connection, and judged by the status line of
/// the reply alone: anything outside `2xx` is
/// [`PublishError::Rejected`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    upstream: String,
    content_type: String,
    timeout: Duration,
}

impl HttpTransport {
    /// `upstream` is the `host:port` to connect to; it is also sent as the
    /// `Host` header.
    #[inline]
    pub fn new(upstream: impl Into<String>) -> Self {
        HttpTransport {
            upstream: upstream.into(),
            content_type: "application/octet-stream".into(),
            timeout: Duration::from_secs(5),
        }
    }

    #[inline]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Limit for the whole exchange, connect included (default: `5 seconds`).
    #[inline]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the request carrying `record` as its body.
    #[inline]
    pub(crate) fn request(&self, record: &[u8], path: &str) -> Result<Vec<u8>, PublishError> {
        let path = match path.is_empty() {
            true => "/",
            false => path,
        };

        let mut request = request_line::set_path(REQUEST_TEMPLATE, path.as_bytes())?;
        request = set_header(&request, b"Content-Length", record.len().to_string().as_bytes())?;
        request = set_header(&request, b"Content-Type", self.content_type.as_bytes())?;
        request = set_header(&request, b"Connection", b"close")?;
        request = set_header(&request, b"Host", self.upstream.as_bytes())?;

        request.extend_from_slice(record);
        Ok(request)
    }

    #[inline]
    async fn exchange(&self, request: &[u8]) -> Result<u16, PublishError> {
        let mut stream = TcpStream::connect(&self.upstream).await?;
        stream.write_all(request).await?;

        let mut reply = Vec::with_capacity(256);
        let mut chunk = [0u8; 1024];

        while memchr(b'\n', &reply).is_none() {
            let read = stream.read(&mut chunk).await?;
            if read == 0 || reply.len() + read > MAX_STATUS_LINE {
                break;
            }
            reply.extend_from_slice(&chunk[..read]);
        }

        request_line::status(&reply)
            .and_then(slice_to_usize)
            .and_then(|code| u16::try_from(code).ok())
            .ok_or_else(|| PublishError::Unexpected("upstream sent no valid status line".into()))
    }
}

impl Transport for HttpTransport {
    async fn publish(&self, record: &[u8], destination: &str) -> Result<(), PublishError> {
        let request = self.request(record, destination)?;

        match timeout(self.timeout, self.exchange(&request)).await?? {
            200..=299 => Ok(()),
            code => Err(PublishError::Rejected(code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{http::header::header, tools::*};
    use tokio::net::TcpListener;

    /// Accepts one connection, reads the whole request and answers `reply`.
    async fn upstream(reply: &'static [u8]) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];

            loop {
                let read = stream.read(&mut chunk).await.unwrap();
                request.extend_from_slice(&chunk[..read]);

                let body_len = header(&request, b"Content-Length")
                    .and_then(slice_to_usize)
                    .unwrap_or(0);
                let body = request_line::body(&request);
                if read == 0 || (request.windows(4).any(|w| w == b"\r\n\r\n") && body.len() >= body_len) {
                    break;
                }
            }

            stream.write_all(reply).await.unwrap();
            request
        });

        (addr, handle)
    }

    #[test]
    fn builds_request() {
        let transport = HttpTransport::new("127.0.0.1:9000").content_type("application/json");
        let request = transport.request(b"{\"a\":1}", "/events?src=capture").unwrap();

        assert_eq!(str_op(request_line::path(&request).unwrap()), "/events");
        assert_eq!(str(header(&request, b"host")), Some("127.0.0.1:9000"));
        assert_eq!(str(header(&request, b"content-length")), Some("7"));
        assert_eq!(str(header(&request, b"Content-Type")), Some("application/json"));
        assert_eq!(request_line::body(&request), b"{\"a\":1}");
        assert!(request_line::has_request_title(&request));
    }

    #[test]
    fn empty_path() {
        let request = HttpTransport::new("h:1").request(b"", "").unwrap();
        assert_eq!(request_line::path(&request).unwrap(), b"/");
    }

    #[tokio::test]
    async fn accepted() {
        let (addr, server) = upstream(b"HTTP/1.1 202 Accepted\r\nContent-Length: 0\r\n\r\n").await;

        let result = HttpTransport::new(addr).publish(b"1 2 3\nGET / HTTP/1.1\r\n\r\n", "/capture").await;
        assert_eq!(result, Ok(()));

        let request = server.await.unwrap();
        assert_eq!(request_line::path(&request).unwrap(), b"/capture");
        assert_eq!(request_line::body(&request), b"1 2 3\nGET / HTTP/1.1\r\n\r\n");
    }

    #[tokio::test]
    async fn rejected() {
        let (addr, server) = upstream(b"HTTP/1.1 503 Service Unavailable\r\n\r\n").await;

        let result = HttpTransport::new(addr).publish(b"x", "/").await;
        assert_eq!(result, Err(PublishError::Rejected(503)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn garbage_reply() {
        let (addr, server) = upstream(b"nonsense").await;

        let result = HttpTransport::new(addr).publish(b"x", "/").await;
        assert!(matches!(result, Err(PublishError::Unexpected(_))));
        server.await.unwrap();
    }
}
