//! wirecast - Zero-copy rewriting and republishing of captured HTTP traffic
//!
//! Captured requests and responses are handled as raw wire bytes from start
//! to finish. Headers, the request path, query parameters and the
//! absolute-URI host are located by byte offset and rewritten by splicing,
//! never by building a parsed message tree.
//!
//! # Layers
//!
//! - [`http`]: scanner and accessors over one raw HTTP buffer
//! - [`CapturedMessage`]: capture metadata line plus the raw buffer
//! - [`Encoder`]: raw concatenation or structured JSON record
//! - [`Sink`]: non-blocking publication through an injected [`Transport`]
//!
//! # Examples
//!
//! Rewriting a request:
//! ```
//! use wirecast::http::{header, request_line};
//!
//! let buf = b"POST /post?param=test&user_id=1 HTTP/1.1\r\nContent-Length: 7\r\n\r\na=1&b=2";
//!
//! let buf = header::set_header(buf, b"Content-Length", b"14").unwrap();
//! let buf = request_line::set_query_param(&buf, b"param", b"new").unwrap();
//!
//! assert_eq!(header::header(&buf, b"content-length"), Some(&b"14"[..]));
//! assert_eq!(
//!     buf,
//!     b"POST /post?param=new&user_id=1 HTTP/1.1\r\nContent-Length: 14\r\n\r\na=1&b=2"
//! );
//! ```
//! Publishing captured traffic:
//! ```no_run
//! use wirecast::{CapturedMessage, MessageKind, Mode, Sink, SinkConfig, TcpTransport};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut sink = Sink::builder(TcpTransport::default())
//!         .config(SinkConfig {
//!             destination: "127.0.0.1:28020".into(),
//!             mode: Mode::Structured,
//!             ..SinkConfig::default()
//!         })
//!         .build();
//!     let mut outcomes = sink.outcomes().unwrap();
//!
//!     let msg = CapturedMessage::from_parts(
//!         MessageKind::Request,
//!         b"8f3a",
//!         b"1633024800",
//!         "GET /index HTTP/1.1\r\nHost: example.com\r\n\r\n",
//!     );
//!     sink.write(&msg).unwrap();
//!
//!     if let Some(outcome) = outcomes.recv().await {
//!         println!("record {}: {:?}", outcome.ticket, outcome.result);
//!     }
//!     sink.close().await;
//! }
//! ```

pub mod http {
    pub mod header;
    pub mod query;
    pub mod request_line;
    pub mod scan;
    pub mod types;
}
pub mod sink {
    pub mod file;
    pub mod http;
    pub(crate) mod mock;
    pub(crate) mod sink_impl;
    pub mod tcp;
    pub(crate) mod transport;
}
pub mod config;
pub(crate) mod encoder;
pub(crate) mod errors;
pub(crate) mod message;

pub use crate::{
    config::{SinkConfig, WaitStrategy},
    encoder::{Encoder, Mode},
    errors::{ErrorKind, IoError, PublishError},
    http::types::{HeaderSpan, Method, QueryParam},
    message::{CapturedMessage, MessageKind, Meta},
    sink::{
        file::FileTransport,
        http::HttpTransport,
        mock::MockTransport,
        sink_impl::{Outcome, Sink, SinkBuilder},
        tcp::{TcpSettings, TcpTransport},
        transport::Transport,
    },
};
