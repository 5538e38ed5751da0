use crate::{errors::PublishError, sink::transport::Transport};
use socket2::{SockRef, TcpKeepalive};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};
use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    sync::Mutex,
    time::timeout,
};

/// Socket settings of a [`TcpTransport`].
#[derive(Debug, Clone)]
pub struct TcpSettings {
    /// Maximum time to establish a connection (default: `2 seconds`).
    pub connect_timeout: Duration,

    /// Maximum time for writing one record (default: `3 seconds`).
    ///
    /// The connection is dropped when it expires and the record fails with
    /// [`PublishError::Timeout`].
    pub write_timeout: Duration,

    /// Idle time before TCP keep-alive probes start (default: `60 seconds`).
    pub keepalive: Duration,

    /// Written after every record (default:
    /// [`PAYLOAD_SEPARATOR`](crate::sink::file::PAYLOAD_SEPARATOR)).
    pub separator: Vec<u8>,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for TcpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            write_timeout: Duration::from_secs(3),
            keepalive: Duration::from_secs(60),
            separator: crate::sink::file::PAYLOAD_SEPARATOR.to_vec(),

            _priv: (),
        }
    }
}

/// [`Transport`] streaming records over TCP; the destination is `host:port`.
///
/// One connection per destination is opened lazily and reused. A failed
/// write closes it, the next record reconnects. Destinations are locked
/// separately, so a slow peer only holds back its own records.
#[derive(Debug, Default)]
pub struct TcpTransport {
    settings: TcpSettings,
    streams: StdMutex<HashMap<String, Slot>>,
}

type Slot = Arc<Mutex<Option<TcpStream>>>;

impl TcpTransport {
    #[inline]
    pub fn new(settings: TcpSettings) -> Self {
        TcpTransport {
            settings,
            streams: StdMutex::new(HashMap::new()),
        }
    }

    /// Connection slot of `destination`; the map lock is never held across I/O.
    #[inline]
    fn slot(&self, destination: &str) -> Slot {
        self.streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(destination.to_owned())
            .or_default()
            .clone()
    }

    #[inline]
    async fn connect(&self, destination: &str) -> Result<TcpStream, PublishError> {
        let stream = timeout(
            self.settings.connect_timeout,
            TcpStream::connect(destination),
        )
        .await??;

        stream.set_nodelay(true)?;
        SockRef::from(&stream)
            .set_tcp_keepalive(&TcpKeepalive::new().with_time(self.settings.keepalive))?;

        Ok(stream)
    }

    #[inline]
    async fn send(&self, stream: &mut TcpStream, record: &[u8]) -> Result<(), PublishError> {
        let mut frame = Vec::with_capacity(record.len() + self.settings.separator.len());
        frame.extend_from_slice(record);
        frame.extend_from_slice(&self.settings.separator);

        timeout(self.settings.write_timeout, stream.write_all(&frame)).await??;
        Ok(())
    }
}

impl Transport for TcpTransport {
    async fn publish(&self, record: &[u8], destination: &str) -> Result<(), PublishError> {
        let slot = self.slot(destination);
        let mut cached = slot.lock().await;

        let mut stream = match cached.take() {
            Some(stream) => stream,
            None => self.connect(destination).await?,
        };

        // a failed stream is dropped here
        let result = self.send(&mut stream, record).await;
        if result.is_ok() {
            *cached = Some(stream);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::file::PAYLOAD_SEPARATOR;
    use tokio::{io::AsyncReadExt, net::TcpListener};

    #[tokio::test]
    async fn frames_records() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let destination = listener.local_addr().unwrap().to_string();

        let transport = TcpTransport::default();
        transport.publish(b"first", &destination).await.unwrap();
        transport.publish(b"second", &destination).await.unwrap();
        drop(transport);

        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();

        let mut expected = b"first".to_vec();
        expected.extend_from_slice(PAYLOAD_SEPARATOR);
        expected.extend_from_slice(b"second");
        expected.extend_from_slice(PAYLOAD_SEPARATOR);

        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn one_connection_per_destination() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let destination = listener.local_addr().unwrap().to_string();

        let transport = TcpTransport::new(TcpSettings {
            separator: b"\n".to_vec(),
            ..TcpSettings::default()
        });
        for _ in 0..3 {
            transport.publish(b"x", &destination).await.unwrap();
        }

        assert_eq!(transport.streams.lock().unwrap().len(), 1);
        drop(transport);

        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"x\nx\nx\n");
    }

    #[tokio::test]
    async fn connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let destination = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = TcpTransport::default().publish(b"x", &destination).await;
        assert!(matches!(result, Err(PublishError::Io(_))));
    }

    #[tokio::test]
    async fn busy_destination_does_not_block_others() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let free = listener.local_addr().unwrap().to_string();

        let transport = TcpTransport::default();
        let busy = transport.slot("127.0.0.1:9");
        let _held = busy.lock().await;

        let result = timeout(Duration::from_secs(2), transport.publish(b"x", &free)).await;
        assert_eq!(result.ok(), Some(Ok(())));
    }
}
