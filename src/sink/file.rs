use crate::{errors::PublishError, sink::transport::Transport};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};

/// Separator written after every record, so that a reader can split a file
/// back into payloads.
pub const PAYLOAD_SEPARATOR: &[u8] = "\n🐵🙈🙉\n".as_bytes();

/// [`Transport`] appending records to files; the destination is the path.
///
/// One handle per path stays open for the life of the transport. Every
/// record is followed by the separator and flushed before `publish` returns.
/// Paths are locked separately.
#[derive(Debug)]
pub struct FileTransport {
    separator: Vec<u8>,
    files: StdMutex<HashMap<String, Slot>>,
}

type Slot = Arc<Mutex<Option<File>>>;

impl Default for FileTransport {
    fn default() -> Self {
        Self::with_separator(PAYLOAD_SEPARATOR)
    }
}

impl FileTransport {
    /// Uses [`PAYLOAD_SEPARATOR`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_separator(separator: impl Into<Vec<u8>>) -> Self {
        FileTransport {
            separator: separator.into(),
            files: StdMutex::new(HashMap::new()),
        }
    }

    #[inline]
    fn slot(&self, destination: &str) -> Slot {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(destination.to_owned())
            .or_default()
            .clone()
    }
}

impl Transport for FileTransport {
    async fn publish(&self, record: &[u8], destination: &str) -> Result<(), PublishError> {
        let slot = self.slot(destination);
        let mut cached = slot.lock().await;

        let mut file = match cached.take() {
            Some(file) => file,
            None => {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(destination)
                    .await?
            }
        };

        let mut frame = Vec::with_capacity(record.len() + self.separator.len());
        frame.extend_from_slice(record);
        frame.extend_from_slice(&self.separator);

        file.write_all(&frame).await?;
        file.flush().await?;

        *cached = Some(file);
        Ok(())
    }
}
