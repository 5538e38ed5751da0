use crate::{
    config::{SinkConfig, WaitStrategy},
    encoder::Encoder,
    errors::{ErrorKind, PublishError},
    message::CapturedMessage,
    sink::transport::Transport,
};
use crossbeam::queue::SegQueue;
use log::{debug, error, info, warn};
use std::{
    mem,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, OnceLock, PoisonError,
    },
};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::{yield_now, JoinHandle},
    time::sleep as tokio_sleep,
};

/// Final result of one record handed to a [`Sink`].
#[derive(Debug, PartialEq)]
pub struct Outcome {
    /// Ticket returned by [`Sink::write`] or [`Sink::publish`].
    pub ticket: u64,
    pub destination: Arc<str>,
    pub record: Vec<u8>,
    pub result: Result<(), PublishError>,
}

/// Output sink: encodes captured messages and publishes them through a
/// [`Transport`] without blocking the caller.
///
/// Records go through a lock-free queue to a fixed pool of worker tasks
/// created once by [`SinkBuilder::build`]. Once [`outcomes`](Self::outcomes)
/// has been taken, every record accepted by [`write`](Self::write) or
/// [`publish`](Self::publish) yields exactly one [`Outcome`] on it.
///
/// Dropping the sink without [`close`](Self::close) stops the workers too,
/// after they have drained the queue.
///
/// # Examples
///
/// ```
/// use wirecast::{CapturedMessage, MockTransport, Sink, SinkConfig};
///
/// # #[tokio::main]
/// # async fn main() {
/// let transport = MockTransport::new();
/// transport.expect_success();
///
/// let mut sink = Sink::builder(transport)
///     .config(SinkConfig {
///         destination: "test".into(),
///         ..SinkConfig::default()
///     })
///     .build();
/// let mut outcomes = sink.outcomes().unwrap();
///
/// let msg = CapturedMessage::new("1 2 3\n", "GET / HTTP1.1\r\nHeader: 1\r\n\r\n");
/// sink.write(&msg).unwrap();
///
/// let outcome = outcomes.recv().await.unwrap();
/// assert_eq!(outcome.result, Ok(()));
/// assert_eq!(outcome.record, b"1 2 3\nGET / HTTP1.1\r\nHeader: 1\r\n\r\n");
///
/// sink.close().await;
/// # }
/// ```
pub struct Sink<T: Transport> {
    shared: Arc<Shared>,
    transport: Arc<T>,
    encoder: Encoder,
    destination: Arc<str>,
    config: SinkConfig,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

struct Shared {
    queue: SegQueue<Job>,
    /// Accepted records without an outcome yet, counted before `closed` is
    /// read so that `close` never misses one.
    pending: AtomicUsize,
    next_ticket: AtomicU64,
    closed: AtomicBool,
    /// Set by the first `Sink::outcomes` call; outcomes are discarded before.
    outcomes: OnceLock<UnboundedSender<Outcome>>,
}

struct Job {
    ticket: u64,
    destination: Arc<str>,
    record: Vec<u8>,
}

impl<T: Transport> Sink<T> {
    /// Creates a builder around the transport every record is published
    /// through.
    #[inline]
    pub fn builder(transport: T) -> SinkBuilder<T> {
        SinkBuilder {
            transport,
            config: None,
        }
    }

    /// Encodes `msg` and queues it for the configured destination.
    ///
    /// Returns the ticket of the record as soon as it is queued. A message
    /// that cannot be encoded is logged and dropped: the error is returned
    /// and no outcome is produced for it.
    #[inline]
    pub fn write(&self, msg: &CapturedMessage) -> Result<u64, ErrorKind> {
        match self.encoder.encode(msg) {
            Ok(record) => Ok(self.enqueue(record, self.destination.clone())),
            Err(err) => {
                warn!("dropping malformed message: {}", err);
                Err(err)
            }
        }
    }

    /// Queues an already encoded record for `destination`.
    #[inline]
    pub fn publish(&self, record: impl Into<Vec<u8>>, destination: &str) -> u64 {
        self.enqueue(record.into(), Arc::from(destination))
    }

    #[inline]
    fn enqueue(&self, record: Vec<u8>, destination: Arc<str>) -> u64 {
        let shared = &self.shared;
        let ticket = shared.next_ticket.fetch_add(1, Ordering::Relaxed);

        shared.pending.fetch_add(1, Ordering::SeqCst);

        let rejection = if shared.closed.load(Ordering::SeqCst) {
            Some(PublishError::Closed)
        } else if shared.queue.len() >= self.config.max_pending {
            Some(PublishError::QueueFull)
        } else {
            None
        };

        match rejection {
            Some(err) => {
                warn!("record {} for {:?} not queued: {}", ticket, destination, err);
                shared.send(Outcome {
                    ticket,
                    destination,
                    record,
                    result: Err(err),
                });
                shared.pending.fetch_sub(1, Ordering::SeqCst);
            }
            None => shared.queue.push(Job {
                ticket,
                destination,
                record,
            }),
        }

        ticket
    }

    /// Opens the outcome channel and returns its receiving end.
    ///
    /// Only the first call returns `Some`. Outcomes of records finished
    /// before that call are discarded; after it they are buffered until
    /// read.
    #[inline]
    pub fn outcomes(&mut self) -> Option<UnboundedReceiver<Outcome>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.shared.outcomes.set(sender).ok()?;
        Some(receiver)
    }

    /// Records queued or being published.
    #[inline]
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    #[inline(always)]
    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    #[inline(always)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Waits until every queued record has its outcome.
    #[inline]
    pub async fn flush(&self) {
        while self.pending() != 0 {
            wait(&self.config.wait_strategy).await;
        }
    }

    /// Stops accepting records, flushes, then stops the workers.
    ///
    /// Records written after this point fail with
    /// [`PublishError::Closed`].
    pub async fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.flush().await;

        let workers = mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for worker in workers {
            let _ = worker.await;
        }

        info!("sink for {:?} closed", self.destination);
    }

    #[inline]
    fn spawn_worker(
        shared: &Arc<Shared>,
        transport: &Arc<T>,
        wait_strategy: &WaitStrategy,
    ) -> JoinHandle<()> {
        let shared = shared.clone();
        let transport = transport.clone();
        let wait_strategy = wait_strategy.clone();

        tokio::spawn(async move {
            while let Some(job) = Shared::next_job(&shared, &wait_strategy).await {
                let result = transport.publish(&job.record, &job.destination).await;

                match &result {
                    Ok(()) => debug!("record {} published to {:?}", job.ticket, job.destination),
                    Err(err) => error!(
                        "record {} for {:?} failed: {}",
                        job.ticket, job.destination, err
                    ),
                }

                shared.send(Outcome {
                    ticket: job.ticket,
                    destination: job.destination,
                    record: job.record,
                    result,
                });
                shared.pending.fetch_sub(1, Ordering::SeqCst);
            }
        })
    }
}

impl<T: Transport> Drop for Sink<T> {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
    }
}

impl Shared {
    /// `None` once the sink is closed and no accepted record is left.
    #[inline]
    async fn next_job(&self, wait_strategy: &WaitStrategy) -> Option<Job> {
        loop {
            if let Some(job) = self.queue.pop() {
                return Some(job);
            }
            // a writer may have counted a record it has not pushed yet
            if self.closed.load(Ordering::SeqCst) && self.pending.load(Ordering::SeqCst) == 0 {
                return None;
            }

            wait(wait_strategy).await;
        }
    }

    #[inline]
    fn send(&self, outcome: Outcome) {
        if let Some(sender) = self.outcomes.get() {
            let _ = sender.send(outcome);
        }
    }
}

#[inline]
async fn wait(wait_strategy: &WaitStrategy) {
    match wait_strategy {
        WaitStrategy::Yield => yield_now().await,
        WaitStrategy::Sleep(time) => tokio_sleep(*time).await,
    }
}

//

/// Builder for configuring and creating [`Sink`] instances.
pub struct SinkBuilder<T: Transport> {
    transport: T,
    config: Option<SinkConfig>,
}

impl<T: Transport> SinkBuilder<T> {
    /// Sets the destination, mode and worker pool.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # #[tokio::main]
    /// # async fn main() {
    /// use wirecast::{FileTransport, Mode, Sink, SinkConfig};
    ///
    /// let sink = Sink::builder(FileTransport::new())
    ///     .config(SinkConfig {
    ///         // Your changes
    ///         destination: "/var/log/requests.gor".into(),
    ///         mode: Mode::Raw,
    ///         ..SinkConfig::default() // Required line
    ///     })
    ///     .build();
    /// # }
    /// ```
    #[inline(always)]
    pub fn config(mut self, config: SinkConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Spawns the workers and returns the sink.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[inline]
    #[track_caller]
    pub fn build(self) -> Sink<T> {
        let config = self.config.unwrap_or_default();
        let transport = Arc::new(self.transport);

        let shared = Arc::new(Shared {
            queue: SegQueue::new(),
            pending: AtomicUsize::new(0),
            next_ticket: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            outcomes: OnceLock::new(),
        });

        let workers = (0..config.workers.max(1))
            .map(|_| Sink::spawn_worker(&shared, &transport, &config.wait_strategy))
            .collect();

        info!(
            "sink for {:?} started: {} workers, {:?} mode",
            config.destination,
            config.workers.max(1),
            config.mode
        );

        Sink {
            shared,
            transport,
            encoder: Encoder::new(config.mode),
            destination: Arc::from(config.destination.as_str()),
            config,
            workers: Mutex::new(workers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encoder::Mode, sink::mock::MockTransport};
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;

    /// Accepts everything; the marker counts the transport's owners.
    struct Accept {
        marker: Arc<()>,
    }

    impl Transport for Accept {
        async fn publish(&self, _: &[u8], _: &str) -> Result<(), PublishError> {
            Ok(())
        }
    }

    fn accepting(marker: &Arc<()>, workers: usize) -> Sink<Accept> {
        Sink::builder(Accept {
            marker: marker.clone(),
        })
        .config(SinkConfig {
            workers,
            wait_strategy: WaitStrategy::Sleep(Duration::from_micros(10)),
            ..SinkConfig::default()
        })
        .build()
    }

    fn sink(transport: MockTransport, mode: Mode, workers: usize) -> Sink<MockTransport> {
        Sink::builder(transport)
            .config(SinkConfig {
                destination: "test".into(),
                mode,
                workers,
                wait_strategy: WaitStrategy::Sleep(Duration::from_micros(10)),
                ..SinkConfig::default()
            })
            .build()
    }

    #[tokio::test]
    async fn raw_record() {
        let transport = MockTransport::new();
        transport.expect_success();

        let mut sink = sink(transport, Mode::Raw, 1);
        let mut outcomes = sink.outcomes().unwrap();

        let msg = CapturedMessage::new("1 2 3\n", "GET / HTTP1.1\r\nHeader: 1\r\n\r\n");
        let ticket = sink.write(&msg).unwrap();

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.ticket, ticket);
        assert_eq!(&*outcome.destination, "test");
        assert_eq!(outcome.result, Ok(()));
        assert_eq!(outcome.record, b"1 2 3\nGET / HTTP1.1\r\nHeader: 1\r\n\r\n");

        sink.close().await;
    }

    #[tokio::test]
    async fn structured_records() {
        let transport = MockTransport::new();
        transport.expect_success().expect_success();

        let mut sink = sink(transport, Mode::Structured, 1);
        let mut outcomes = sink.outcomes().unwrap();

        sink.write(&CapturedMessage::new("2 2 3\n", "HTTP/1.1 200 OK\r\n")).unwrap();
        sink.write(&CapturedMessage::new("2 3 4\n", "HTTP/1.1 404\r\n")).unwrap();
        sink.flush().await;

        #[rustfmt::skip]
        let expected = [
            r#"{"Req_URL":"200","Req_Type":"2","Req_ID":"2","Req_Ts":"3","Req_Method":"HTTP/1.1"}"#,
            r#"{"Req_URL":"404","Req_Type":"2","Req_ID":"3","Req_Ts":"4","Req_Method":"HTTP/1.1"}"#,
        ];

        for record in expected {
            let outcome = outcomes.recv().await.unwrap();
            assert_eq!(outcome.result, Ok(()));
            assert_eq!(outcome.record, record.as_bytes());
        }
        assert_eq!(sink.transport().received().len(), 2);

        sink.close().await;
    }

    #[tokio::test]
    async fn malformed_dropped() {
        let transport = MockTransport::new();
        transport.expect_success();

        let mut sink = sink(transport, Mode::Structured, 1);
        let mut outcomes = sink.outcomes().unwrap();

        assert_eq!(
            sink.write(&CapturedMessage::new("1 2\n", "GET / HTTP/1.1\r\n\r\n")),
            Err(ErrorKind::InvalidMeta { tokens: 2 })
        );
        assert_eq!(
            sink.write(&CapturedMessage::new("1 2 3\n", "GET / HTTP/1.1")),
            Err(ErrorKind::MissingLineTerminator)
        );

        // the pipeline keeps going
        sink.write(&CapturedMessage::new("1 2 3\n", "GET /ok HTTP/1.1\r\n\r\n")).unwrap();

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.result, Ok(()));
        assert_eq!(sink.transport().received().len(), 1);

        sink.close().await;
    }

    #[tokio::test]
    async fn transport_failure() {
        let transport = MockTransport::new();
        transport
            .expect_failure(PublishError::Rejected(500))
            .expect_success();

        let mut sink = sink(transport, Mode::Raw, 1);
        let mut outcomes = sink.outcomes().unwrap();

        let first = sink.publish("a", "topic-a");
        let second = sink.publish("b", "topic-b");
        sink.flush().await;

        let failed = outcomes.recv().await.unwrap();
        assert_eq!((failed.ticket, failed.result), (first, Err(PublishError::Rejected(500))));

        let ok = outcomes.recv().await.unwrap();
        assert_eq!((ok.ticket, ok.result), (second, Ok(())));

        #[rustfmt::skip]
        assert_eq!(sink.transport().received(), vec![
            ("topic-a".to_owned(), b"a".to_vec()),
            ("topic-b".to_owned(), b"b".to_vec()),
        ]);

        sink.close().await;
    }

    #[tokio::test]
    async fn queue_full() {
        let transport = MockTransport::new();
        for _ in 0..16 {
            transport.expect_success();
        }

        let mut sink = Sink::builder(transport)
            .config(SinkConfig {
                max_pending: 2,
                wait_strategy: WaitStrategy::Sleep(Duration::from_millis(200)),
                ..SinkConfig::default()
            })
            .build();
        let mut outcomes = sink.outcomes().unwrap();

        // give the worker time to park in its sleep
        tokio::time::sleep(Duration::from_millis(20)).await;

        let tickets: Vec<u64> = (0..3).map(|_| sink.publish("x", "t")).collect();

        let rejected = outcomes.recv().await.unwrap();
        assert_eq!(rejected.ticket, tickets[2]);
        assert_eq!(rejected.result, Err(PublishError::QueueFull));

        sink.flush().await;
        assert_eq!(sink.pending(), 0);
        assert_eq!(sink.transport().received().len(), 2);

        sink.close().await;
    }

    #[tokio::test]
    async fn many_workers() {
        let transport = MockTransport::new();
        for _ in 0..100 {
            transport.expect_success();
        }

        let mut sink = sink(transport, Mode::Raw, 4);
        let mut outcomes = sink.outcomes().unwrap();

        for i in 0..100 {
            sink.publish(format!("record {i}"), "t");
        }
        sink.flush().await;

        let mut tickets = Vec::new();
        for _ in 0..100 {
            let outcome = outcomes.recv().await.unwrap();
            assert_eq!(outcome.result, Ok(()));
            tickets.push(outcome.ticket);
        }
        tickets.sort_unstable();

        assert_eq!(tickets, (0..100).collect::<Vec<u64>>());
        assert_eq!(sink.transport().remaining(), 0);

        sink.close().await;
    }

    #[tokio::test]
    async fn closed() {
        let mut sink = sink(MockTransport::new(), Mode::Raw, 2);
        let mut outcomes = sink.outcomes().unwrap();
        assert!(sink.outcomes().is_none());

        sink.close().await;
        let ticket = sink.publish("late", "t");

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!((outcome.ticket, outcome.result), (ticket, Err(PublishError::Closed)));
        assert!(sink.transport().received().is_empty());
    }

    #[tokio::test]
    async fn drop_stops_workers() {
        let marker = Arc::new(());

        let sink = accepting(&marker, 4);
        for _ in 0..10 {
            sink.publish("x", "t");
        }
        assert_eq!(sink.transport().marker.as_ref(), &());
        drop(sink);

        for _ in 0..100 {
            if Arc::strong_count(&marker) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[tokio::test]
    async fn outcomes_discarded_until_taken() {
        let marker = Arc::new(());
        let mut sink = accepting(&marker, 2);

        for _ in 0..1000 {
            sink.publish(vec![0u8; 1024], "t");
        }
        sink.flush().await;

        let mut outcomes = sink.outcomes().unwrap();
        assert_eq!(outcomes.try_recv(), Err(TryRecvError::Empty));

        let ticket = sink.publish("after", "t");
        let outcome = outcomes.recv().await.unwrap();
        assert_eq!((outcome.ticket, outcome.result), (ticket, Ok(())));

        sink.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_write_and_close() {
        for round in 0..20 {
            let marker = Arc::new(());
            let mut sink = accepting(&marker, 2);
            let mut outcomes = sink.outcomes().unwrap();
            let sink = Arc::new(sink);

            let writers: Vec<_> = (0..4)
                .map(|_| {
                    let sink = sink.clone();
                    tokio::spawn(async move {
                        let mut tickets = Vec::new();
                        for _ in 0..200 {
                            tickets.push(sink.publish("x", "t"));
                            tokio::task::yield_now().await;
                        }
                        tickets
                    })
                })
                .collect();

            tokio::time::sleep(Duration::from_micros(100 * round)).await;
            sink.close().await;

            let mut tickets = Vec::new();
            for writer in writers {
                tickets.extend(writer.await.unwrap());
            }

            let mut seen = Vec::new();
            for _ in 0..tickets.len() {
                let outcome = tokio::time::timeout(Duration::from_secs(5), outcomes.recv())
                    .await
                    .unwrap()
                    .unwrap();
                assert!(matches!(outcome.result, Ok(()) | Err(PublishError::Closed)));
                seen.push(outcome.ticket);
            }

            tickets.sort_unstable();
            seen.sort_unstable();
            assert_eq!(seen, tickets, "round {round}");
            assert_eq!(sink.pending(), 0);
        }
    }
}
