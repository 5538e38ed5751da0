//! Sink configuration
//!
//! Everything a [`Sink`](crate::Sink) needs besides its transport is carried
//! by one explicit [`SinkConfig`] value handed to the builder; nothing is read
//! from the environment or from globals.
//!
//! # Examples
//!
//! ```no_run
//! use wirecast::{Mode, MockTransport, Sink, SinkConfig, WaitStrategy};
//!
//! #[tokio::main]
//! async fn main() {
//!     let sink = Sink::builder(MockTransport::new())
//!         .config(SinkConfig {
//!             destination: "captured-traffic".into(),
//!             mode: Mode::Structured,
//!             workers: 4,
//!             wait_strategy: WaitStrategy::Yield,
//!             ..SinkConfig::default()
//!         })
//!         .build();
//!
//!     sink.close().await;
//! }
//! ```

use crate::encoder::Mode;
use std::time::Duration;

/// Destination, record layout and worker pool of a sink.
///
/// # Record flow
/// ```text
/// [-------]  encode  /------------------\   No   [------------------]
/// [ write ] =======> | Is queue full?   | =====> [ Push to queue    ]
/// [-------]          \------------------/        [------------------]
///                            ||                          ||
///                            || Yes                      \/
///                            \/                  [------------------]
///                    [------------------]        [ Worker: publish  ]
///                    [ QueueFull outcome ]       [------------------]
///                    [------------------]                ||
///                                                        \/
///                                                [------------------]
///                                                [ Outcome channel  ]
///                                                [------------------]
/// ```
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Topic, queue, file path or request path, depending on the transport
    /// (default: empty).
    pub destination: String,

    /// Layout of every record produced by [`Sink::write`](crate::Sink::write)
    /// (default: [`Mode::Raw`]).
    pub mode: Mode,

    /// Number of worker tasks publishing records concurrently (default: `1`).
    ///
    /// With more than one worker, records may reach the transport out of
    /// order.
    pub workers: usize,

    /// Maximum number of records waiting in the queue (default: `1024`).
    ///
    /// A record arriving at a full queue is not enqueued; a
    /// [`QueueFull`](crate::PublishError::QueueFull) outcome is reported for
    /// it instead.
    pub max_pending: usize,

    /// How idle workers wait for records (default: `Sleep(50μs)`).
    pub wait_strategy: WaitStrategy,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            destination: String::new(),
            mode: Mode::Raw,
            workers: 1,
            max_pending: 1024,
            wait_strategy: WaitStrategy::Sleep(Duration::from_micros(50)),

            _priv: (),
        }
    }
}

/// Strategy for worker tasks waiting on an empty queue
#[derive(Debug, Clone)]
pub enum WaitStrategy {
    /// While waiting, uses [`tokio::task::yield_now()`]
    ///
    /// Lowest latency, at the cost of keeping a core busy.
    Yield,

    /// While waiting, uses [`tokio::time::sleep()`]
    Sleep(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SinkConfig::default();

        assert_eq!(config.destination, "");
        assert_eq!(config.mode, Mode::Raw);
        assert_eq!(config.workers, 1);
        assert_eq!(config.max_pending, 1024);
        assert!(matches!(config.wait_strategy, WaitStrategy::Sleep(d) if d == Duration::from_micros(50)));
    }
}
