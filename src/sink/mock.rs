use crate::{errors::PublishError, sink::transport::Transport};
use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// In-memory [`Transport`] that answers from a queue of expectations.
///
/// Every published record is logged together with its destination. Each
/// publish consumes the oldest expectation; a record arriving when none is
/// left fails with [`PublishError::Unexpected`].
///
/// # Examples
/// ```
/// use wirecast::{MockTransport, PublishError, Transport};
///
/// # #[tokio::main]
/// # async fn main() {
/// let mock = MockTransport::new();
/// mock.expect_success().expect_failure(PublishError::Timeout);
///
/// assert_eq!(mock.publish(b"one", "topic").await, Ok(()));
/// assert_eq!(mock.publish(b"two", "topic").await, Err(PublishError::Timeout));
/// assert!(mock.publish(b"three", "topic").await.is_err());
///
/// assert_eq!(mock.received().len(), 3);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    expectations: Mutex<VecDeque<Result<(), PublishError>>>,
    received: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MockTransport {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful publish.
    #[inline]
    pub fn expect_success(&self) -> &Self {
        lock(&self.expectations).push_back(Ok(()));
        self
    }

    /// Queues a publish failing with `err`.
    #[inline]
    pub fn expect_failure(&self, err: PublishError) -> &Self {
        lock(&self.expectations).push_back(Err(err));
        self
    }

    /// Expectations not consumed yet.
    #[inline]
    pub fn remaining(&self) -> usize {
        lock(&self.expectations).len()
    }

    /// `(destination, record)` pairs in arrival order.
    #[inline]
    pub fn received(&self) -> Vec<(String, Vec<u8>)> {
        lock(&self.received).clone()
    }
}

impl Transport for MockTransport {
    async fn publish(&self, record: &[u8], destination: &str) -> Result<(), PublishError> {
        lock(&self.received).push((destination.to_owned(), record.to_vec()));

        lock(&self.expectations).pop_front().unwrap_or_else(|| {
            Err(PublishError::Unexpected(format!(
                "no expectation left for record sent to {:?}",
                destination
            )))
        })
    }
}

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
