use crate::errors::PublishError;
use std::future::Future;

/// The capability a [`Sink`](crate::Sink) publishes through.
///
/// One call hands over one finished record. Implementations own every
/// transport concern (connections, framing, timeouts) but never retry: a
/// failure is returned as is and reaches the caller as a failed
/// [`Outcome`](crate::Outcome).
///
/// # Examples
///
/// ```
/// use wirecast::{PublishError, Transport};
///
/// struct Discard;
///
/// impl Transport for Discard {
///     async fn publish(&self, record: &[u8], _: &str) -> Result<(), PublishError> {
///         match record.is_empty() {
///             true => Err(PublishError::Unexpected("empty record".into())),
///             false => Ok(()),
///         }
///     }
/// }
/// ```
pub trait Transport
where
    Self: Sync + Send + 'static,
{
    /// Publishes `record` to `destination` (topic, queue, path...).
    fn publish(
        &self,
        record: &[u8],
        destination: &str,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}
