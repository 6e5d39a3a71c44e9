//! Speed subscription delivery
//!
//! Updates are pushed to a [`SpeedListener`]. Whatever drives the stream
//! calls the listener, so implementations must be `Send + Sync` and do their
//! own synchronization.

use futures::stream::{BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::{BrokerError, BrokerResult};

/// Receives speed updates of one subscription
pub trait SpeedListener: Send + Sync {
    /// A new speed value arrived. May be called any number of times.
    fn on_update(&self, speed: f32);

    /// The subscription failed. Called at most once; no updates follow.
    fn on_error(&self, error: BrokerError);
}

/// [`SpeedListener`] built from two closures
pub struct SpeedCallbacks<U, E> {
    on_update: U,
    on_error: E,
}

impl<U, E> SpeedCallbacks<U, E>
where
    U: Fn(f32) + Send + Sync,
    E: Fn(BrokerError) + Send + Sync,
{
    pub fn new(on_update: U, on_error: E) -> Self {
        Self {
            on_update,
            on_error,
        }
    }
}

impl<U, E> SpeedListener for SpeedCallbacks<U, E>
where
    U: Fn(f32) + Send + Sync,
    E: Fn(BrokerError) + Send + Sync,
{
    fn on_update(&self, speed: f32) {
        (self.on_update)(speed)
    }

    fn on_error(&self, error: BrokerError) {
        (self.on_error)(error)
    }
}

/// How a subscription stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionEnd {
    /// The remote side closed the stream
    Completed,
    /// The caller or a disconnect cancelled it; the listener was not told
    Cancelled,
    /// The stream failed and `on_error` was called
    Failed,
}

/// Pump `stream` into `listener` until it ends, fails or is cancelled.
///
/// `extract` maps one response message to the speeds it carries.
/// Cancellation is checked before every item, so a cancelled subscription
/// never reports an error.
pub(crate) async fn drive<T, F, I>(
    mut stream: BoxStream<'static, BrokerResult<T>>,
    mut extract: F,
    listener: &dyn SpeedListener,
    cancel: &CancellationToken,
    connection: &CancellationToken,
) -> SubscriptionEnd
where
    F: FnMut(T) -> I,
    I: IntoIterator<Item = f32>,
{
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SubscriptionEnd::Cancelled,
            _ = connection.cancelled() => return SubscriptionEnd::Cancelled,
            item = stream.next() => item,
        };

        match item {
            Some(Ok(message)) => {
                for speed in extract(message) {
                    listener.on_update(speed);
                }
            }
            Some(Err(e)) => {
                listener.on_error(e);
                return SubscriptionEnd::Failed;
            }
            None => return SubscriptionEnd::Completed,
        }
    }
}
