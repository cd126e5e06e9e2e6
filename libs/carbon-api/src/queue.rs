use std::future::Future;
use std::pin::Pin;

use crate::error::ClientError;

/// One message received from a queue subscription.
///
/// Owned by the queue client; the consumer drops it after one iteration.
pub trait InboundMessage: Send + Sync {
    /// Raw message body.
    fn payload(&self) -> &[u8];

    /// Tell the broker the message was processed, removing it from the queue.
    fn ack(&self) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>>;
}

/// Result of waiting on a [`MessageSource`].
pub type Delivery = Option<Result<Box<dyn InboundMessage>, ClientError>>;

/// Ordered stream of messages from a single queue.
pub trait MessageSource: Send {
    /// Wait for the next message.
    ///
    /// - `Some(Ok(msg))` — next message in delivery order.
    /// - `Some(Err(e))` — the subscription failed and will not recover.
    /// - `None` — the subscription was closed.
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Delivery> + Send + '_>>;
}

/// Opens subscriptions on the broker.
pub trait QueueSubscriber: Send + Sync {
    fn subscribe(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn MessageSource>, ClientError>> + Send + '_>>;
}
