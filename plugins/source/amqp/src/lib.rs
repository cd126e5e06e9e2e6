use std::future::Future;
use std::pin::Pin;

use futures::StreamExt;
use lapin::acker::Acker;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, Consumer};

use carbon_api::{ClientError, Delivery, InboundMessage, MessageSource, QueueSubscriber};

/// AMQP 0-9-1 broker connection. Each subscription gets its own channel.
pub struct AmqpSubscriber {
    connection: Connection,
    prefetch: u16,
}

impl AmqpSubscriber {
    /// Connect to the broker. `prefetch` of `0` leaves QoS unlimited.
    pub async fn connect(uri: &str, prefetch: u16) -> Result<Self, ClientError> {
        let connection = Connection::connect(uri, ConnectionProperties::default())
            .await
            .map_err(|e| ClientError::connect(format!("could not connect to rabbit: {e}")))?;
        tracing::info!(prefetch, "connected to rabbit");
        Ok(Self { connection, prefetch })
    }

    async fn open(&self, queue: &str, consumer_tag: &str) -> Result<AmqpSource, ClientError> {
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(|e| ClientError::protocol(format!("could not open channel: {e}")))?;

        if self.prefetch > 0 {
            channel
                .basic_qos(self.prefetch, BasicQosOptions::default())
                .await
                .map_err(|e| ClientError::protocol(format!("could not set prefetch: {e}")))?;
        }

        // Manual acknowledgment: unacked messages return to the queue when the channel closes.
        let consumer = channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| ClientError::protocol(format!("could not subscribe to queue: {e}")))?;

        Ok(AmqpSource {
            consumer,
            _channel: channel,
        })
    }
}

impl QueueSubscriber for AmqpSubscriber {
    fn subscribe(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn MessageSource>, ClientError>> + Send + '_>> {
        let queue = queue.to_owned();
        let consumer_tag = consumer_tag.to_owned();
        Box::pin(async move {
            let source = self.open(&queue, &consumer_tag).await?;
            Ok(Box::new(source) as Box<dyn MessageSource>)
        })
    }
}

// ---- Subscription ----

pub struct AmqpSource {
    consumer: Consumer,
    _channel: Channel,
}

impl MessageSource for AmqpSource {
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Delivery> + Send + '_>> {
        Box::pin(async move {
            match self.consumer.next().await? {
                Ok(delivery) => Some(Ok(Box::new(AmqpMessage {
                    payload: delivery.data,
                    acker: delivery.acker,
                }) as Box<dyn InboundMessage>)),
                Err(e) => Some(Err(ClientError::protocol(format!("consume: {e}")))),
            }
        })
    }
}

pub struct AmqpMessage {
    payload: Vec<u8>,
    acker: Acker,
}

impl InboundMessage for AmqpMessage {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn ack(&self) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        let acker = self.acker.clone();
        Box::pin(async move {
            acker
                .ack(BasicAckOptions::default())
                .await
                .map(|_| ())
                .map_err(|e| ClientError::protocol(format!("ack: {e}")))
        })
    }
}
