use std::fmt;
use std::sync::Arc;

use carbon_api::{
    ClientError, InboundMessage, MessageSource, MetricRecord, MetricSink, TimestampPolicy,
};

use crate::stats::{ErrorThreshold, StatsRegistry};

/// Whether delivered messages are acknowledged to the broker.
///
/// `Enabled` removes each delivered message from its queue for good.
/// `Disabled` never acknowledges, so the broker requeues everything once the
/// channel closes: no loss on restart, at the cost of duplicate samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckPolicy {
    Enabled,
    Disabled,
}

impl From<bool> for AckPolicy {
    fn from(enabled: bool) -> Self {
        if enabled { AckPolicy::Enabled } else { AckPolicy::Disabled }
    }
}

/// Per-worker settings shared by every consumer of one process.
#[derive(Debug, Clone, Copy)]
pub struct ConsumerSettings {
    pub ack: AckPolicy,
    pub threshold: ErrorThreshold,
    pub timestamps: TimestampPolicy,
}

/// Why a queue worker stopped.
#[derive(Debug)]
pub enum WorkerExit {
    /// Global `errors` went past the threshold after one of this worker's deliveries.
    ThresholdExceeded { queue: String, errors: u64, threshold: u64 },
    /// The broker closed the subscription.
    SourceClosed { queue: String },
    /// The subscription failed.
    SourceFailed { queue: String, error: ClientError },
    /// The worker task panicked.
    Panicked { message: String },
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerExit::ThresholdExceeded { queue, errors, threshold } => write!(
                f,
                "queue '{queue}': {errors} delivery errors exceed threshold {threshold}"
            ),
            WorkerExit::SourceClosed { queue } => write!(f, "queue '{queue}': subscription closed"),
            WorkerExit::SourceFailed { queue, error } => {
                write!(f, "queue '{queue}': subscription failed: {error}")
            }
            WorkerExit::Panicked { message } => write!(f, "worker panicked: {message}"),
        }
    }
}

/// Result of handling one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Payload could not be parsed. Nothing was counted or acknowledged.
    Skipped,
    /// Sink accepted the record; carries the new `ok` count.
    Delivered { ok: u64 },
    /// Sink rejected the record; carries the new `errors` count.
    Failed { errors: u64 },
}

// ---------------------------------------------------------------------------
// Forwarder: parse → deliver → count → ack
// ---------------------------------------------------------------------------

struct Forwarder {
    queue: String,
    sink: Arc<dyn MetricSink>,
    stats: Arc<StatsRegistry>,
    settings: ConsumerSettings,
}

impl Forwarder {
    async fn process(&self, msg: &dyn InboundMessage) -> Step {
        let record = match MetricRecord::parse(msg.payload(), self.settings.timestamps) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(queue = %self.queue, error = %e, "skipping message");
                return Step::Skipped;
            }
        };

        if let Err(e) = self.sink.send(&record).await {
            let errors = self.stats.record_error();
            tracing::warn!(
                queue = %self.queue,
                metric = %record.name,
                errors,
                error = %e,
                "delivery failed"
            );
            return Step::Failed { errors };
        }

        let ok = self.stats.record_ok();
        if self.settings.ack == AckPolicy::Enabled {
            if let Err(e) = msg.ack().await {
                tracing::warn!(
                    queue = %self.queue,
                    metric = %record.name,
                    error = %e,
                    "ack failed"
                );
            }
        }
        Step::Delivered { ok }
    }
}

// ---------------------------------------------------------------------------
// QueueConsumer
// ---------------------------------------------------------------------------

/// Consumption loop for one queue.
///
/// Messages are handled strictly one at a time in delivery order. The loop
/// ends only when the subscription ends or the error threshold is breached;
/// deciding what to do about it is left to the [`Supervisor`](crate::Supervisor).
pub struct QueueConsumer {
    source: Box<dyn MessageSource>,
    forwarder: Forwarder,
}

impl QueueConsumer {
    pub fn new(
        queue: String,
        source: Box<dyn MessageSource>,
        sink: Arc<dyn MetricSink>,
        stats: Arc<StatsRegistry>,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            source,
            forwarder: Forwarder { queue, sink, stats, settings },
        }
    }

    pub fn queue(&self) -> &str {
        &self.forwarder.queue
    }

    /// Handle a single message.
    pub async fn process(&self, msg: &dyn InboundMessage) -> Step {
        self.forwarder.process(msg).await
    }

    /// Run until the subscription ends or the error threshold is breached.
    pub async fn run(mut self) -> WorkerExit {
        let queue = self.forwarder.queue.clone();
        let threshold = self.forwarder.settings.threshold;

        loop {
            let msg = match self.source.recv().await {
                Some(Ok(msg)) => msg,
                Some(Err(error)) => return WorkerExit::SourceFailed { queue, error },
                None => return WorkerExit::SourceClosed { queue },
            };

            if self.forwarder.process(msg.as_ref()).await == Step::Skipped {
                continue;
            }

            // Shared counter: failures on other queues count too.
            let errors = self.forwarder.stats.errors();
            if threshold.is_breached(errors) {
                return WorkerExit::ThresholdExceeded {
                    queue,
                    errors,
                    threshold: threshold.limit,
                };
            }
        }
    }
}
