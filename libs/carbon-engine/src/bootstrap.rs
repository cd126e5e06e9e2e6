use std::future::Future;
use std::sync::Arc;

use carbon_api::{MetricSink, QueueSubscriber};

use crate::config::RuntimeConfig;
use crate::consumer::{ConsumerSettings, QueueConsumer};
use crate::error::EngineError;
use crate::stats::{ErrorThreshold, StatsRegistry};
use crate::supervisor::{Outcome, Signal, Supervisor};

/// The running bridge: one consumer per configured queue under a supervisor.
pub struct Bridge {
    supervisor: Supervisor,
    stats: Arc<StatsRegistry>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("workers", &self.supervisor.len())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl Bridge {
    /// Subscribe to every configured queue, then spawn one consumer per queue.
    ///
    /// All subscriptions are opened before any consumer starts, so a queue
    /// that cannot be bound fails startup without anything having been
    /// consumed.
    pub async fn bootstrap(
        config: &RuntimeConfig,
        subscriber: &dyn QueueSubscriber,
        sink: Arc<dyn MetricSink>,
        stats: Arc<StatsRegistry>,
    ) -> Result<Self, EngineError> {
        if config.queues.is_empty() {
            return Err(EngineError::NoQueues);
        }

        // --- 1. Subscribe ---
        let mut sources = Vec::with_capacity(config.queues.len());
        for queue in &config.queues {
            let source = subscriber
                .subscribe(queue, &config.consumer_tag)
                .await
                .map_err(|e| EngineError::from(e).with_context(format!("queue '{queue}'")))?;
            tracing::info!(queue = %queue, "bound to queue");
            sources.push((queue.clone(), source));
        }

        // --- 2. Spawn consumers ---
        let settings = ConsumerSettings {
            ack: config.ack,
            threshold: ErrorThreshold::new(config.threshold),
            timestamps: config.timestamp_policy,
        };
        let mut supervisor = Supervisor::new();
        for (queue, source) in sources {
            supervisor.spawn(QueueConsumer::new(
                queue,
                source,
                sink.clone(),
                stats.clone(),
                settings,
            ));
        }

        tracing::info!(
            queues = supervisor.len(),
            ack = ?config.ack,
            threshold = config.threshold,
            "bridge started"
        );

        Ok(Bridge { supervisor, stats })
    }

    pub fn stats(&self) -> &Arc<StatsRegistry> {
        &self.stats
    }

    /// Run until a worker stops or `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = Signal>) -> Outcome {
        self.supervisor.run(shutdown).await
    }
}
