pub mod bootstrap;
pub mod config;
pub mod consumer;
pub mod error;
pub mod stats;
pub mod supervisor;

#[cfg(test)]
mod testing;

pub use bootstrap::Bridge;
pub use consumer::{AckPolicy, ConsumerSettings, QueueConsumer, Step, WorkerExit};
pub use stats::{ErrorThreshold, StatsRegistry, StatsSnapshot};
pub use supervisor::{Outcome, Signal, Supervisor};
