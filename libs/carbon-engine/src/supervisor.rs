use std::future::Future;

use tokio::task::JoinSet;

use crate::consumer::{QueueConsumer, WorkerExit};

/// Shutdown signal received from outside the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl Signal {
    fn number(self) -> i32 {
        match self {
            Signal::Interrupt => 2,
            Signal::Terminate => 15,
        }
    }
}

/// How the supervisor finished.
#[derive(Debug)]
pub enum Outcome {
    /// External shutdown request.
    Interrupted(Signal),
    /// The first worker that stopped, for whatever reason.
    Terminated(WorkerExit),
}

impl Outcome {
    /// Process exit status for this outcome.
    ///
    /// A signal maps to `128 + signo`, the status a shell reports for a
    /// process killed by that signal, so `0` is never returned.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Interrupted(signal) => 128 + signal.number(),
            Outcome::Terminated(_) => 1,
        }
    }
}

/// Owns every queue worker and decides when the process must stop.
///
/// Workers never exit the process themselves: they return a [`WorkerExit`]
/// and the supervisor turns the first one into an [`Outcome`]. There is no
/// restart and no drain, the caller is expected to exit right away and let
/// the external process manager restart it.
#[derive(Default)]
pub struct Supervisor {
    workers: JoinSet<WorkerExit>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, consumer: QueueConsumer) {
        tracing::info!(queue = %consumer.queue(), "starting consumer");
        self.workers.spawn(consumer.run());
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Wait until a worker stops or `shutdown` resolves.
    ///
    /// Remaining workers are aborted when the supervisor is dropped.
    pub async fn run(mut self, shutdown: impl Future<Output = Signal>) -> Outcome {
        let outcome = tokio::select! {
            signal = shutdown => Outcome::Interrupted(signal),
            Some(joined) = self.workers.join_next() => match joined {
                Ok(exit) => Outcome::Terminated(exit),
                Err(e) => Outcome::Terminated(WorkerExit::Panicked { message: e.to_string() }),
            },
        };

        match &outcome {
            Outcome::Interrupted(signal) => tracing::info!(?signal, "shutdown requested"),
            Outcome::Terminated(exit @ WorkerExit::ThresholdExceeded { .. }) => {
                tracing::error!(reason = %exit, "error threshold exceeded, terminating")
            }
            Outcome::Terminated(exit) => {
                tracing::error!(reason = %exit, "worker stopped, terminating")
            }
        }
        outcome
    }
}
