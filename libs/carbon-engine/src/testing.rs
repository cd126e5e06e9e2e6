//! In-memory queue and sink doubles for engine tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use carbon_api::{
    ClientError, Delivery, InboundMessage, MessageSource, MetricRecord, MetricSink, QueueSubscriber,
};

// ---------------------------------------------------------------------------
// Queue side
// ---------------------------------------------------------------------------

pub struct MemoryMessage {
    payload: Vec<u8>,
    acks: Arc<AtomicUsize>,
    fail_ack: bool,
}

impl InboundMessage for MemoryMessage {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn ack(&self) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>> {
        Box::pin(async move {
            if self.fail_ack {
                return Err(ClientError::io("channel closed"));
            }
            self.acks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

/// Yields a fixed list of payloads, then either closes or waits forever.
pub struct MemorySource {
    pending: VecDeque<Vec<u8>>,
    acks: Arc<AtomicUsize>,
    fail_ack: bool,
    close_when_drained: bool,
}

impl MemorySource {
    /// Closes after the last payload.
    pub fn closing(payloads: &[&str]) -> Self {
        Self::new(payloads, true)
    }

    /// Stays open after the last payload.
    pub fn open(payloads: &[&str]) -> Self {
        Self::new(payloads, false)
    }

    fn new(payloads: &[&str], close_when_drained: bool) -> Self {
        Self {
            pending: payloads.iter().map(|p| p.as_bytes().to_vec()).collect(),
            acks: Arc::new(AtomicUsize::new(0)),
            fail_ack: false,
            close_when_drained,
        }
    }

    pub fn failing_acks(mut self) -> Self {
        self.fail_ack = true;
        self
    }

    /// Shared counter of successful acknowledgments.
    pub fn acks(&self) -> Arc<AtomicUsize> {
        self.acks.clone()
    }

    pub fn next_message(&mut self) -> Option<MemoryMessage> {
        self.pending.pop_front().map(|payload| MemoryMessage {
            payload,
            acks: self.acks.clone(),
            fail_ack: self.fail_ack,
        })
    }
}

impl MessageSource for MemorySource {
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Delivery> + Send + '_>> {
        Box::pin(async move {
            match self.next_message() {
                Some(msg) => Some(Ok(Box::new(msg) as Box<dyn InboundMessage>)),
                None if self.close_when_drained => None,
                None => std::future::pending().await,
            }
        })
    }
}

/// Hands out pre-built sources by queue name; unknown queues fail.
#[derive(Default)]
pub struct MemorySubscriber {
    sources: Mutex<HashMap<String, MemorySource>>,
}

impl MemorySubscriber {
    pub fn with_queue(self, queue: &str, source: MemorySource) -> Self {
        self.sources.lock().unwrap().insert(queue.to_owned(), source);
        self
    }
}

impl QueueSubscriber for MemorySubscriber {
    fn subscribe(
        &self,
        queue: &str,
        _consumer_tag: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn MessageSource>, ClientError>> + Send + '_>> {
        let source = self.sources.lock().unwrap().remove(queue);
        let queue = queue.to_owned();
        Box::pin(async move {
            match source {
                Some(s) => Ok(Box::new(s) as Box<dyn MessageSource>),
                None => Err(ClientError::protocol(format!("NOT_FOUND - no queue '{queue}'"))),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Sink side
// ---------------------------------------------------------------------------

/// Sink that succeeds or fails according to a script, recording what it saw.
///
/// Once the script is exhausted the last entry repeats.
pub struct ScriptedSink {
    script: Mutex<VecDeque<bool>>,
    last: Mutex<bool>,
    received: Mutex<Vec<MetricRecord>>,
}

impl ScriptedSink {
    pub fn new(script: &[bool]) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            last: Mutex::new(script.last().copied().unwrap_or(true)),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok() -> Self {
        Self::new(&[true])
    }

    pub fn always_failing() -> Self {
        Self::new(&[false])
    }

    pub fn received(&self) -> Vec<MetricRecord> {
        self.received.lock().unwrap().clone()
    }

    fn next_result(&self) -> bool {
        match self.script.lock().unwrap().pop_front() {
            Some(ok) => {
                *self.last.lock().unwrap() = ok;
                ok
            }
            None => *self.last.lock().unwrap(),
        }
    }
}

impl MetricSink for ScriptedSink {
    fn send<'a>(
        &'a self,
        record: &'a MetricRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + 'a>> {
        Box::pin(async move {
            self.received.lock().unwrap().push(record.clone());
            if self.next_result() {
                Ok(())
            } else {
                Err(ClientError::io("connection refused"))
            }
        })
    }
}
