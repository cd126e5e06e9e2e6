use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use carbon_api::{ClientError, MetricRecord, MetricSink};

/// Graphite (carbon) plaintext-protocol sink over a single TCP connection.
///
/// A record with timestamp `0` is sent with the current Unix time instead.
///
/// The connection is opened once at startup and shared by every queue worker.
/// It is never re-dialled: after a write error every following send fails,
/// which drives the error threshold and a process restart.
pub struct GraphiteSink {
    addr: String,
    timeout: Duration,
    conn: Mutex<Option<TcpStream>>,
}

impl GraphiteSink {
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, ClientError> {
        let addr = format!("{host}:{port}");
        let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                ClientError::timeout(format!(
                    "connect to graphite {addr}: timed out after {timeout:?}"
                ))
            })?
            .map_err(|e| ClientError::connect(format!("connect to graphite {addr}: {e}")))?;
        tracing::info!(addr = %addr, "connected to graphite");

        Ok(Self {
            addr,
            timeout,
            conn: Mutex::new(Some(stream)),
        })
    }

    async fn write_line(&self, line: &[u8]) -> Result<(), ClientError> {
        let mut guard = self.conn.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(ClientError::io(format!("graphite {}: connection lost", self.addr)));
        };

        let err = match tokio::time::timeout(self.timeout, stream.write_all(line)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => ClientError::io(format!("write to graphite {}: {e}", self.addr)),
            Err(_) => ClientError::timeout(format!(
                "write to graphite {}: timed out after {:?}",
                self.addr, self.timeout
            )),
        };
        tracing::error!(addr = %self.addr, error = %err, "graphite connection dropped");
        *guard = None;
        Err(err)
    }
}

impl MetricSink for GraphiteSink {
    fn send<'a>(
        &'a self,
        record: &'a MetricRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + 'a>> {
        Box::pin(async move { self.write_line(wire_line(record).as_bytes()).await })
    }
}

fn wire_line(record: &MetricRecord) -> String {
    if record.timestamp != 0 {
        return record.to_plaintext_line();
    }
    let stamped = MetricRecord {
        timestamp: chrono::Utc::now().timestamp(),
        ..record.clone()
    };
    tracing::debug!(
        metric = %record.name,
        timestamp = stamped.timestamp,
        "stamping metric with current time"
    );
    stamped.to_plaintext_line()
}

/// Sink that only logs. Selected when no Graphite host is configured.
pub struct NopSink;

impl MetricSink for NopSink {
    fn send<'a>(
        &'a self,
        record: &'a MetricRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::debug!(
                metric = %record.name,
                value = %record.value,
                timestamp = record.timestamp,
                "graphite disabled, dropping metric"
            );
            Ok(())
        })
    }
}
